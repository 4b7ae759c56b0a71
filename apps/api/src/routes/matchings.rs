//! Axum route handlers for JD matching.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::{Task, TaskKind};
use crate::models::matching::{status, JdMatchingRow};
use crate::models::resume::{status as resume_status, ResumeRow};
use crate::state::AppState;

/// How long a (resume, JD) pair stays deduplicated while in flight.
const DEDUP_TTL_SECS: u64 = 600;

#[derive(Debug, Deserialize)]
pub struct CreateMatchingRequest {
    pub resume_id: Uuid,
    pub jd_text: String,
}

#[derive(Debug, Serialize)]
pub struct CreateMatchingResponse {
    pub matching_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct MatchingListQuery {
    pub resume_id: Option<Uuid>,
}

/// POST /api/v1/matchings
///
/// Enqueues the two-stage matching pipeline for a parsed resume. An
/// identical matching already in flight is a 409.
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateMatchingRequest>,
) -> Result<Json<CreateMatchingResponse>, AppError> {
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }

    let resume = sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE id = $1 AND user_id = $2",
    )
    .bind(request.resume_id)
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Resume {} not found", request.resume_id)))?;

    if !matches!(
        resume.status.as_str(),
        resume_status::PARSED | resume_status::ANALYZING | resume_status::READY
    ) {
        return Err(AppError::Validation(format!(
            "Resume is not ready for matching (status: {})",
            resume.status
        )));
    }

    let matching_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO jd_matchings (id, user_id, resume_id, jd_text, status)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(matching_id)
    .bind(user.user_id)
    .bind(request.resume_id)
    .bind(&request.jd_text)
    .bind(status::QUEUED)
    .execute(&state.db)
    .await?;

    let dedup_key = dedup_key(request.resume_id, &request.jd_text);
    let task = Task::new(TaskKind::MatchJd { matching_id }).with_unique_key(dedup_key.clone());

    let enqueued = state
        .queue
        .enqueue_unique(&task, &dedup_key, DEDUP_TTL_SECS)
        .await?;
    if !enqueued {
        // Roll back the row we just created; the earlier run owns the pair.
        sqlx::query("DELETE FROM jd_matchings WHERE id = $1")
            .bind(matching_id)
            .execute(&state.db)
            .await?;
        return Err(AppError::Conflict(
            "A matching for this resume and job description is already in progress".to_string(),
        ));
    }

    info!(
        "Matching {matching_id} queued for resume {} (user {})",
        request.resume_id, user.user_id
    );

    Ok(Json(CreateMatchingResponse {
        matching_id,
        status: status::QUEUED.to_string(),
    }))
}

/// GET /api/v1/matchings/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(matching_id): Path<Uuid>,
) -> Result<Json<JdMatchingRow>, AppError> {
    let matching = sqlx::query_as::<_, JdMatchingRow>(
        "SELECT * FROM jd_matchings WHERE id = $1 AND user_id = $2",
    )
    .bind(matching_id)
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Matching {matching_id} not found")))?;

    Ok(Json(matching))
}

/// GET /api/v1/matchings?resume_id=
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<MatchingListQuery>,
) -> Result<Json<Vec<JdMatchingRow>>, AppError> {
    let matchings = match params.resume_id {
        Some(resume_id) => {
            sqlx::query_as::<_, JdMatchingRow>(
                "SELECT * FROM jd_matchings WHERE user_id = $1 AND resume_id = $2 \
                 ORDER BY created_at DESC",
            )
            .bind(user.user_id)
            .bind(resume_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, JdMatchingRow>(
                "SELECT * FROM jd_matchings WHERE user_id = $1 ORDER BY created_at DESC",
            )
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(matchings))
}

/// Dedup key for a (resume, JD) pair. A hash collision costs one
/// spurious 409, nothing more.
fn dedup_key(resume_id: Uuid, jd_text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    jd_text.hash(&mut hasher);
    format!("match:{resume_id}:{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_stable_for_same_inputs() {
        let resume_id = Uuid::new_v4();
        assert_eq!(
            dedup_key(resume_id, "Senior Rust Engineer"),
            dedup_key(resume_id, "Senior Rust Engineer")
        );
    }

    #[test]
    fn test_dedup_key_differs_by_jd() {
        let resume_id = Uuid::new_v4();
        assert_ne!(
            dedup_key(resume_id, "Senior Rust Engineer"),
            dedup_key(resume_id, "Staff Go Engineer")
        );
    }

    #[test]
    fn test_dedup_key_differs_by_resume() {
        assert_ne!(
            dedup_key(Uuid::new_v4(), "Senior Rust Engineer"),
            dedup_key(Uuid::new_v4(), "Senior Rust Engineer")
        );
    }
}
