//! Axum route handlers for resume upload and retrieval.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::analysis::latest_version;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract;
use crate::jobs::{Task, TaskKind};
use crate::models::resume::{status, ResumeRow, ResumeVersionRow};
use crate::state::AppState;
use crate::storage::Storage;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub resume_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ResumeDetailResponse {
    pub resume: ResumeRow,
    pub latest_version: Option<ResumeVersionRow>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub resume_id: Uuid,
    pub version: i32,
    pub status: String,
}

/// POST /api/v1/resumes
///
/// Multipart upload: a `file` part (PDF, plain text, or markdown) and an
/// optional `title` part. Stores the file, creates the resume row, and
/// enqueues text extraction.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, String, Bytes)> = None; // (filename, content_type, data)
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("resume")
                    .to_string();
                let declared = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                let content_type = resolve_content_type(declared.as_deref(), &filename)?;
                file = Some((filename, content_type, data));
            }
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read title: {e}")))?;
                if !text.trim().is_empty() {
                    title = Some(text.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let resume_id = Uuid::new_v4();
    let s3_key = Storage::resume_key(user.user_id, resume_id, &filename);
    let title = title.unwrap_or_else(|| filename.clone());

    state.storage.put_resume(&s3_key, &content_type, data).await?;

    sqlx::query(
        r#"
        INSERT INTO resumes (id, user_id, title, s3_key, content_type, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(resume_id)
    .bind(user.user_id)
    .bind(&title)
    .bind(&s3_key)
    .bind(&content_type)
    .bind(status::UPLOADED)
    .execute(&state.db)
    .await?;

    state
        .queue
        .enqueue(&Task::new(TaskKind::ExtractText { resume_id }))
        .await?;

    info!(
        "Resume {resume_id} uploaded by user {} ({content_type}, '{title}')",
        user.user_id
    );

    Ok(Json(UploadResponse {
        resume_id,
        status: status::UPLOADED.to_string(),
    }))
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let resumes = sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(resumes))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<ResumeDetailResponse>, AppError> {
    let resume = owned_resume(&state, &user, resume_id).await?;
    let latest_version = latest_version(&state.db, resume_id).await?;

    Ok(Json(ResumeDetailResponse {
        resume,
        latest_version,
    }))
}

/// POST /api/v1/resumes/:id/analyze
///
/// Re-runs analysis: inserts a fresh version carrying the extracted text
/// (versions are append-only) and enqueues the analysis task.
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: AuthUser,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let _resume = owned_resume(&state, &user, resume_id).await?;

    let current = latest_version(&state.db, resume_id).await?;
    let text = current
        .as_ref()
        .and_then(|v| v.extracted_text.as_deref())
        .ok_or_else(|| {
            AppError::Validation(
                "Resume text has not been extracted yet — wait for parsing to finish".to_string(),
            )
        })?;

    let next_version = current.as_ref().map(|v| v.version).unwrap_or(0) + 1;
    sqlx::query(
        r#"
        INSERT INTO resume_versions (id, resume_id, version, extracted_text)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(next_version)
    .bind(text)
    .execute(&state.db)
    .await?;

    state
        .queue
        .enqueue(&Task::new(TaskKind::AnalyzeResume { resume_id }))
        .await?;

    Ok(Json(AnalyzeResponse {
        resume_id,
        version: next_version,
        status: "queued".to_string(),
    }))
}

/// Loads a resume scoped to its owner. Someone else's resume is a 404,
/// not a 403, to avoid leaking which ids exist.
async fn owned_resume(
    state: &AppState,
    user: &AuthUser,
    resume_id: Uuid,
) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(resume_id)
        .bind(user.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

/// Resolves the effective content type from the declared one, falling
/// back to the filename extension for generic declarations.
fn resolve_content_type(declared: Option<&str>, filename: &str) -> Result<String, AppError> {
    if let Some(declared) = declared {
        if extract::is_supported(declared) {
            return Ok(declared.to_string());
        }
        if declared != "application/octet-stream" {
            return Err(AppError::Validation(format!(
                "Unsupported content type '{declared}'. Supported: {}",
                extract::SUPPORTED_CONTENT_TYPES.join(", ")
            )));
        }
    }

    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match extension.as_str() {
        "pdf" => Ok(extract::CONTENT_TYPE_PDF.to_string()),
        "txt" => Ok(extract::CONTENT_TYPE_TEXT.to_string()),
        "md" => Ok(extract::CONTENT_TYPE_MARKDOWN.to_string()),
        _ => Err(AppError::Validation(format!(
            "Cannot determine file type of '{filename}'. Supported: {}",
            extract::SUPPORTED_CONTENT_TYPES.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_supported_type_wins() {
        let ct = resolve_content_type(Some("application/pdf"), "resume.bin").unwrap();
        assert_eq!(ct, "application/pdf");
    }

    #[test]
    fn test_octet_stream_falls_back_to_extension() {
        let ct = resolve_content_type(Some("application/octet-stream"), "resume.pdf").unwrap();
        assert_eq!(ct, "application/pdf");
    }

    #[test]
    fn test_missing_type_uses_extension() {
        assert_eq!(resolve_content_type(None, "cv.txt").unwrap(), "text/plain");
        assert_eq!(resolve_content_type(None, "cv.md").unwrap(), "text/markdown");
    }

    #[test]
    fn test_unsupported_declared_type_rejected() {
        let result = resolve_content_type(Some("application/msword"), "resume.doc");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = resolve_content_type(None, "resume.docx");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
