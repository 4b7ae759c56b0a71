//! Resume analysis — orchestrates the heuristic ATS pass and the AI review.
//!
//! Flow: load latest version → ATS heuristics → AI review via provider
//! registry → persist both reports on the version → mark resume ready.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{status, ResumeVersionRow};
use crate::providers::ProviderRegistry;

pub mod ats;
pub mod prompts;

/// Resume text beyond this many characters is truncated before the AI
/// call to keep prompts inside provider limits.
const MAX_REVIEW_CHARS: usize = 24_000;

/// Structured output of the AI review call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiReview {
    pub score: u32,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

/// Runs the full analysis pass for a resume's latest version.
pub async fn run_analysis(
    pool: &PgPool,
    providers: &ProviderRegistry,
    resume_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query("UPDATE resumes SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status::ANALYZING)
        .bind(resume_id)
        .execute(pool)
        .await?;

    let version = latest_version(pool, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} has no versions")))?;

    let text = version.extracted_text.as_deref().ok_or_else(|| {
        AppError::Validation(format!(
            "Resume {resume_id} version {} has no extracted text",
            version.version
        ))
    })?;

    let ats_report = ats::analyze(text);
    info!(
        "ATS heuristic score for resume {resume_id} v{}: {}",
        version.version, ats_report.score
    );

    let review = request_review(providers, text).await?;
    info!(
        "AI review score for resume {resume_id} v{}: {}",
        version.version, review.score
    );

    let ats_value = serde_json::to_value(&ats_report)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize ATS report: {e}")))?;
    let review_value = serde_json::to_value(&review)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize AI review: {e}")))?;

    sqlx::query("UPDATE resume_versions SET ats_report = $1, ai_review = $2 WHERE id = $3")
        .bind(&ats_value)
        .bind(&review_value)
        .bind(version.id)
        .execute(pool)
        .await?;

    sqlx::query("UPDATE resumes SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status::READY)
        .bind(resume_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Calls the provider registry for the structured review.
async fn request_review(
    providers: &ProviderRegistry,
    text: &str,
) -> Result<AiReview, AppError> {
    let prompt = prompts::REVIEW_PROMPT_TEMPLATE.replace("{resume_text}", truncate(text));

    let mut review: AiReview = providers
        .complete_json(prompts::REVIEW_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Provider(format!("Resume review failed: {e}")))?;

    review.score = review.score.min(100);
    Ok(review)
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_REVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Returns the most recent version row for a resume.
pub async fn latest_version(
    pool: &PgPool,
    resume_id: Uuid,
) -> Result<Option<ResumeVersionRow>, AppError> {
    Ok(sqlx::query_as::<_, ResumeVersionRow>(
        "SELECT * FROM resume_versions WHERE resume_id = $1 ORDER BY version DESC LIMIT 1",
    )
    .bind(resume_id)
    .fetch_optional(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_review_deserializes_from_provider_shape() {
        let json = r#"{
            "score": 68,
            "summary": "Solid mid-level resume with weak quantification.",
            "strengths": ["Clear section structure"],
            "improvements": ["Quantify the migration bullet", "Drop the objective statement"]
        }"#;
        let review: AiReview = serde_json::from_str(json).unwrap();
        assert_eq!(review.score, 68);
        assert_eq!(review.improvements.len(), 2);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(MAX_REVIEW_CHARS + 10);
        let truncated = truncate(&text);
        assert_eq!(truncated.chars().count(), MAX_REVIEW_CHARS);
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate("short"), "short");
    }
}
