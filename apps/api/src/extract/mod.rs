//! Text extraction from uploaded resume documents.
//!
//! PDF goes through `pdf-extract`; plain text and markdown are decoded
//! directly. Everything else is rejected at upload time, so the worker
//! treats an unknown content type as a hard failure rather than retrying.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::{Task, TaskKind, TaskQueue};
use crate::models::resume::{status, ResumeRow};
use crate::storage::Storage;

pub const CONTENT_TYPE_PDF: &str = "application/pdf";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_MARKDOWN: &str = "text/markdown";

/// Content types accepted at upload.
pub const SUPPORTED_CONTENT_TYPES: &[&str] =
    &[CONTENT_TYPE_PDF, CONTENT_TYPE_TEXT, CONTENT_TYPE_MARKDOWN];

pub fn is_supported(content_type: &str) -> bool {
    SUPPORTED_CONTENT_TYPES.contains(&content_type)
}

/// Extracts plain text from a resume document.
///
/// The result is whitespace-normalized; an extraction that yields only
/// whitespace is an error (scanned-image PDFs land here).
pub fn extract_text(content_type: &str, data: &[u8]) -> Result<String, AppError> {
    let raw = match content_type {
        CONTENT_TYPE_PDF => pdf_extract::extract_text_from_mem(data)
            .map_err(|e| AppError::Validation(format!("Failed to extract text from PDF: {e}")))?,
        CONTENT_TYPE_TEXT | CONTENT_TYPE_MARKDOWN => {
            String::from_utf8_lossy(data).into_owned()
        }
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported content type '{other}'. Supported: {}",
                SUPPORTED_CONTENT_TYPES.join(", ")
            )))
        }
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return Err(AppError::Validation(
            "Document contains no extractable text (is it a scanned image?)".to_string(),
        ));
    }

    Ok(text)
}

/// Worker entry point: downloads the stored file, extracts its text into
/// a new resume version, and chains the analysis task.
pub async fn run_extraction(
    pool: &PgPool,
    storage: &Storage,
    queue: &TaskQueue,
    resume_id: Uuid,
) -> Result<(), AppError> {
    let resume = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(resume_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    sqlx::query("UPDATE resumes SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status::PARSING)
        .bind(resume_id)
        .execute(pool)
        .await?;

    let data = storage.get_resume(&resume.s3_key).await?;

    // PDF parsing is CPU-bound; keep it off the async executor.
    let content_type = resume.content_type.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&content_type, &data))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Extraction task panicked: {e}")))??;

    let next_version: i32 = sqlx::query_scalar::<_, Option<i32>>(
        "SELECT MAX(version) FROM resume_versions WHERE resume_id = $1",
    )
    .bind(resume_id)
    .fetch_one(pool)
    .await?
    .unwrap_or(0)
        + 1;

    sqlx::query(
        r#"
        INSERT INTO resume_versions (id, resume_id, version, extracted_text)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(next_version)
    .bind(&text)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE resumes SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status::PARSED)
        .bind(resume_id)
        .execute(pool)
        .await?;

    info!(
        "Extracted {} chars from resume {resume_id} (version {next_version})",
        text.len()
    );

    queue
        .enqueue(&Task::new(TaskKind::AnalyzeResume { resume_id }))
        .await?;

    Ok(())
}

/// Collapses runs of blank lines to a single blank line and trims the ends.
fn normalize_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;

    for line in raw.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(trimmed);
            out.push('\n');
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text(CONTENT_TYPE_TEXT, b"Jane Doe\nRust Engineer").unwrap();
        assert_eq!(text, "Jane Doe\nRust Engineer");
    }

    #[test]
    fn test_markdown_is_treated_as_text() {
        let text = extract_text(CONTENT_TYPE_MARKDOWN, b"# Jane Doe\n\n- Rust").unwrap();
        assert!(text.contains("# Jane Doe"));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let result = extract_text("application/msword", b"whatever");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_document_rejected() {
        let result = extract_text(CONTENT_TYPE_TEXT, b"   \n\n   ");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_blank_line_runs_collapse() {
        let text = extract_text(CONTENT_TYPE_TEXT, b"a\n\n\n\n\nb").unwrap();
        assert_eq!(text, "a\n\nb");
    }

    #[test]
    fn test_trailing_whitespace_stripped_per_line() {
        let text = extract_text(CONTENT_TYPE_TEXT, b"a   \nb\t").unwrap();
        assert_eq!(text, "a\nb");
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported("application/pdf"));
        assert!(is_supported("text/plain"));
        assert!(!is_supported("image/png"));
    }
}
