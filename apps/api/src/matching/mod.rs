//! JD matching — the two-stage pipeline (keyword, then semantic).
//!
//! Flow: load matching row → load resume text → keyword stage →
//! semantic stage (skipped below the keyword floor) → combined score →
//! persist reports on the matching row.

use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::analysis::latest_version;
use crate::errors::AppError;
use crate::models::matching::{status, JdMatchingRow};
use crate::providers::ProviderRegistry;

pub mod keyword;
pub mod prompts;
pub mod semantic;

/// Below this keyword score the semantic stage is skipped: a resume with
/// near-zero keyword overlap never survives screening, so the provider
/// call is not worth making.
const SEMANTIC_SKIP_FLOOR: u32 = 10;

/// Combined score weights. Semantic dominates because the keyword stage
/// is a recall-oriented filter.
const KEYWORD_WEIGHT: f64 = 0.4;
const SEMANTIC_WEIGHT: f64 = 0.6;

/// Runs the full matching pipeline for a queued matching row.
pub async fn run_matching(
    pool: &PgPool,
    providers: &ProviderRegistry,
    matching_id: Uuid,
) -> Result<(), AppError> {
    let matching = sqlx::query_as::<_, JdMatchingRow>("SELECT * FROM jd_matchings WHERE id = $1")
        .bind(matching_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Matching {matching_id} not found")))?;

    sqlx::query("UPDATE jd_matchings SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status::RUNNING)
        .bind(matching_id)
        .execute(pool)
        .await?;

    let version = latest_version(pool, matching.resume_id)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Resume {} has no parsed version to match against",
                matching.resume_id
            ))
        })?;
    let resume_text = version.extracted_text.as_deref().ok_or_else(|| {
        AppError::Validation(format!(
            "Resume {} has no extracted text",
            matching.resume_id
        ))
    })?;

    // Stage 1: keyword
    let keywords = keyword::extract_keywords(&matching.jd_text);
    let keyword_report = keyword::match_keywords(&keywords, resume_text);
    info!(
        "Keyword stage for matching {matching_id}: {}/100 ({} keywords, {} missing)",
        keyword_report.score,
        keyword_report.total_keywords,
        keyword_report.missing.len()
    );

    // Stage 2: semantic, unless the keyword stage already ruled the pair out
    let (semantic_value, overall) = if keyword_report.score < SEMANTIC_SKIP_FLOOR {
        info!(
            "Skipping semantic stage for matching {matching_id}: keyword score {} below floor {}",
            keyword_report.score, SEMANTIC_SKIP_FLOOR
        );
        (
            json!({
                "skipped": true,
                "reason": format!(
                    "keyword score {} below floor {SEMANTIC_SKIP_FLOOR}",
                    keyword_report.score
                ),
            }),
            combine_scores(keyword_report.score, None),
        )
    } else {
        let semantic_report =
            semantic::score_semantic(providers, &matching.jd_text, resume_text).await?;
        info!(
            "Semantic stage for matching {matching_id}: {}/100",
            semantic_report.score
        );
        let overall = combine_scores(keyword_report.score, Some(semantic_report.score));
        let value = serde_json::to_value(&semantic_report).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize semantic report: {e}"))
        })?;
        (value, overall)
    };

    let keyword_value = serde_json::to_value(&keyword_report).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Failed to serialize keyword report: {e}"))
    })?;

    sqlx::query(
        r#"
        UPDATE jd_matchings
        SET status = $1, keyword_report = $2, semantic_report = $3,
            overall_score = $4, updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(status::COMPLETED)
    .bind(&keyword_value)
    .bind(&semantic_value)
    .bind(overall)
    .bind(matching_id)
    .execute(pool)
    .await?;

    info!("Matching {matching_id} completed: overall {overall:.1}/100");
    Ok(())
}

/// Combined score: 0.4 × keyword + 0.6 × semantic; keyword-only when the
/// semantic stage was skipped.
fn combine_scores(keyword: u32, semantic: Option<u32>) -> f64 {
    match semantic {
        Some(semantic) => KEYWORD_WEIGHT * keyword as f64 + SEMANTIC_WEIGHT * semantic as f64,
        None => keyword as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_score_weights() {
        // 0.4*50 + 0.6*80 = 68
        let overall = combine_scores(50, Some(80));
        assert!((overall - 68.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_combined_score_keyword_only_when_skipped() {
        let overall = combine_scores(7, None);
        assert!((overall - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_combined_score_bounded() {
        let overall = combine_scores(100, Some(100));
        assert!((overall - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_skip_floor_is_low() {
        // The floor exists to skip hopeless pairs, not viable ones.
        assert!(SEMANTIC_SKIP_FLOOR <= 20);
    }
}
