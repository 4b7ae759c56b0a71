//! Stage 2 — semantic matching via the AI provider registry.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::prompts::{SEMANTIC_MATCH_PROMPT_TEMPLATE, SEMANTIC_MATCH_SYSTEM};
use crate::providers::ProviderRegistry;

/// Inputs beyond these many characters are truncated before prompting.
const MAX_PROMPT_CHARS: usize = 16_000;

/// Structured output of the semantic stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticReport {
    pub score: u32,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub summary: String,
}

/// Runs the semantic comparison of resume vs JD.
pub async fn score_semantic(
    providers: &ProviderRegistry,
    jd_text: &str,
    resume_text: &str,
) -> Result<SemanticReport, AppError> {
    let prompt = SEMANTIC_MATCH_PROMPT_TEMPLATE
        .replace("{jd_text}", truncate(jd_text))
        .replace("{resume_text}", truncate(resume_text));

    let mut report: SemanticReport = providers
        .complete_json(SEMANTIC_MATCH_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Provider(format!("Semantic matching failed: {e}")))?;

    report.score = report.score.min(100);
    Ok(report)
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_PROMPT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_report_deserializes_from_provider_shape() {
        let json = r#"{
            "score": 81,
            "strengths": ["Rust depth", "Distributed systems background"],
            "gaps": ["No fintech domain experience"],
            "summary": "Strong technical fit with a domain gap."
        }"#;
        let report: SemanticReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.score, 81);
        assert_eq!(report.gaps.len(), 1);
    }

    #[test]
    fn test_truncate_is_noop_for_short_text() {
        assert_eq!(truncate("short"), "short");
    }
}
