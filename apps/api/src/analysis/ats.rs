//! ATS heuristic scoring — pure Rust, deterministic, no AI call.
//!
//! Approximates what applicant-tracking software screens for: parseable
//! contact info, recognizable section structure, dense quantified bullets,
//! and a sane length. Each check contributes a weighted slice of the
//! 0–100 score.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// Check weights. Must sum to 100.
const WEIGHT_CONTACT: f64 = 15.0;
const WEIGHT_SECTIONS: f64 = 25.0;
const WEIGHT_QUANTIFIED: f64 = 25.0;
const WEIGHT_BULLET_DENSITY: f64 = 10.0;
const WEIGHT_VAGUE_LANGUAGE: f64 = 10.0;
const WEIGHT_LENGTH: f64 = 15.0;

/// Full credit for bullet density at this many bullets.
const BULLET_DENSITY_TARGET: usize = 5;

/// Word-count band considered ATS-friendly.
const MIN_WORDS: usize = 250;
const MAX_WORDS: usize = 1000;

const VAGUE_PHRASES: &[&str] = &[
    "improved",
    "enhanced",
    "helped",
    "worked on",
    "assisted",
    "supported",
    "participated",
    "responsible for",
    "significant",
    "major",
    "massive",
    "substantial",
    "numerous",
    "various",
    "several",
];

const SECTION_NAMES: [(&str, &[&str]); 3] = [
    ("experience", &["experience", "employment", "work history"]),
    ("education", &["education", "academic background"]),
    ("skills", &["skills", "technologies", "technical proficiencies"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsCheck {
    pub name: String,
    /// Contribution to the overall score, 0–100 scale.
    pub weight: f64,
    /// Fraction of the weight earned, 0.0–1.0.
    pub score: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsReport {
    pub score: u32,
    pub checks: Vec<AtsCheck>,
    pub suggestions: Vec<String>,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\+?\d[\d\s().-]{7,}\d)").unwrap())
}

fn bullet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*[-•*▪]\s+\S").unwrap())
}

/// Runs all heuristic checks over extracted resume text.
pub fn analyze(text: &str) -> AtsReport {
    let mut checks = Vec::new();
    let mut suggestions = Vec::new();

    // Contact info: email and phone each worth half the check.
    let has_email = email_regex().is_match(text);
    let has_phone = phone_regex().is_match(text);
    let contact_score = (has_email as u8 as f64 + has_phone as u8 as f64) / 2.0;
    if !has_email {
        suggestions.push("Add an email address — ATS filters often discard resumes without one.".to_string());
    }
    if !has_phone {
        suggestions.push("Add a phone number to the contact section.".to_string());
    }
    checks.push(AtsCheck {
        name: "contact_info".to_string(),
        weight: WEIGHT_CONTACT,
        score: contact_score,
        detail: format!("email: {has_email}, phone: {has_phone}"),
    });

    // Section structure: fraction of core sections with a recognizable header.
    let lower = text.to_lowercase();
    let mut found_sections = Vec::new();
    let mut missing_sections = Vec::new();
    for (canonical, aliases) in SECTION_NAMES {
        if aliases.iter().any(|alias| has_section_header(&lower, alias)) {
            found_sections.push(canonical);
        } else {
            missing_sections.push(canonical);
        }
    }
    let section_score = found_sections.len() as f64 / SECTION_NAMES.len() as f64;
    for missing in &missing_sections {
        suggestions.push(format!("Add a clearly-labeled '{missing}' section."));
    }
    checks.push(AtsCheck {
        name: "section_structure".to_string(),
        weight: WEIGHT_SECTIONS,
        score: section_score,
        detail: format!("found: {found_sections:?}, missing: {missing_sections:?}"),
    });

    // Bullets: density and quantification ratio.
    let bullets = extract_bullets(text);
    let density_score =
        (bullets.len() as f64 / BULLET_DENSITY_TARGET as f64).clamp(0.0, 1.0);
    if bullets.len() < BULLET_DENSITY_TARGET {
        suggestions.push(format!(
            "Use bullet points for accomplishments ({} found, aim for at least {}).",
            bullets.len(),
            BULLET_DENSITY_TARGET
        ));
    }
    checks.push(AtsCheck {
        name: "bullet_density".to_string(),
        weight: WEIGHT_BULLET_DENSITY,
        score: density_score,
        detail: format!("{} bullet lines", bullets.len()),
    });

    let quantified = bullets.iter().filter(|b| is_quantified(b)).count();
    let quantified_score = if bullets.is_empty() {
        0.0
    } else {
        quantified as f64 / bullets.len() as f64
    };
    if quantified_score < 0.5 {
        suggestions.push(
            "Quantify more bullets with numbers, percentages, or amounts (e.g. 'cut build time 40%')."
                .to_string(),
        );
    }
    checks.push(AtsCheck {
        name: "quantified_impact".to_string(),
        weight: WEIGHT_QUANTIFIED,
        score: quantified_score,
        detail: format!("{quantified}/{} bullets quantified", bullets.len()),
    });

    // Vague language: each hit costs a quarter of the check.
    let vague_hits: Vec<&str> = VAGUE_PHRASES
        .iter()
        .copied()
        .filter(|phrase| lower.contains(phrase))
        .collect();
    let vague_score = (1.0 - vague_hits.len() as f64 * 0.25).clamp(0.0, 1.0);
    if !vague_hits.is_empty() {
        suggestions.push(format!(
            "Replace vague wording ({}) with specific, measurable statements.",
            vague_hits.join(", ")
        ));
    }
    checks.push(AtsCheck {
        name: "vague_language".to_string(),
        weight: WEIGHT_VAGUE_LANGUAGE,
        score: vague_score,
        detail: format!("{} vague phrases found", vague_hits.len()),
    });

    // Length band: linear falloff outside [MIN_WORDS, MAX_WORDS].
    let word_count = text.split_whitespace().count();
    let length_score = if word_count < MIN_WORDS {
        word_count as f64 / MIN_WORDS as f64
    } else if word_count > MAX_WORDS {
        (MAX_WORDS as f64 / word_count as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };
    if word_count < MIN_WORDS {
        suggestions.push(format!(
            "Resume is short ({word_count} words) — expand accomplishments toward {MIN_WORDS}+ words."
        ));
    } else if word_count > MAX_WORDS {
        suggestions.push(format!(
            "Resume is long ({word_count} words) — trim toward {MAX_WORDS} words."
        ));
    }
    checks.push(AtsCheck {
        name: "length".to_string(),
        weight: WEIGHT_LENGTH,
        score: length_score,
        detail: format!("{word_count} words"),
    });

    let score = checks
        .iter()
        .map(|c| c.weight * c.score)
        .sum::<f64>()
        .round()
        .clamp(0.0, 100.0) as u32;

    AtsReport {
        score,
        checks,
        suggestions,
    }
}

/// A section header is a short standalone line starting with the alias.
fn has_section_header(lower_text: &str, alias: &str) -> bool {
    lower_text.lines().any(|line| {
        let line = line.trim().trim_start_matches(['#', '*', '=']).trim();
        line.starts_with(alias) && line.len() < alias.len() + 20
    })
}

fn extract_bullets(text: &str) -> Vec<String> {
    bullet_regex()
        .find_iter(text)
        .filter_map(|m| {
            text[m.start()..]
                .lines()
                .next()
                .map(|line| line.trim().trim_start_matches(['-', '•', '*', '▪']).trim().to_string())
        })
        .collect()
}

/// A bullet counts as quantified if it carries a metric signal: a digit,
/// a percentage, a currency amount, a ~N estimate, or an Nx multiplier.
fn is_quantified(text: &str) -> bool {
    let lower = text.to_lowercase();
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let has_percent = text.contains('%');
    let has_currency = text.contains('$') || text.contains('€') || text.contains('£');
    let has_tilde = text.contains('~') && has_digit;
    let has_multiplier = has_digit
        && (lower.contains("x faster")
            || lower.contains("x improvement")
            || lower.contains("x reduction")
            || lower.contains("x more"));

    has_digit || has_percent || has_currency || has_tilde || has_multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRONG_RESUME: &str = "\
Jane Doe
jane@example.com | +1 (555) 123-4567

Experience
- Architected distributed caching layer reducing p99 latency by 40%
- Cut infrastructure spend $120k/year by consolidating 3 clusters
- Shipped billing pipeline processing 2M events/day
- Led migration of 14 services to Kubernetes
- Reduced build times 3x faster with incremental compilation

Education
- B.S. Computer Science, 2018

Skills
- Rust, PostgreSQL, Redis, Kubernetes";

    #[test]
    fn test_strong_resume_scores_high() {
        let report = analyze(STRONG_RESUME);
        assert!(report.score >= 70, "Expected ≥70, got {}", report.score);
    }

    #[test]
    fn test_empty_text_scores_low() {
        let report = analyze("nothing to see here");
        assert!(report.score <= 30, "Expected ≤30, got {}", report.score);
        assert!(!report.suggestions.is_empty());
    }

    #[test]
    fn test_weights_sum_to_100() {
        let total = WEIGHT_CONTACT
            + WEIGHT_SECTIONS
            + WEIGHT_QUANTIFIED
            + WEIGHT_BULLET_DENSITY
            + WEIGHT_VAGUE_LANGUAGE
            + WEIGHT_LENGTH;
        assert!((total - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_email_flagged() {
        let report = analyze("Experience\n- Did 5 things");
        let contact = report
            .checks
            .iter()
            .find(|c| c.name == "contact_info")
            .unwrap();
        assert!(contact.score < 1.0);
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("email")));
    }

    #[test]
    fn test_quantified_bullet_detection() {
        assert!(is_quantified("Reduced latency by 40%"));
        assert!(is_quantified("Saved $2M annually"));
        assert!(is_quantified("Handled ~300 requests per second"));
        assert!(is_quantified("Made pipeline 3x faster"));
        assert!(!is_quantified("Improved the build pipeline"));
    }

    #[test]
    fn test_vague_language_penalized() {
        let clean = analyze(STRONG_RESUME);
        let vague = analyze(&format!(
            "{STRONG_RESUME}\n- Responsible for various significant initiatives"
        ));
        let clean_check = clean.checks.iter().find(|c| c.name == "vague_language").unwrap();
        let vague_check = vague.checks.iter().find(|c| c.name == "vague_language").unwrap();
        assert!(vague_check.score < clean_check.score);
    }

    #[test]
    fn test_section_detection_ignores_inline_mentions() {
        // "experience" mid-sentence is not a header
        let text = "I have experience with many technologies and this line is far too long to be a header";
        assert!(!has_section_header(&text.to_lowercase(), "experience"));
    }

    #[test]
    fn test_section_detection_accepts_markdown_headers() {
        assert!(has_section_header("## skills", "skills"));
        assert!(has_section_header("work history", "work history"));
    }

    #[test]
    fn test_bullet_extraction_handles_multiple_markers() {
        let text = "- dash bullet\n• dot bullet\n* star bullet\nplain line";
        let bullets = extract_bullets(text);
        assert_eq!(bullets.len(), 3);
        assert_eq!(bullets[0], "dash bullet");
    }

    #[test]
    fn test_score_is_bounded() {
        let report = analyze(STRONG_RESUME);
        assert!(report.score <= 100);
    }
}
