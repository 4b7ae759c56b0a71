//! Stage 1 — keyword matching.
//!
//! Pure Rust, deterministic, no AI call. Keywords are regex-extracted from
//! the JD, weighted by where they appear (title 1.0, requirements 0.8,
//! responsibilities 0.6, elsewhere 0.3), then matched against the resume
//! text: word-boundary hit = 1.0, substring hit = 0.6.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const WEIGHT_TITLE: f32 = 1.0;
const WEIGHT_REQUIREMENTS: f32 = 0.8;
const WEIGHT_RESPONSIBILITIES: f32 = 0.6;
const WEIGHT_OTHER: f32 = 0.3;

const STRENGTH_WORD: f32 = 1.0;
const STRENGTH_SUBSTRING: f32 = 0.6;

/// Tokens shorter than this are never keywords.
const MIN_KEYWORD_LEN: usize = 2;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "do", "for", "from",
    "has", "have", "if", "in", "into", "is", "it", "its", "of", "on", "or", "our", "such", "that",
    "the", "their", "them", "then", "these", "they", "this", "to", "was", "we", "well", "were",
    "will", "with", "you", "your", "who", "what", "when", "where", "which", "while", "would",
    "should", "could", "about", "across", "after", "all", "also", "any", "both", "each", "more",
    "most", "other", "some", "than", "through", "using", "via", "work", "working", "team",
    "teams", "role", "position", "company", "candidate", "experience", "years", "strong",
    "ability", "skills", "knowledge", "plus", "preferred", "required", "must", "nice", "bonus",
    "looking", "join", "help", "new", "build", "building", "including", "etc", "not", "like",
    "requirements", "qualifications", "responsibilities", "duties",
];

/// One JD keyword with position-weighted scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JdKeyword {
    pub keyword: String,
    pub frequency: u32,
    /// Highest position weight the keyword was seen at.
    pub position_weight: f32,
    /// frequency * position_weight
    pub weighted_score: f32,
}

/// One keyword matched against the resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub keyword: String,
    pub jd_frequency: u32,
    pub strength: f32,
}

/// Output of the keyword stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordReport {
    /// Weighted coverage 0–100.
    pub score: u32,
    pub matched: Vec<KeywordMatch>,
    pub missing: Vec<String>,
    pub total_keywords: usize,
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Keeps tech tokens like c++, c#, .net, node.js intact.
    RE.get_or_init(|| Regex::new(r"[A-Za-z+#.][A-Za-z0-9+#./-]*").unwrap())
}

fn requirements_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(requirements|qualifications|must[- ]have|what you need|you need)")
            .unwrap()
    })
}

fn responsibilities_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(responsibilities|duties|you will|what you.ll do|the role)").unwrap()
    })
}

/// Extracts weighted keywords from raw JD text.
///
/// The first non-empty line is the title. Section headers switch the
/// position weight for subsequent lines. A keyword seen in several
/// sections keeps its highest weight.
pub fn extract_keywords(jd_text: &str) -> Vec<JdKeyword> {
    let mut frequency: HashMap<String, u32> = HashMap::new();
    let mut best_weight: HashMap<String, f32> = HashMap::new();

    let mut current_weight = WEIGHT_OTHER;
    let mut seen_title = false;

    for line in jd_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let line_weight = if !seen_title {
            seen_title = true;
            WEIGHT_TITLE
        } else {
            if requirements_header().is_match(trimmed) {
                current_weight = WEIGHT_REQUIREMENTS;
            } else if responsibilities_header().is_match(trimmed) {
                current_weight = WEIGHT_RESPONSIBILITIES;
            }
            current_weight
        };

        for token in token_regex().find_iter(trimmed) {
            let word = normalize_token(token.as_str());
            if word.len() < MIN_KEYWORD_LEN
                || STOPWORDS.contains(&word.as_str())
                || word.chars().all(|c| !c.is_ascii_alphabetic())
            {
                continue;
            }
            *frequency.entry(word.clone()).or_insert(0) += 1;
            let weight = best_weight.entry(word).or_insert(0.0);
            if line_weight > *weight {
                *weight = line_weight;
            }
        }
    }

    let mut keywords: Vec<JdKeyword> = frequency
        .into_iter()
        .map(|(keyword, frequency)| {
            let position_weight = best_weight[&keyword];
            JdKeyword {
                weighted_score: frequency as f32 * position_weight,
                keyword,
                frequency,
                position_weight,
            }
        })
        .collect();

    // Highest signal first; ties broken alphabetically for determinism.
    keywords.sort_by(|a, b| {
        b.weighted_score
            .partial_cmp(&a.weighted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });

    keywords
}

fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| c == '.' || c == '/' || c == '-')
        .to_lowercase()
}

/// Matches extracted JD keywords against resume text and computes the
/// weighted coverage score.
pub fn match_keywords(keywords: &[JdKeyword], resume_text: &str) -> KeywordReport {
    let resume_lower = resume_text.to_lowercase();

    if keywords.is_empty() {
        return KeywordReport {
            score: 0,
            matched: vec![],
            missing: vec![],
            total_keywords: 0,
        };
    }

    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut total_weighted = 0.0_f32;
    let mut total_score = 0.0_f32;

    for kw in keywords {
        total_weighted += kw.weighted_score;

        let strength = if contains_word(&resume_lower, &kw.keyword) {
            STRENGTH_WORD
        } else if resume_lower.contains(&kw.keyword) {
            STRENGTH_SUBSTRING
        } else {
            0.0
        };

        total_score += strength * kw.weighted_score;

        if strength > 0.0 {
            matched.push(KeywordMatch {
                keyword: kw.keyword.clone(),
                jd_frequency: kw.frequency,
                strength,
            });
        } else {
            missing.push(kw.keyword.clone());
        }
    }

    let score = if total_weighted > 0.0 {
        ((total_score / total_weighted) * 100.0).round() as u32
    } else {
        0
    };

    KeywordReport {
        score,
        matched,
        missing,
        total_keywords: keywords.len(),
    }
}

/// Word-boundary containment without regex escaping pitfalls for tokens
/// like `c++` or `.net`: neighbors must not be alphanumeric.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let end = start + needle.len();
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JD: &str = "\
Senior Rust Engineer

About Us
We are a fintech scale-up.

Requirements
- 5 years Rust
- PostgreSQL and Redis
- Kubernetes

Responsibilities
- Design distributed systems
- Operate the Redis cluster";

    #[test]
    fn test_title_keywords_get_weight_one() {
        let keywords = extract_keywords(SAMPLE_JD);
        let rust = keywords.iter().find(|k| k.keyword == "rust").unwrap();
        assert_eq!(rust.position_weight, WEIGHT_TITLE);
        assert_eq!(rust.frequency, 2); // title + requirements
    }

    #[test]
    fn test_requirements_outweigh_responsibilities() {
        let keywords = extract_keywords(SAMPLE_JD);
        let postgres = keywords.iter().find(|k| k.keyword == "postgresql").unwrap();
        let distributed = keywords.iter().find(|k| k.keyword == "distributed").unwrap();
        assert_eq!(postgres.position_weight, WEIGHT_REQUIREMENTS);
        assert_eq!(distributed.position_weight, WEIGHT_RESPONSIBILITIES);
    }

    #[test]
    fn test_keyword_seen_twice_keeps_highest_weight() {
        // "redis" appears under Requirements (0.8) and Responsibilities (0.6)
        let keywords = extract_keywords(SAMPLE_JD);
        let redis = keywords.iter().find(|k| k.keyword == "redis").unwrap();
        assert_eq!(redis.position_weight, WEIGHT_REQUIREMENTS);
        assert_eq!(redis.frequency, 2);
    }

    #[test]
    fn test_stopwords_filtered() {
        let keywords = extract_keywords(SAMPLE_JD);
        assert!(!keywords.iter().any(|k| k.keyword == "the"));
        assert!(!keywords.iter().any(|k| k.keyword == "and"));
        assert!(!keywords.iter().any(|k| k.keyword == "we"));
    }

    #[test]
    fn test_weighted_score_is_frequency_times_weight() {
        let keywords = extract_keywords(SAMPLE_JD);
        for kw in &keywords {
            let expected = kw.frequency as f32 * kw.position_weight;
            assert!((kw.weighted_score - expected).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_tech_tokens_survive_tokenization() {
        let keywords = extract_keywords("Platform Engineer\n\nRequirements\n- C++ and C# and Node.js");
        assert!(keywords.iter().any(|k| k.keyword == "c++"));
        assert!(keywords.iter().any(|k| k.keyword == "c#"));
        assert!(keywords.iter().any(|k| k.keyword == "node.js"));
    }

    #[test]
    fn test_word_boundary_match_scores_full() {
        let keywords = vec![JdKeyword {
            keyword: "rust".to_string(),
            frequency: 3,
            position_weight: 1.0,
            weighted_score: 3.0,
        }];
        let report = match_keywords(&keywords, "Seven years of Rust in production");
        assert_eq!(report.score, 100);
        assert_eq!(report.matched[0].strength, STRENGTH_WORD);
    }

    #[test]
    fn test_substring_match_scores_partial() {
        let keywords = vec![JdKeyword {
            keyword: "java".to_string(),
            frequency: 2,
            position_weight: 1.0,
            weighted_score: 2.0,
        }];
        // "javascript" contains "java" but not as a standalone word
        let report = match_keywords(&keywords, "expert in javascript");
        assert_eq!(report.matched[0].strength, STRENGTH_SUBSTRING);
        assert_eq!(report.score, 60);
    }

    #[test]
    fn test_unmatched_keyword_goes_missing() {
        let keywords = vec![JdKeyword {
            keyword: "kubernetes".to_string(),
            frequency: 4,
            position_weight: 0.8,
            weighted_score: 3.2,
        }];
        let report = match_keywords(&keywords, "I write Python scripts");
        assert_eq!(report.score, 0);
        assert_eq!(report.missing, vec!["kubernetes"]);
        assert!(report.matched.is_empty());
    }

    #[test]
    fn test_empty_keyword_list_scores_zero() {
        let report = match_keywords(&[], "any resume text");
        assert_eq!(report.score, 0);
        assert_eq!(report.total_keywords, 0);
    }

    #[test]
    fn test_score_mixes_strengths_by_weight() {
        let keywords = vec![
            JdKeyword {
                keyword: "rust".to_string(),
                frequency: 1,
                position_weight: 1.0,
                weighted_score: 1.0,
            },
            JdKeyword {
                keyword: "go".to_string(),
                frequency: 1,
                position_weight: 1.0,
                weighted_score: 1.0,
            },
        ];
        // rust matches (1.0), go missing (0.0) → 50
        let report = match_keywords(&keywords, "rust developer");
        assert_eq!(report.score, 50);
    }

    #[test]
    fn test_contains_word_handles_symbol_tokens() {
        assert!(contains_word("fluent in c++ and go", "c++"));
        assert!(!contains_word("c++x experience", "c++"));
        assert!(contains_word("shipped .net services", ".net"));
    }

    #[test]
    fn test_determinism() {
        let a = extract_keywords(SAMPLE_JD);
        let b = extract_keywords(SAMPLE_JD);
        let names_a: Vec<_> = a.iter().map(|k| &k.keyword).collect();
        let names_b: Vec<_> = b.iter().map(|k| &k.keyword).collect();
        assert_eq!(names_a, names_b);
    }
}
