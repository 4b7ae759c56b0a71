// LLM prompt constants for the semantic matching stage.

/// System prompt for semantic JD matching — enforces JSON-only output.
pub const SEMANTIC_MATCH_SYSTEM: &str =
    "You are an expert technical recruiter evaluating how well a resume \
    fits a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Semantic matching prompt template.
/// Replace `{jd_text}` and `{resume_text}` before sending.
pub const SEMANTIC_MATCH_PROMPT_TEMPLATE: &str = r#"Evaluate how well the candidate's resume fits the job description. Look past exact keyword overlap: equivalent technologies, transferable experience, and seniority fit all count.

Return a JSON object with this EXACT schema (no extra fields):
{
  "score": 74,
  "strengths": [
    "Five years of production Rust matches the core requirement"
  ],
  "gaps": [
    "No Kubernetes exposure; JD operates a large cluster"
  ],
  "summary": "One-paragraph fit assessment."
}

Rules:
- "score" is an integer 0-100: 80+ strong fit, 60-79 viable, 40-59 stretch, below 40 poor fit.
- "strengths" and "gaps" each list 2-5 specific, evidence-based items.
- Cite only what is actually present in the resume. Do not invent experience.

JOB DESCRIPTION:
{jd_text}

RESUME:
{resume_text}"#;
