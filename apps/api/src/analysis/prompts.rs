// LLM prompt constants for the resume review call.

/// System prompt for the AI resume review — enforces JSON-only output.
pub const REVIEW_SYSTEM: &str =
    "You are an expert resume reviewer and career coach. \
    Assess a resume and suggest concrete improvements. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Review prompt template. Replace `{resume_text}` before sending.
pub const REVIEW_PROMPT_TEMPLATE: &str = r#"Review the following resume and return a JSON object with this EXACT schema (no extra fields):
{
  "score": 72,
  "summary": "One-paragraph overall assessment.",
  "strengths": [
    "Quantified impact in most experience bullets"
  ],
  "improvements": [
    "Lead each bullet with a strong action verb instead of 'responsible for'"
  ]
}

Rules:
- "score" is an integer 0-100 reflecting overall resume quality for the candidate's apparent target role.
- "strengths" lists 2-5 specific things the resume does well.
- "improvements" lists 3-7 concrete, actionable edits, most impactful first.
- Base everything ONLY on the resume text. Do not invent facts.

RESUME:
{resume_text}"#;
