use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle states for an uploaded resume.
///
/// uploaded → parsing → parsed → analyzing → ready, with `failed` reachable
/// from any worker stage.
pub mod status {
    pub const UPLOADED: &str = "uploaded";
    pub const PARSING: &str = "parsing";
    pub const PARSED: &str = "parsed";
    pub const ANALYZING: &str = "analyzing";
    pub const READY: &str = "ready";
    pub const FAILED: &str = "failed";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub s3_key: String,
    pub content_type: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One analysis pass over a resume. Append-only: re-analysis inserts a new
/// version instead of updating the previous one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeVersionRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub version: i32,
    pub extracted_text: Option<String>,
    pub ats_report: Option<Value>,
    pub ai_review: Option<Value>,
    pub created_at: DateTime<Utc>,
}
