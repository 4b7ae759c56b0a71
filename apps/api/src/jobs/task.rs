//! Task envelope and payloads for the background pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::retry::policy_for;

/// Named queues, one per task type.
pub mod queues {
    pub const EXTRACT: &str = "extract";
    pub const ANALYSIS: &str = "analysis";
    pub const MATCHING: &str = "matching";

    /// Workers poll in this order: user-facing matching first, then the
    /// analysis chain, then fresh uploads.
    pub const POLL_ORDER: [&str; 3] = [MATCHING, ANALYSIS, EXTRACT];
}

/// What a worker should do. Payloads carry row ids only; workers reload
/// state from Postgres so a retried task always sees current data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    ExtractText { resume_id: Uuid },
    AnalyzeResume { resume_id: Uuid },
    MatchJd { matching_id: Uuid },
}

impl TaskKind {
    pub fn queue(&self) -> &'static str {
        match self {
            TaskKind::ExtractText { .. } => queues::EXTRACT,
            TaskKind::AnalyzeResume { .. } => queues::ANALYSIS,
            TaskKind::MatchJd { .. } => queues::MATCHING,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::ExtractText { .. } => "extract_text",
            TaskKind::AnalyzeResume { .. } => "analyze_resume",
            TaskKind::MatchJd { .. } => "match_jd",
        }
    }
}

/// The serialized unit that lives on the Redis queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub kind: TaskKind,
    /// Completed attempts so far (0 before the first run).
    pub attempt: u32,
    pub max_attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub last_error: Option<String>,
    /// Dedup key released when the task finishes, if one was taken.
    pub unique_key: Option<String>,
}

impl Task {
    pub fn new(kind: TaskKind) -> Self {
        let max_attempts = policy_for(kind.queue()).max_attempts;
        Self {
            id: Uuid::new_v4(),
            kind,
            attempt: 0,
            max_attempts,
            enqueued_at: Utc::now(),
            last_error: None,
            unique_key: None,
        }
    }

    pub fn with_unique_key(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_to_queue() {
        let resume_id = Uuid::new_v4();
        assert_eq!(
            TaskKind::ExtractText { resume_id }.queue(),
            queues::EXTRACT
        );
        assert_eq!(
            TaskKind::AnalyzeResume { resume_id }.queue(),
            queues::ANALYSIS
        );
        assert_eq!(
            TaskKind::MatchJd {
                matching_id: resume_id
            }
            .queue(),
            queues::MATCHING
        );
    }

    #[test]
    fn test_task_json_round_trip() {
        let task = Task::new(TaskKind::MatchJd {
            matching_id: Uuid::new_v4(),
        });
        let json = task.to_json().unwrap();
        let restored = Task::from_json(&json).unwrap();
        assert_eq!(restored.id, task.id);
        assert_eq!(restored.kind, task.kind);
        assert_eq!(restored.attempt, 0);
    }

    #[test]
    fn test_kind_serializes_with_snake_case_tag() {
        let task = Task::new(TaskKind::ExtractText {
            resume_id: Uuid::new_v4(),
        });
        let json = task.to_json().unwrap();
        assert!(json.contains(r#""type":"extract_text""#));
    }

    #[test]
    fn test_max_attempts_comes_from_queue_policy() {
        let extract = Task::new(TaskKind::ExtractText {
            resume_id: Uuid::new_v4(),
        });
        let matching = Task::new(TaskKind::MatchJd {
            matching_id: Uuid::new_v4(),
        });
        assert_eq!(extract.max_attempts, 3);
        assert_eq!(matching.max_attempts, 4);
    }

    #[test]
    fn test_poll_order_covers_all_queues() {
        assert!(queues::POLL_ORDER.contains(&queues::EXTRACT));
        assert!(queues::POLL_ORDER.contains(&queues::ANALYSIS));
        assert!(queues::POLL_ORDER.contains(&queues::MATCHING));
    }
}
