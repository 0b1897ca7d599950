use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod slack;

/// Where a task was captured from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Slack,
    Gmail,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Slack => "slack",
            Source::Gmail => "gmail",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "slack" => Ok(Source::Slack),
            "gmail" => Ok(Source::Gmail),
            other => Err(format!("Unknown source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Project {
    Nexo,
    Mindhub,
    Personal,
}

impl Project {
    /// Fixed display order for every grouped listing.
    pub const ALL: [Project; 3] = [Project::Nexo, Project::Mindhub, Project::Personal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Project::Nexo => "nexo",
            Project::Mindhub => "mindhub",
            Project::Personal => "personal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Project::Nexo => "NEXO",
            Project::Mindhub => "MINDHUB",
            Project::Personal => "PERSONAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Project::Nexo => "🔵",
            Project::Mindhub => "🟣",
            Project::Personal => "🟢",
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Project {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "nexo" => Ok(Project::Nexo),
            "mindhub" => Ok(Project::Mindhub),
            "personal" => Ok(Project::Personal),
            other => Err(format!("Unknown project: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Sort rank: high sorts before medium before low.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// Fixed-width listing tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Priority::High => "[HIGH]",
            Priority::Medium => "[MED] ",
            Priority::Low => "[LOW] ",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" | "med" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("Unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Done,
    Snoozed,
}

impl Default for Status {
    fn default() -> Self {
        Self::Open
    }
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Done => "done",
            Status::Snoozed => "snoozed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "done" => Ok(Status::Done),
            "snoozed" => Ok(Status::Snoozed),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// A stored task row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub context: Option<String>,
    pub source: Source,
    #[serde(default)]
    pub source_ref: Option<String>,
    pub project: Project,
    pub priority: Priority,
    pub status: Status,
    #[serde(default)]
    pub snooze_until: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload. Parsed straight from the CLI's JSON argument, so enum
/// fields are validated before anything reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub context: Option<String>,
    pub source: Source,
    #[serde(default)]
    pub source_ref: Option<String>,
    pub project: Project,
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub snooze_until: Option<NaiveDate>,
}

impl NewTask {
    /// Explicit id wins; otherwise a fresh v4 uuid.
    pub fn resolved_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

/// Allow-listed partial update. Unknown JSON keys are ignored; anything
/// outside these four fields cannot be patched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.context.is_none()
            && self.project.is_none()
            && self.priority.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_parses_with_minimal_fields() {
        let task: NewTask = serde_json::from_str(
            r#"{"title":"Ping Bob","source":"slack","project":"nexo","priority":"high"}"#,
        )
        .expect("valid payload");
        assert_eq!(task.title, "Ping Bob");
        assert_eq!(task.status, Status::Open);
        assert!(task.id.is_none());
        assert!(task.snooze_until.is_none());
    }

    #[test]
    fn new_task_rejects_unknown_enum_value() {
        let result = serde_json::from_str::<NewTask>(
            r#"{"title":"x","source":"carrier-pigeon","project":"nexo","priority":"high"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn resolved_id_is_unique_and_nonempty_when_absent() {
        let task: NewTask = serde_json::from_str(
            r#"{"title":"x","source":"gmail","project":"personal","priority":"low"}"#,
        )
        .expect("valid payload");
        let a = task.resolved_id();
        let b = task.resolved_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn resolved_id_keeps_explicit_id() {
        let task = NewTask {
            id: Some("task-1".to_string()),
            title: "x".to_string(),
            context: None,
            source: Source::Slack,
            source_ref: None,
            project: Project::Nexo,
            priority: Priority::High,
            status: Status::Open,
            snooze_until: None,
        };
        assert_eq!(task.resolved_id(), "task-1");
    }

    #[test]
    fn priority_rank_orders_high_before_medium_before_low() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn patch_emptiness_tracks_allowed_fields_only() {
        let empty: TaskPatch = serde_json::from_str(r#"{"status":"done"}"#).expect("parse");
        assert!(empty.is_empty());

        let patch: TaskPatch = serde_json::from_str(r#"{"priority":"low"}"#).expect("parse");
        assert!(!patch.is_empty());
    }
}
