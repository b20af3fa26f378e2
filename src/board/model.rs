#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::board::dates;
use crate::error::TaskboardError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Closed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Open, TaskStatus::InProgress, TaskStatus::Closed];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Closed => "closed",
        }
    }

    /// Accepts the wire forms plus the legacy Japanese board labels.
    pub fn parse(s: &str) -> Result<Self, TaskboardError> {
        match s.trim() {
            "open" | "未対応" => Ok(TaskStatus::Open),
            "in-progress" | "in_progress" | "対応中" => Ok(TaskStatus::InProgress),
            "closed" | "クローズ" => Ok(TaskStatus::Closed),
            other => Err(TaskboardError::invalid_value(
                "status",
                format!("unrecognized status '{other}' (expected open, in-progress, or closed)"),
            )),
        }
    }

    #[must_use]
    pub fn cycle(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    #[serde(with = "dates::stamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "dates::stamp")]
    pub updated_at: OffsetDateTime,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub next_action: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub source: String,
}

impl TaskRecord {
    #[must_use]
    pub fn new_id() -> String {
        let id = Uuid::new_v4().simple().to_string();
        id.chars().take(8).collect()
    }
}

/// Input to `TaskStore::add`: every field except the store-assigned ones.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub description: String,
    pub status: TaskStatus,
    pub owner: String,
    pub next_action: String,
    pub notes: String,
    pub source: String,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            description: String::new(),
            status: TaskStatus::InProgress,
            owner: String::new(),
            next_action: String::new(),
            notes: String::new(),
            source: String::new(),
        }
    }
}

/// Partial update; `id` and `created_at` are deliberately not expressible.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub owner: Option<String>,
    pub next_action: Option<String>,
    pub notes: Option<String>,
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_wire_and_legacy_forms() {
        assert_eq!(TaskStatus::parse("in-progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("in_progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("対応中").unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("クローズ").unwrap(), TaskStatus::Closed);
        assert_eq!(TaskStatus::parse(" open ").unwrap(), TaskStatus::Open);
        assert!(TaskStatus::parse("done").is_err());
    }

    #[test]
    fn status_round_trips_through_as_str() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn new_ids_are_short_and_distinct() {
        let a = TaskRecord::new_id();
        let b = TaskRecord::new_id();
        assert_eq!(a.chars().count(), 8);
        assert_ne!(a, b);
    }
}
