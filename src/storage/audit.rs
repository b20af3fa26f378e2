#![forbid(unsafe_code)]

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::board::dates;
use crate::board::model::TaskRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Close,
    Remove,
    RemoveBulk,
}

impl AuditAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Close => "close",
            AuditAction::Remove => "remove",
            AuditAction::RemoveBulk => "remove-bulk",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub ts: String,
    pub user: String,
    pub action: String,
    pub task_id: String,
    pub before: String,
    pub after: String,
}

/// Append-only mutation journal. `before`/`after` are JSON snapshots of the
/// whole record; a failure to append surfaces but never rolls back the board.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    user: String,
}

impl AuditLog {
    #[must_use]
    pub fn new(path: PathBuf, user: impl Into<String>) -> Self {
        Self {
            path,
            user: user.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        action: AuditAction,
        task_id: &str,
        before: Option<&TaskRecord>,
        after: Option<&TaskRecord>,
        now: OffsetDateTime,
    ) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let fresh = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            wtr.write_record(["ts", "user", "action", "task_id", "before", "after"])?;
        }
        wtr.write_record([
            dates::format_stamp(now, true),
            self.user.clone(),
            action.as_str().to_owned(),
            task_id.to_owned(),
            snapshot(before)?,
            snapshot(after)?,
        ])?;
        wtr.flush()?;
        Ok(())
    }

    /// The `limit` most recent entries, newest first.
    pub fn read_recent(&self, limit: usize) -> anyhow::Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = ReaderBuilder::new()
            .from_path(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut entries: Vec<AuditEntry> = Vec::new();
        for entry in rdr.deserialize() {
            let entry: AuditEntry =
                entry.with_context(|| format!("failed to parse {}", self.path.display()))?;
            entries.push(entry);
        }

        let skip = entries.len().saturating_sub(limit);
        let mut recent: Vec<AuditEntry> = entries.split_off(skip);
        recent.reverse();
        Ok(recent)
    }
}

fn snapshot(record: Option<&TaskRecord>) -> anyhow::Result<String> {
    match record {
        Some(record) => Ok(serde_json::to_string(record)?),
        None => Ok("{}".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::board::model::{TaskDraft, TaskStatus};
    use crate::board::store::TaskStore;

    use super::*;

    #[test]
    fn append_and_read_back_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = AuditLog::new(dir.path().join("audit.csv"), "tester");
        let now = datetime!(2025-04-01 10:00:00 UTC);

        let mut store = TaskStore::new();
        let id = store
            .add(
                TaskDraft {
                    description: "追跡対象".to_owned(),
                    ..TaskDraft::default()
                },
                now,
            )
            .unwrap();
        let record = store.get(&id).unwrap().clone();

        log.append(AuditAction::Create, &id, None, Some(&record), now)
            .unwrap();
        log.append(
            AuditAction::Close,
            &id,
            Some(&record),
            Some(&record),
            now + time::Duration::hours(1),
        )
        .unwrap();

        let entries = log.read_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "close");
        assert_eq!(entries[1].action, "create");
        assert_eq!(entries[1].user, "tester");
        assert_eq!(entries[1].before, "{}");

        let after: TaskRecord = serde_json::from_str(&entries[1].after).unwrap();
        assert_eq!(after.description, "追跡対象");
        assert_eq!(after.status, TaskStatus::InProgress);

        let only_latest = log.read_recent(1).unwrap();
        assert_eq!(only_latest.len(), 1);
        assert_eq!(only_latest[0].action, "close");
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = AuditLog::new(dir.path().join("none.csv"), "tester");
        assert!(log.read_recent(5).unwrap().is_empty());
    }
}
