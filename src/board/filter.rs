#![forbid(unsafe_code)]

use time::Date;

use crate::board::model::{TaskRecord, TaskStatus};

/// Declarative view filter; all supplied predicates must hold (logical AND).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub status: Option<TaskStatus>,
    pub owners: Vec<String>,
    pub contains: Option<String>,
    pub updated_from: Option<Date>,
    pub updated_to: Option<Date>,
}

impl FilterSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.owners.is_empty()
            && self.contains.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.updated_from.is_none()
            && self.updated_to.is_none()
    }

    #[must_use]
    pub fn matches(&self, record: &TaskRecord) -> bool {
        if let Some(status) = self.status
            && record.status != status
        {
            return false;
        }
        if !self.owners.is_empty() && !self.owners.iter().any(|o| o == &record.owner) {
            return false;
        }
        if let Some(needle) = self.contains.as_deref() {
            let needle = needle.trim().to_lowercase();
            if !needle.is_empty() && !text_fields_contain(record, &needle) {
                return false;
            }
        }
        let updated = record.updated_at.date();
        if let Some(from) = self.updated_from
            && updated < from
        {
            return false;
        }
        if let Some(to) = self.updated_to
            && updated > to
        {
            return false;
        }
        true
    }
}

fn text_fields_contain(record: &TaskRecord, needle: &str) -> bool {
    record.description.to_lowercase().contains(needle)
        || record.next_action.to_lowercase().contains(needle)
        || record.notes.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    fn record(description: &str, status: TaskStatus, owner: &str) -> TaskRecord {
        TaskRecord {
            id: TaskRecord::new_id(),
            created_at: datetime!(2025-01-01 00:00:00 UTC),
            updated_at: datetime!(2025-01-15 12:00:00 UTC),
            description: description.to_owned(),
            status,
            owner: owner.to_owned(),
            next_action: String::new(),
            notes: String::new(),
            source: String::new(),
        }
    }

    #[test]
    fn empty_spec_matches_everything() {
        let spec = FilterSpec::default();
        assert!(spec.is_empty());
        assert!(spec.matches(&record("anything", TaskStatus::Open, "a")));
    }

    #[test]
    fn predicates_combine_with_and() {
        let spec = FilterSpec {
            status: Some(TaskStatus::InProgress),
            owners: vec!["alice".to_owned()],
            contains: Some("vendor".to_owned()),
            ..FilterSpec::default()
        };

        let mut r = record("Chase the VENDOR quote", TaskStatus::InProgress, "alice");
        assert!(spec.matches(&r));

        r.owner = "bob".to_owned();
        assert!(!spec.matches(&r));

        r.owner = "alice".to_owned();
        r.status = TaskStatus::Closed;
        assert!(!spec.matches(&r));
    }

    #[test]
    fn contains_searches_all_text_fields_case_insensitively() {
        let spec = FilterSpec {
            contains: Some("催促".to_owned()),
            ..FilterSpec::default()
        };
        let mut r = record("発注確認", TaskStatus::Open, "");
        assert!(!spec.matches(&r));
        r.notes = "明日催促する".to_owned();
        assert!(spec.matches(&r));
    }

    #[test]
    fn updated_range_is_inclusive_on_both_ends() {
        let spec = FilterSpec {
            updated_from: Some(date!(2025 - 01 - 15)),
            updated_to: Some(date!(2025 - 01 - 15)),
            ..FilterSpec::default()
        };
        assert!(spec.matches(&record("x", TaskStatus::Open, "")));

        let spec = FilterSpec {
            updated_from: Some(date!(2025 - 01 - 16)),
            ..FilterSpec::default()
        };
        assert!(!spec.matches(&record("x", TaskStatus::Open, "")));
    }
}
