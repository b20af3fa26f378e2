#![forbid(unsafe_code)]

use time::OffsetDateTime;

use crate::board::candidates::{BoardSummary, CandidatePolicy};
use crate::board::dates;
use crate::board::filter::FilterSpec;
use crate::board::model::{TaskChanges, TaskDraft, TaskRecord, TaskStatus};
use crate::error::TaskboardError;

/// The board's record collection, insertion order preserved. Holds no clock
/// and performs no I/O; callers supply `now` and run the storage port after
/// each successful mutation. Every operation is all-or-nothing: validation
/// happens before the first field is touched.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    records: Vec<TaskRecord>,
}

impl TaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: Vec<TaskRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn add(&mut self, draft: TaskDraft, now: OffsetDateTime) -> Result<String, TaskboardError> {
        if draft.description.trim().is_empty() {
            return Err(TaskboardError::invalid_value(
                "description",
                "must not be empty",
            ));
        }

        let id = self.mint_id();
        self.records.push(TaskRecord {
            id: id.clone(),
            created_at: now,
            updated_at: now,
            description: draft.description,
            status: draft.status,
            owner: draft.owner,
            next_action: draft.next_action,
            notes: draft.notes,
            source: draft.source,
        });
        Ok(id)
    }

    pub fn update(
        &mut self,
        id: &str,
        changes: TaskChanges,
        now: OffsetDateTime,
    ) -> Result<&TaskRecord, TaskboardError> {
        if let Some(description) = changes.description.as_deref()
            && description.trim().is_empty()
        {
            return Err(TaskboardError::invalid_value(
                "description",
                "must not be empty",
            ));
        }

        let idx = self
            .index_of(id)
            .ok_or_else(|| TaskboardError::NotFound(id.to_owned()))?;

        let record = &mut self.records[idx];
        if let Some(description) = changes.description {
            record.description = description;
        }
        if let Some(status) = changes.status {
            record.status = status;
        }
        if let Some(owner) = changes.owner {
            record.owner = owner;
        }
        if let Some(next_action) = changes.next_action {
            record.next_action = next_action;
        }
        if let Some(notes) = changes.notes {
            record.notes = notes;
        }
        if let Some(source) = changes.source {
            record.source = source;
        }
        record.updated_at = now;

        Ok(&self.records[idx])
    }

    pub fn close_many(
        &mut self,
        ids: &[String],
        now: OffsetDateTime,
    ) -> Result<usize, TaskboardError> {
        self.require_all(ids)?;

        let mut closed = 0usize;
        for record in &mut self.records {
            if ids.iter().any(|id| *id == record.id) {
                record.status = TaskStatus::Closed;
                record.updated_at = now;
                closed += 1;
            }
        }
        Ok(closed)
    }

    pub fn remove(&mut self, id: &str) -> Result<TaskRecord, TaskboardError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| TaskboardError::NotFound(id.to_owned()))?;
        Ok(self.records.remove(idx))
    }

    pub fn remove_many(&mut self, ids: &[String]) -> Result<Vec<TaskRecord>, TaskboardError> {
        self.require_all(ids)?;

        let mut removed = Vec::with_capacity(ids.len());
        self.records.retain(|r| {
            if ids.iter().any(|id| *id == r.id) {
                removed.push(r.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    /// Lazy filtered view in store order; re-evaluates against current state
    /// on every call.
    pub fn filter<'a>(&'a self, spec: &'a FilterSpec) -> impl Iterator<Item = &'a TaskRecord> + 'a {
        self.records.iter().filter(move |r| spec.matches(r))
    }

    /// In-progress records whose text matches a policy keyword and whose last
    /// update is at least `stale_days` calendar days old (inclusive),
    /// most stale first.
    #[must_use]
    pub fn close_candidates<'a>(
        &'a self,
        policy: &CandidatePolicy,
        now: OffsetDateTime,
    ) -> Vec<&'a TaskRecord> {
        let today = now.date();
        let mut out: Vec<&TaskRecord> = self
            .records
            .iter()
            .filter(|r| {
                r.status == TaskStatus::InProgress
                    && policy.matches_keywords(r)
                    && dates::staleness_days(today, r.updated_at.date()) >= policy.stale_days
            })
            .collect();
        out.sort_by_key(|r| r.updated_at);
        out
    }

    #[must_use]
    pub fn summary(&self, policy: &CandidatePolicy) -> BoardSummary {
        let mut summary = BoardSummary {
            total: self.records.len(),
            ..BoardSummary::default()
        };
        for record in &self.records {
            match record.status {
                TaskStatus::Open => summary.open += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Closed => summary.closed += 1,
            }
            if policy.matches_keywords(record) {
                summary.waiting_reply += 1;
            }
        }
        summary
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn require_all(&self, ids: &[String]) -> Result<(), TaskboardError> {
        for id in ids {
            if self.index_of(id).is_none() {
                return Err(TaskboardError::NotFound(id.clone()));
            }
        }
        Ok(())
    }

    fn mint_id(&self) -> String {
        loop {
            let id = TaskRecord::new_id();
            if self.index_of(&id).is_none() {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const T0: OffsetDateTime = datetime!(2025-06-01 09:00:00 UTC);
    const T1: OffsetDateTime = datetime!(2025-06-05 10:30:00 UTC);

    fn draft(description: &str) -> TaskDraft {
        TaskDraft {
            description: description.to_owned(),
            ..TaskDraft::default()
        }
    }

    fn seeded() -> (TaskStore, Vec<String>) {
        let mut store = TaskStore::new();
        let ids = vec![
            store.add(draft("first"), T0).unwrap(),
            store.add(draft("second"), T0).unwrap(),
            store.add(draft("third"), T0).unwrap(),
        ];
        (store, ids)
    }

    #[test]
    fn add_sets_both_stamps_to_now_and_mints_unique_ids() {
        let mut store = TaskStore::new();
        let a = store.add(draft("one"), T0).unwrap();
        let b = store.add(draft("two"), T0).unwrap();
        assert_ne!(a, b);

        let r = store.get(&a).unwrap();
        assert_eq!(r.created_at, T0);
        assert_eq!(r.updated_at, T0);
    }

    #[test]
    fn add_rejects_blank_description() {
        let mut store = TaskStore::new();
        assert!(matches!(
            store.add(draft("   "), T0),
            Err(TaskboardError::InvalidValue { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn update_refreshes_updated_at_even_for_empty_changes() {
        let (mut store, ids) = seeded();
        let updated = store.update(&ids[0], TaskChanges::default(), T1).unwrap();
        assert_eq!(updated.created_at, T0);
        assert_eq!(updated.updated_at, T1);
        assert_eq!(updated.description, "first");
    }

    #[test]
    fn update_applies_partial_changes_and_keeps_created_at() {
        let (mut store, ids) = seeded();
        let changes = TaskChanges {
            status: Some(TaskStatus::Closed),
            owner: Some("alice".to_owned()),
            ..TaskChanges::default()
        };
        let updated = store.update(&ids[1], changes, T1).unwrap();
        assert_eq!(updated.status, TaskStatus::Closed);
        assert_eq!(updated.owner, "alice");
        assert_eq!(updated.created_at, T0);
        assert_eq!(updated.updated_at, T1);
    }

    #[test]
    fn update_unknown_id_leaves_store_unchanged() {
        let (mut store, _ids) = seeded();
        let before = store.records().to_vec();
        let err = store.update("nope", TaskChanges::default(), T1).unwrap_err();
        assert!(matches!(err, TaskboardError::NotFound(_)));
        assert_eq!(store.records(), before.as_slice());
    }

    #[test]
    fn update_rejects_blank_description_without_touching_updated_at() {
        let (mut store, ids) = seeded();
        let changes = TaskChanges {
            description: Some(String::new()),
            ..TaskChanges::default()
        };
        assert!(store.update(&ids[0], changes, T1).is_err());
        assert_eq!(store.get(&ids[0]).unwrap().updated_at, T0);
    }

    #[test]
    fn filter_without_predicates_returns_all_in_insertion_order_and_is_restartable() {
        let (store, ids) = seeded();
        let spec = FilterSpec::default();

        let first: Vec<&str> = store.filter(&spec).map(|r| r.id.as_str()).collect();
        let second: Vec<&str> = store.filter(&spec).map(|r| r.id.as_str()).collect();
        assert_eq!(first, ids.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(first, second);
    }

    #[test]
    fn filter_reevaluates_against_current_state() {
        let (mut store, _) = seeded();
        let spec = FilterSpec {
            status: Some(TaskStatus::Open),
            ..FilterSpec::default()
        };
        assert_eq!(store.filter(&spec).count(), 0);

        let mut open_draft = draft("now open");
        open_draft.status = TaskStatus::Open;
        store.add(open_draft, T1).unwrap();
        assert_eq!(store.filter(&spec).count(), 1);
    }

    #[test]
    fn close_many_is_all_or_nothing() {
        let (mut store, ids) = seeded();
        let request = vec![ids[0].clone(), "missing".to_owned()];
        assert!(store.close_many(&request, T1).is_err());
        assert_eq!(store.get(&ids[0]).unwrap().status, TaskStatus::InProgress);

        let closed = store.close_many(&ids, T1).unwrap();
        assert_eq!(closed, 3);
        assert!(store.records().iter().all(|r| r.status == TaskStatus::Closed));
        assert!(store.records().iter().all(|r| r.updated_at == T1));
    }

    #[test]
    fn remove_returns_the_record_and_drops_it() {
        let (mut store, ids) = seeded();
        let removed = store.remove(&ids[1]).unwrap();
        assert_eq!(removed.description, "second");
        assert_eq!(store.len(), 2);
        assert!(store.get(&ids[1]).is_none());

        assert!(matches!(
            store.remove(&ids[1]),
            Err(TaskboardError::NotFound(_))
        ));
    }

    #[test]
    fn remove_many_preserves_order_of_survivors() {
        let (mut store, ids) = seeded();
        let removed = store.remove_many(&[ids[0].clone(), ids[2].clone()]).unwrap();
        assert_eq!(removed.len(), 2);
        let left: Vec<&str> = store.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(left, vec![ids[1].as_str()]);
    }

    // Close-candidate heuristic.

    fn stale_record(store: &mut TaskStore, description: &str, days_ago: i64, now: OffsetDateTime) -> String {
        let id = store.add(draft(description), now).unwrap();
        let idx = store.records.iter().position(|r| r.id == id).unwrap();
        let stamp = now - time::Duration::days(days_ago);
        store.records[idx].created_at = stamp;
        store.records[idx].updated_at = stamp;
        id
    }

    #[test]
    fn candidate_requires_all_three_predicates() {
        let now = datetime!(2025-06-20 12:00:00 UTC);
        let policy = CandidatePolicy {
            keywords: vec!["ご確認".to_owned(), "お願いします".to_owned()],
            ..CandidatePolicy::default()
        };

        let mut store = TaskStore::new();
        let id = stale_record(&mut store, "ご確認のほどお願いします", 10, now);

        let hits: Vec<&str> = store
            .close_candidates(&policy, now)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(hits, vec![id.as_str()]);

        // Same record, threshold above its staleness.
        let strict = CandidatePolicy {
            stale_days: 11,
            ..policy.clone()
        };
        assert!(store.close_candidates(&strict, now).is_empty());

        // Keyword mismatch.
        let other = CandidatePolicy {
            keywords: vec!["見積".to_owned()],
            ..policy.clone()
        };
        assert!(store.close_candidates(&other, now).is_empty());

        // Status mismatch.
        store
            .update(
                &id,
                TaskChanges {
                    status: Some(TaskStatus::Closed),
                    ..TaskChanges::default()
                },
                now - time::Duration::days(10),
            )
            .unwrap();
        assert!(store.close_candidates(&policy, now).is_empty());
    }

    #[test]
    fn staleness_boundary_is_inclusive() {
        let now = datetime!(2025-06-20 12:00:00 UTC);
        let policy = CandidatePolicy {
            keywords: vec!["返信待ち".to_owned()],
            ..CandidatePolicy::default()
        };

        let mut store = TaskStore::new();
        let exactly = stale_record(&mut store, "返信待ち exactly", 7, now);
        let _fresh = stale_record(&mut store, "返信待ち fresh", 6, now);

        let hits: Vec<&str> = store
            .close_candidates(&policy, now)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(hits, vec![exactly.as_str()]);
    }

    #[test]
    fn closed_records_never_surface_as_candidates() {
        let now = datetime!(2025-06-20 12:00:00 UTC);
        let mut store = TaskStore::new();
        let id = stale_record(&mut store, "返信待ちのまま放置", 30, now);
        let idx = store.records.iter().position(|r| r.id == id).unwrap();
        store.records[idx].status = TaskStatus::Closed;

        assert!(store.close_candidates(&CandidatePolicy::default(), now).is_empty());
    }

    #[test]
    fn candidates_are_ordered_most_stale_first() {
        let now = datetime!(2025-06-20 12:00:00 UTC);
        let mut store = TaskStore::new();
        let mid = stale_record(&mut store, "返信待ち b", 10, now);
        let oldest = stale_record(&mut store, "返信待ち c", 20, now);
        let newest = stale_record(&mut store, "返信待ち a", 8, now);

        let hits: Vec<&str> = store
            .close_candidates(&CandidatePolicy::default(), now)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(hits, vec![oldest.as_str(), mid.as_str(), newest.as_str()]);
    }

    #[test]
    fn summary_counts_statuses_and_keyword_hits() {
        let now = datetime!(2025-06-20 12:00:00 UTC);
        let mut store = TaskStore::new();
        store.add(draft("返信待ちの件"), now).unwrap();
        let mut open_draft = draft("新規の件");
        open_draft.status = TaskStatus::Open;
        store.add(open_draft, now).unwrap();
        let mut closed_draft = draft("済んだ件");
        closed_draft.status = TaskStatus::Closed;
        store.add(closed_draft, now).unwrap();

        let summary = store.summary(&CandidatePolicy::default());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.open, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.closed, 1);
        assert_eq!(summary.waiting_reply, 1);
    }
}
