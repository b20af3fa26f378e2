use time::macros::datetime;

use taskboard::board::candidates::CandidatePolicy;
use taskboard::board::filter::FilterSpec;
use taskboard::board::model::{TaskChanges, TaskDraft, TaskStatus};
use taskboard::board::store::TaskStore;
use taskboard::storage::audit::{AuditAction, AuditLog};
use taskboard::storage::{BoardStorage as _, CsvBoard};

#[test]
fn board_lifecycle_smoke() {
    let td = tempfile::tempdir().expect("tempdir");
    let storage = CsvBoard::new(td.path().join("tasks.csv"), true);
    let audit = AuditLog::new(td.path().join("audit.csv"), "integration");

    let t0 = datetime!(2025-05-01 09:00:00 UTC);
    let t1 = datetime!(2025-05-12 09:00:00 UTC);

    // Seed the board and persist it.
    let mut store = TaskStore::from_records(storage.load().expect("load empty"));
    assert!(store.is_empty());

    let waiting = store
        .add(
            TaskDraft {
                description: "ベンダーへ見積依頼".to_owned(),
                owner: "都筑".to_owned(),
                next_action: "返信待ち".to_owned(),
                ..TaskDraft::default()
            },
            t0,
        )
        .expect("add waiting");
    let fresh = store
        .add(
            TaskDraft {
                description: "新しい依頼の整理".to_owned(),
                status: TaskStatus::Open,
                ..TaskDraft::default()
            },
            t1,
        )
        .expect("add fresh");
    storage.save(store.records()).expect("save");
    audit
        .append(AuditAction::Create, &waiting, None, store.get(&waiting), t0)
        .expect("audit create");

    // A separate handle sees the identical ordered sequence.
    let mut reloaded = TaskStore::from_records(storage.load().expect("reload"));
    assert_eq!(reloaded.records(), store.records());

    // Update through the second handle and persist.
    let updated = reloaded
        .update(
            &fresh,
            TaskChanges {
                status: Some(TaskStatus::InProgress),
                notes: Some("午前中に着手".to_owned()),
                ..TaskChanges::default()
            },
            t1,
        )
        .expect("update")
        .clone();
    assert_eq!(updated.created_at, t1);
    assert_eq!(updated.updated_at, t1);
    storage.save(reloaded.records()).expect("save update");

    // The waiting task is a close candidate eleven days later; the fresh one
    // is not (keyword and staleness both miss).
    let now = datetime!(2025-05-12 10:00:00 UTC);
    let policy = CandidatePolicy::default();
    let candidates = reloaded.close_candidates(&policy, now);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, waiting);

    // Close it, persist, audit, and verify the filtered view.
    let before = reloaded.get(&waiting).expect("get before").clone();
    reloaded
        .close_many(std::slice::from_ref(&waiting), now)
        .expect("close");
    storage.save(reloaded.records()).expect("save close");
    audit
        .append(
            AuditAction::Close,
            &waiting,
            Some(&before),
            reloaded.get(&waiting),
            now,
        )
        .expect("audit close");

    let closed_spec = FilterSpec {
        status: Some(TaskStatus::Closed),
        ..FilterSpec::default()
    };
    let closed_view: Vec<_> = reloaded.filter(&closed_spec).collect();
    assert_eq!(closed_view.len(), 1);
    assert_eq!(closed_view[0].id, waiting);
    assert!(reloaded.close_candidates(&policy, now).is_empty());

    // Final reload agrees with the in-memory state, and the audit trail
    // recorded both actions newest first.
    let finale = TaskStore::from_records(storage.load().expect("final load"));
    assert_eq!(finale.records(), reloaded.records());

    let entries = audit.read_recent(10).expect("read audit");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "close");
    assert_eq!(entries[1].action, "create");
    assert_eq!(entries[0].user, "integration");
}

#[test]
fn candidate_boundary_matches_heuristic_spec() {
    let policy = CandidatePolicy {
        keywords: vec!["ご確認".to_owned(), "お願いします".to_owned()],
        ..CandidatePolicy::default()
    };
    let now = datetime!(2025-05-20 12:00:00 UTC);

    let mut store = TaskStore::new();
    let id = store
        .add(
            TaskDraft {
                description: "ご確認のほどお願いします".to_owned(),
                ..TaskDraft::default()
            },
            now - time::Duration::days(10),
        )
        .expect("add");

    // Ten days stale: included at the default threshold of seven.
    let hits = store.close_candidates(&policy, now);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);

    // Raising the threshold to eleven excludes it.
    let strict = CandidatePolicy {
        stale_days: 11,
        ..policy
    };
    assert!(store.close_candidates(&strict, now).is_empty());
}
