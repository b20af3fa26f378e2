#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use time::OffsetDateTime;

use crate::board::dates;
use crate::board::model::{TaskRecord, TaskStatus};
use crate::storage::{BoardStorage, normalize_text, sanitize_cell};

const HEADERS: [&str; 9] = [
    "id",
    "created_at",
    "updated_at",
    "description",
    "status",
    "owner",
    "next_action",
    "notes",
    "source",
];

/// Flat-file board: one row per record, full rewrite on every save.
#[derive(Debug, Clone)]
pub struct CsvBoard {
    path: PathBuf,
    save_with_time: bool,
}

impl CsvBoard {
    #[must_use]
    pub fn new(path: PathBuf, save_with_time: bool) -> Self {
        Self {
            path,
            save_with_time,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BoardStorage for CsvBoard {
    fn load(&self) -> anyhow::Result<Vec<TaskRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let headers = rdr
            .headers()
            .with_context(|| format!("failed to read headers of {}", self.path.display()))?
            .clone();
        let cols = Columns::resolve(&headers)
            .with_context(|| format!("unrecognized columns in {}", self.path.display()))?;

        let now = OffsetDateTime::now_utc();
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for (i, row) in rdr.records().enumerate() {
            let row = row.with_context(|| {
                format!("failed to parse row {} of {}", i + 2, self.path.display())
            })?;
            let record = parse_row(&cols, &row, now, &mut seen).with_context(|| {
                format!("invalid row {} of {}", i + 2, self.path.display())
            })?;
            records.push(record);
        }

        Ok(records)
    }

    fn save(&self, records: &[TaskRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut wtr = WriterBuilder::new()
                .from_path(&tmp)
                .with_context(|| format!("failed to write {}", tmp.display()))?;
            wtr.write_record(HEADERS)?;
            for r in records {
                wtr.write_record([
                    r.id.clone(),
                    dates::format_stamp(r.created_at, self.save_with_time),
                    dates::format_stamp(r.updated_at, self.save_with_time),
                    sanitize_cell(&r.description),
                    r.status.as_str().to_owned(),
                    sanitize_cell(&r.owner),
                    sanitize_cell(&r.next_action),
                    sanitize_cell(&r.notes),
                    sanitize_cell(&r.source),
                ])?;
            }
            wtr.flush()?;
        }

        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}

struct Columns {
    id: Option<usize>,
    created_at: usize,
    updated_at: usize,
    description: usize,
    status: usize,
    owner: Option<usize>,
    next_action: Option<usize>,
    notes: Option<usize>,
    source: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> anyhow::Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| anyhow::anyhow!("missing column '{}'", names[0]))
        };

        Ok(Self {
            id: find(&["id"]),
            created_at: require(&["created_at", "created"])?,
            updated_at: require(&["updated_at", "updated"])?,
            description: require(&["description", "task"])?,
            status: require(&["status"])?,
            owner: find(&["owner", "updater"]),
            next_action: find(&["next_action", "next action"]),
            notes: find(&["notes"]),
            source: find(&["source"]),
        })
    }
}

fn parse_row(
    cols: &Columns,
    row: &StringRecord,
    now: OffsetDateTime,
    seen: &mut HashSet<String>,
) -> anyhow::Result<TaskRecord> {
    let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

    let status_text = normalize_text(cell(Some(cols.status)));
    let status = if status_text.is_empty() {
        TaskStatus::Open
    } else {
        TaskStatus::parse(&status_text)?
    };

    let created = dates::parse_stamp(cell(Some(cols.created_at))).ok();
    let updated = dates::parse_stamp(cell(Some(cols.updated_at))).ok();
    let created_at = created.or(updated).unwrap_or(now);
    let mut updated_at = updated.or(created).unwrap_or(now);
    if updated_at < created_at {
        updated_at = created_at;
    }

    let id = fresh_id(normalize_text(cell(cols.id)), seen);

    Ok(TaskRecord {
        id,
        created_at,
        updated_at,
        description: normalize_text(cell(Some(cols.description))),
        status,
        owner: normalize_text(cell(cols.owner)),
        next_action: normalize_text(cell(cols.next_action)),
        notes: normalize_text(cell(cols.notes)),
        source: normalize_text(cell(cols.source)),
    })
}

// Blank and duplicate ids are re-minted on entry so the unique-id invariant
// holds even for hand-edited files.
fn fresh_id(id: String, seen: &mut HashSet<String>) -> String {
    let mut id = id;
    while id.is_empty() || seen.contains(&id) {
        id = TaskRecord::new_id();
    }
    seen.insert(id.clone());
    id
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn sample() -> Vec<TaskRecord> {
        vec![
            TaskRecord {
                id: "aaaa1111".to_owned(),
                created_at: datetime!(2025-02-01 08:00:00 UTC),
                updated_at: datetime!(2025-02-10 17:45:00 UTC),
                description: "ベンダーへ見積依頼".to_owned(),
                status: TaskStatus::InProgress,
                owner: "都筑".to_owned(),
                next_action: "返信待ち".to_owned(),
                notes: "2月頭に送付済み".to_owned(),
                source: "mail-4821".to_owned(),
            },
            TaskRecord {
                id: "bbbb2222".to_owned(),
                created_at: datetime!(2025-02-03 09:30:00 UTC),
                updated_at: datetime!(2025-02-03 09:30:00 UTC),
                description: "=SUM(A1:A9) を含む件名".to_owned(),
                status: TaskStatus::Closed,
                owner: String::new(),
                next_action: String::new(),
                notes: "-".to_owned(),
                source: String::new(),
            },
        ]
    }

    #[test]
    fn round_trip_reproduces_the_identical_sequence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let board = CsvBoard::new(dir.path().join("tasks.csv"), true);

        let records = sample();
        board.save(&records).unwrap();
        let loaded = board.load().unwrap();

        // The "-" placeholder normalizes to empty on the way back in.
        let mut expected = records;
        expected[1].notes = String::new();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn formula_cells_are_guarded_on_disk_but_restored_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let board = CsvBoard::new(dir.path().join("tasks.csv"), true);
        board.save(&sample()).unwrap();

        let raw = std::fs::read_to_string(board.path()).unwrap();
        assert!(raw.contains("'=SUM(A1:A9)"));

        let loaded = board.load().unwrap();
        assert_eq!(loaded[1].description, "=SUM(A1:A9) を含む件名");
    }

    #[test]
    fn date_only_mode_truncates_timestamps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let board = CsvBoard::new(dir.path().join("tasks.csv"), false);
        board.save(&sample()).unwrap();

        let loaded = board.load().unwrap();
        assert_eq!(loaded[0].created_at, datetime!(2025-02-01 00:00:00 UTC));
        assert_eq!(loaded[0].updated_at, datetime!(2025-02-10 00:00:00 UTC));
    }

    #[test]
    fn missing_file_loads_as_empty_board() {
        let dir = tempfile::tempdir().expect("tempdir");
        let board = CsvBoard::new(dir.path().join("absent.csv"), true);
        assert!(board.load().unwrap().is_empty());
    }

    #[test]
    fn hand_edited_rows_are_normalized_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.csv");
        std::fs::write(
            &path,
            "id,created_at,updated_at,description,status,owner,next_action,notes,source\n\
             dup1,2025-02-01,2025-01-20,alpha,対応中,none,null,,-\n\
             dup1,2025-02-02,,beta,closed,bob,,,\n\
             ,2025-02-03,2025-02-04,gamma,,,,n/a,\n",
        )
        .unwrap();

        let board = CsvBoard::new(path, true);
        let loaded = board.load().unwrap();
        assert_eq!(loaded.len(), 3);

        // Legacy status label, placeholder owner, clamped updated_at.
        assert_eq!(loaded[0].status, TaskStatus::InProgress);
        assert_eq!(loaded[0].owner, "");
        assert_eq!(loaded[0].updated_at, loaded[0].created_at);

        // Duplicate id re-minted, missing updated_at backfilled from created_at.
        assert_ne!(loaded[1].id, loaded[0].id);
        assert_eq!(loaded[1].updated_at, loaded[1].created_at);
        assert_eq!(loaded[1].status, TaskStatus::Closed);

        // Blank id minted, blank status defaults to open.
        assert!(!loaded[2].id.is_empty());
        assert_eq!(loaded[2].status, TaskStatus::Open);
        assert_eq!(loaded[2].notes, "");
    }

    #[test]
    fn unknown_status_is_rejected_with_row_context() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.csv");
        std::fs::write(
            &path,
            "id,created_at,updated_at,description,status,owner,next_action,notes,source\n\
             x,2025-02-01,2025-02-01,alpha,bogus,,,,\n",
        )
        .unwrap();

        let board = CsvBoard::new(path, true);
        let err = board.load().unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }
}
