#![forbid(unsafe_code)]

pub mod audit;
pub mod csv;

pub use csv::CsvBoard;

use crate::board::model::TaskRecord;

/// Storage port for the board. The store never persists itself; callers
/// inject an implementation and invoke `save` after each successful mutation.
pub trait BoardStorage {
    fn load(&self) -> anyhow::Result<Vec<TaskRecord>>;
    fn save(&self, records: &[TaskRecord]) -> anyhow::Result<()>;
}

// Spreadsheet formula injection guard: cells opening with one of these get a
// leading apostrophe on save and lose it again on load.
const FORMULA_PREFIXES: [char; 4] = ['=', '+', '-', '@'];

const MISSING_MARKERS: [&str; 7] = ["none", "null", "nan", "na", "n/a", "-", "—"];

#[must_use]
pub(crate) fn sanitize_cell(value: &str) -> String {
    if value.starts_with(FORMULA_PREFIXES) {
        format!("'{value}")
    } else {
        value.to_owned()
    }
}

#[must_use]
pub(crate) fn restore_cell(value: &str) -> &str {
    match value.strip_prefix('\'') {
        Some(rest) if rest.starts_with(FORMULA_PREFIXES) => rest,
        _ => value,
    }
}

/// Empty out placeholder spellings of "no value" left behind by hand edits.
#[must_use]
pub(crate) fn normalize_text(value: &str) -> String {
    let restored = restore_cell(value);
    let probe = restored.trim().to_lowercase();
    if probe.is_empty() || MISSING_MARKERS.contains(&probe.as_str()) {
        String::new()
    } else {
        restored.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_guards_formula_prefixes_and_restore_inverts_it() {
        for hazard in ["=SUM(A1:A9)", "+1234", "-rm -rf", "@import"] {
            let guarded = sanitize_cell(hazard);
            assert!(guarded.starts_with('\''));
            assert_eq!(restore_cell(&guarded), hazard);
        }
        assert_eq!(sanitize_cell("plain text"), "plain text");
        assert_eq!(restore_cell("'quoted but harmless"), "'quoted but harmless");
    }

    #[test]
    fn normalize_text_drops_missing_markers() {
        for missing in ["", " ", "None", "null", "NaN", "na", "N/A", "-", "—"] {
            assert_eq!(normalize_text(missing), "");
        }
        assert_eq!(normalize_text("実データ"), "実データ");
        assert_eq!(normalize_text("'=guarded"), "=guarded");
    }
}
