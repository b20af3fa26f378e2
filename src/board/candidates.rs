#![forbid(unsafe_code)]

use serde::Serialize;

use crate::board::model::TaskRecord;

/// Stock waiting-for-reply markers carried over from the paper board.
pub const DEFAULT_KEYWORDS: [&str; 5] = ["返信待ち", "返信無し", "返信なし", "返信ない", "催促"];

pub const DEFAULT_STALE_DAYS: i64 = 7;

/// Policy for the close-candidate heuristic. Which text fields participate
/// and the staleness threshold are configuration, not constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePolicy {
    pub keywords: Vec<String>,
    pub stale_days: i64,
    pub match_description: bool,
    pub match_next_action: bool,
    pub match_notes: bool,
}

impl Default for CandidatePolicy {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_owned()).collect(),
            stale_days: DEFAULT_STALE_DAYS,
            match_description: true,
            match_next_action: true,
            match_notes: true,
        }
    }
}

impl CandidatePolicy {
    #[must_use]
    pub fn from_config(cfg: &crate::config::HeuristicConfig) -> Self {
        Self {
            keywords: cfg
                .keywords
                .iter()
                .map(|k| k.trim().to_owned())
                .filter(|k| !k.is_empty())
                .collect(),
            stale_days: cfg.stale_days,
            match_description: cfg.match_description,
            match_next_action: cfg.match_next_action,
            match_notes: cfg.match_notes,
        }
    }

    #[must_use]
    pub fn matches_keywords(&self, record: &TaskRecord) -> bool {
        let mut haystacks: Vec<String> = Vec::with_capacity(3);
        if self.match_description {
            haystacks.push(record.description.to_lowercase());
        }
        if self.match_next_action {
            haystacks.push(record.next_action.to_lowercase());
        }
        if self.match_notes {
            haystacks.push(record.notes.to_lowercase());
        }

        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .any(|k| haystacks.iter().any(|h| h.contains(&k)))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct BoardSummary {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
    pub waiting_reply: usize,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::board::model::TaskStatus;

    use super::*;

    fn record(description: &str, next_action: &str, notes: &str) -> TaskRecord {
        TaskRecord {
            id: TaskRecord::new_id(),
            created_at: datetime!(2025-01-01 00:00:00 UTC),
            updated_at: datetime!(2025-01-01 00:00:00 UTC),
            description: description.to_owned(),
            status: TaskStatus::InProgress,
            owner: String::new(),
            next_action: next_action.to_owned(),
            notes: notes.to_owned(),
            source: String::new(),
        }
    }

    #[test]
    fn keyword_match_is_substring_over_selected_fields() {
        let policy = CandidatePolicy::default();
        assert!(policy.matches_keywords(&record("先方からの返信待ち", "", "")));
        assert!(policy.matches_keywords(&record("", "来週催促する", "")));
        assert!(policy.matches_keywords(&record("", "", "返信なしのまま")));
        assert!(!policy.matches_keywords(&record("見積もり作成", "レビュー依頼", "")));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let policy = CandidatePolicy {
            keywords: vec!["Waiting For Reply".to_owned()],
            ..CandidatePolicy::default()
        };
        assert!(policy.matches_keywords(&record("still WAITING for REPLY", "", "")));
    }

    #[test]
    fn disabled_fields_are_ignored() {
        let policy = CandidatePolicy {
            match_description: false,
            match_next_action: false,
            ..CandidatePolicy::default()
        };
        assert!(!policy.matches_keywords(&record("返信待ち", "催促", "")));
        assert!(policy.matches_keywords(&record("", "", "返信待ち")));
    }

    #[test]
    fn blank_keywords_never_match() {
        let policy = CandidatePolicy {
            keywords: vec![String::new(), "  ".to_owned()],
            ..CandidatePolicy::default()
        };
        assert!(!policy.matches_keywords(&record("anything at all", "", "")));
    }
}
