#![forbid(unsafe_code)]

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::TaskboardError;

const STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[must_use]
pub fn format_stamp(ts: OffsetDateTime, with_time: bool) -> String {
    let ts = ts.to_offset(UtcOffset::UTC);
    let primitive = PrimitiveDateTime::new(ts.date(), ts.time());
    let fmt = if with_time { STAMP_FORMAT } else { DATE_FORMAT };
    primitive.format(fmt).unwrap_or_default()
}

pub fn parse_stamp(s: &str) -> Result<OffsetDateTime, TaskboardError> {
    let s = s.trim();
    if let Ok(dt) = PrimitiveDateTime::parse(s, STAMP_FORMAT) {
        return Ok(dt.assume_utc());
    }
    if let Ok(d) = Date::parse(s, DATE_FORMAT) {
        return Ok(d.midnight().assume_utc());
    }
    Err(TaskboardError::invalid_value(
        "timestamp",
        format!("unrecognized date '{s}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)"),
    ))
}

pub fn parse_date(s: &str) -> Result<Date, TaskboardError> {
    Date::parse(s.trim(), DATE_FORMAT).map_err(|_| {
        TaskboardError::invalid_value("date", format!("unrecognized date '{s}' (expected YYYY-MM-DD)"))
    })
}

/// Whole days elapsed, measured on calendar dates.
#[must_use]
pub fn staleness_days(today: Date, updated: Date) -> i64 {
    (today - updated).whole_days()
}

pub mod stamp {
    use serde::{Deserialize as _, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_stamp(*ts, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_stamp(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn formats_with_and_without_time() {
        let ts = datetime!(2025-03-01 09:30:15 UTC);
        assert_eq!(format_stamp(ts, true), "2025-03-01 09:30:15");
        assert_eq!(format_stamp(ts, false), "2025-03-01");
    }

    #[test]
    fn parses_both_wire_forms() {
        assert_eq!(
            parse_stamp("2025-03-01 09:30:15").unwrap(),
            datetime!(2025-03-01 09:30:15 UTC)
        );
        assert_eq!(
            parse_stamp("2025-03-01").unwrap(),
            datetime!(2025-03-01 00:00:00 UTC)
        );
        assert!(parse_stamp("yesterday").is_err());
    }

    #[test]
    fn staleness_counts_calendar_days() {
        let now = datetime!(2025-03-10 00:10:00 UTC);
        let updated = datetime!(2025-03-03 23:50:00 UTC);
        assert_eq!(staleness_days(now.date(), updated.date()), 7);
    }
}
