//! Publisher date parsing with explicit formats and reference time zones.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("unparsable date text {text:?} for format {format:?}")]
    Format { text: String, format: String },
    #[error("local time {0} does not exist in the reference zone")]
    NonexistentLocal(NaiveDateTime),
}

// Zone abbreviations are informational only; the reference zone decides the offset.
static ZONE_ABBREVIATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?:E[SD]T|C[SD]T|M[SD]T|P[SD]T|ET|CT|PT|GMT|BST|UTC)\b").ok()
});

static LEADING_LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:updated|published|last updated|posted)(?:\s+on)?\s*:?\s*").ok()
});

/// Remove a leading "Updated"/"Published" label and any zone abbreviation,
/// then collapse whitespace.
pub fn strip_decorations(text: &str) -> String {
    let mut s = text.to_string();
    if let Some(re) = LEADING_LABEL.as_ref() {
        s = re.replace(&s, "").into_owned();
    }
    if let Some(re) = ZONE_ABBREVIATION.as_ref() {
        s = re.replace_all(&s, "").into_owned();
    }
    let s = s.replace(" ,", ",");
    crate::text::collapse_whitespace(&s)
}

/// Parse local date-time `text` with `format`, interpreting it in `zone`.
///
/// ```
/// use slant_extract::dates::parse_local;
///
/// let dt = parse_local("March 5, 2024 10:42 AM", "%B %d, %Y %I:%M %p", chrono_tz::America::New_York).unwrap();
/// assert_eq!(dt.to_rfc3339(), "2024-03-05T15:42:00+00:00");
/// ```
pub fn parse_local(text: &str, format: &str, zone: Tz) -> Result<DateTime<Utc>, DateError> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), format).map_err(|_| DateError::Format {
        text: text.to_string(),
        format: format.to_string(),
    })?;
    localize(naive, zone)
}

/// Parse a date-only `text` with `format`; the time is midnight in `zone`.
pub fn parse_local_date(text: &str, format: &str, zone: Tz) -> Result<DateTime<Utc>, DateError> {
    let date = NaiveDate::parse_from_str(text.trim(), format).map_err(|_| DateError::Format {
        text: text.to_string(),
        format: format.to_string(),
    })?;
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DateError::Format {
            text: text.to_string(),
            format: format.to_string(),
        })?;
    localize(naive, zone)
}

/// Machine-readable timestamps (`datetime=""`, `article:published_time`):
/// RFC 3339 first, then bare `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD` as UTC.
pub fn parse_machine(text: &str) -> Result<DateTime<Utc>, DateError> {
    let s = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    parse_local_date(s, "%Y-%m-%d", Tz::UTC)
}

fn localize(naive: NaiveDateTime, zone: Tz) -> Result<DateTime<Utc>, DateError> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(DateError::NonexistentLocal(naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America::New_York, Europe::London};

    #[test]
    fn strips_labels_and_zones() {
        assert_eq!(
            strip_decorations("Updated  10:42 AM EDT, Tue March 5, 2024"),
            "10:42 AM, Tue March 5, 2024"
        );
        assert_eq!(strip_decorations("Published 6:00 AM EST, Sat"), "6:00 AM, Sat");
        assert_eq!(strip_decorations("Tue 5 Mar 2024 10.42 GMT"), "Tue 5 Mar 2024 10.42");
    }

    #[test]
    fn new_york_handles_daylight_saving() {
        let winter = parse_local("January 5, 2024 09:00 AM", "%B %d, %Y %I:%M %p", New_York).unwrap();
        assert_eq!(winter.to_rfc3339(), "2024-01-05T14:00:00+00:00");
        let summer = parse_local("July 5, 2024 09:00 AM", "%B %d, %Y %I:%M %p", New_York).unwrap();
        assert_eq!(summer.to_rfc3339(), "2024-07-05T13:00:00+00:00");
    }

    #[test]
    fn london_reference_zone() {
        let dt = parse_local("Fri 5 Jul 2024 10.42", "%a %d %b %Y %H.%M", London).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-07-05T09:42:00+00:00");
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        assert!(parse_local("yesterday-ish", "%B %d, %Y", New_York).is_err());
        assert!(parse_machine("").is_err());
    }

    #[test]
    fn machine_formats() {
        assert_eq!(
            parse_machine("2024-03-05T10:42:00-05:00").unwrap().to_rfc3339(),
            "2024-03-05T15:42:00+00:00"
        );
        assert_eq!(
            parse_machine("2024-03-05").unwrap().to_rfc3339(),
            "2024-03-05T00:00:00+00:00"
        );
    }
}
