use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use dtparse::Parser;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

/// Parse a free-form date string from a tag into a UTC instant.
///
/// Any timezone annotation in the text is ignored and UTC is attached to the
/// wall-clock value as written. Components missing from the text default to
/// 0001-01-01T00:00:00, so `"2022"` becomes midnight on 1 January 2022.
pub fn parse_tag_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let default = NaiveDate::from_ymd_opt(1, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let naive = panic::catch_unwind(AssertUnwindSafe(|| lenient_parse(text, &default)))
        .ok()
        .flatten()?;

    // chrono accepts year 0; a calendar date starts at year 1.
    if naive.year() < 1 {
        return None;
    }
    Some(Utc.from_utc_datetime(&naive))
}

fn lenient_parse(text: &str, default: &NaiveDateTime) -> Option<NaiveDateTime> {
    Parser::default()
        .parse(
            text,
            None,
            None,
            false,
            false,
            Some(default),
            true,
            &HashMap::new(),
        )
        .ok()
        .map(|(naive, _offset, _skipped)| naive)
}

/// Parse and render a tag date as ISO 8601 with an explicit `+00:00` offset.
pub fn normalize_tag_date(text: &str) -> Option<String> {
    parse_tag_date(text).map(|instant| to_iso8601(&instant))
}

/// `YYYY-MM-DDTHH:MM:SS[.ffffff]+00:00`, microseconds only when non-zero.
pub fn to_iso8601(instant: &DateTime<Utc>) -> String {
    let pattern = if instant.timestamp_subsec_micros() == 0 {
        "%Y-%m-%dT%H:%M:%S+00:00"
    } else {
        "%Y-%m-%dT%H:%M:%S%.6f+00:00"
    };
    instant.format(pattern).to_string()
}
