//! Timestamp column codec.
//!
//! Written as fixed-width RFC 3339 UTC text so `ORDER BY` and range filters
//! compare instants. Older rows may hold `YYYY-MM-DD HH:MM:SS` (SQLite's
//! `CURRENT_TIMESTAMP`), which is read as UTC.

use chrono::{DateTime, NaiveDateTime};

use hearth_domain::time::{Timestamp, to_sortable_string};

pub(crate) fn encode(ts: Timestamp) -> String {
    to_sortable_string(ts)
}

pub(crate) fn decode(value: &str) -> Result<Timestamp, sqlx::Error> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.to_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

pub(crate) fn decode_opt(value: Option<String>) -> Result<Option<Timestamp>, sqlx::Error> {
    value.as_deref().map(decode).transpose()
}
