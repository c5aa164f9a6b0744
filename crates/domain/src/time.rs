//! Time and timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// UTC timestamp used for creation, fire and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Fixed-width RFC 3339 rendering (`2026-01-05T08:30:00.000000Z`).
///
/// Every instant has the same length, so the text sorts the same way the
/// instants do.
#[must_use]
pub fn to_sortable_string(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_render_fixed_width_utc_string() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 8, 30, 0).unwrap();
        assert_eq!(to_sortable_string(ts), "2026-01-05T08:30:00.000000Z");
    }

    #[test]
    fn should_sort_strings_like_instants() {
        let early = Utc.with_ymd_and_hms(2026, 1, 5, 8, 30, 0).unwrap();
        let late = early + chrono::TimeDelta::milliseconds(1500);
        assert!(to_sortable_string(early) < to_sortable_string(late));
    }
}
