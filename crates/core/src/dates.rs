//! Date parsing and the RFC-3339 sentinel. Feed dates are never trusted and
//! never compared as time values downstream — only the RFC-3339 string's
//! lexicographic order is used for sorting.

use chrono::{DateTime, SecondsFormat, Utc};

pub const SENTINEL: &str = "1970-01-01T00:00:00Z";

pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a feed-supplied date string (RFC-3339, RFC-2822, or a handful of
/// other formats real feeds emit) and reformat it as RFC-3339 UTC. Falls
/// back to the sentinel on any parse failure.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return SENTINEL.to_string();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return format_utc(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return format_utc(dt.with_timezone(&Utc));
    }
    // Common feed variants: "2024-01-02 15:04:05" and "2024-01-02".
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, fmt) {
            return format_utc(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return format_utc(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    SENTINEL.to_string()
}

/// Number of whole days between two RFC-3339 timestamps (newest - oldest).
/// Returns 0 if either fails to parse or the duration is non-positive.
pub fn days_between(newest: &str, oldest: &str) -> f64 {
    let (Ok(a), Ok(b)) = (
        DateTime::parse_from_rfc3339(newest),
        DateTime::parse_from_rfc3339(oldest),
    ) else {
        return 0.0;
    };
    let seconds = (a - b).num_seconds();
    if seconds <= 0 {
        0.0
    } else {
        seconds as f64 / 86_400.0
    }
}

/// True if `date` (already-normalized RFC-3339, possibly the sentinel) is
/// no older than `limit_days` before now.
pub fn is_within_age_limit(date: &str, limit_days: i64) -> bool {
    let Ok(parsed) = DateTime::parse_from_rfc3339(date) else {
        return false;
    };
    let cutoff = Utc::now() - chrono::Duration::days(limit_days);
    parsed.with_timezone(&Utc) >= cutoff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_round_trips() {
        let d = normalize_date("2024-03-05T10:00:00Z");
        assert_eq!(d, "2024-03-05T10:00:00Z");
    }

    #[test]
    fn rfc2822_pubdate_parses() {
        let d = normalize_date("Tue, 05 Mar 2024 10:00:00 GMT");
        assert!(d.starts_with("2024-03-05T10:00:00"));
    }

    #[test]
    fn unparseable_date_falls_back_to_sentinel() {
        assert_eq!(normalize_date("not a date"), SENTINEL);
        assert_eq!(normalize_date(""), SENTINEL);
    }

    #[test]
    fn days_between_is_zero_for_non_positive_duration() {
        assert_eq!(days_between(SENTINEL, SENTINEL), 0.0);
        assert_eq!(days_between("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"), 0.0);
    }

    #[test]
    fn sentinel_date_is_outside_any_reasonable_age_limit() {
        assert!(!is_within_age_limit(SENTINEL, 365));
    }

    #[test]
    fn recent_date_is_within_a_generous_age_limit() {
        let recent = format_utc(Utc::now() - chrono::Duration::days(1));
        assert!(is_within_age_limit(&recent, 36_500));
    }

    #[test]
    fn old_date_is_rejected_by_a_tight_age_limit() {
        let old = format_utc(Utc::now() - chrono::Duration::days(400));
        assert!(!is_within_age_limit(&old, 30));
    }
}
