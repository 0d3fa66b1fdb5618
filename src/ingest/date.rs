use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

/// One entry in the layout table. Offset-bearing layouts produce a fixed
/// offset that gets converted to UTC; offset-less layouts are read as UTC.
#[derive(Debug, Clone, Copy)]
enum Layout {
    /// strptime format with a numeric offset (%z accepts "+0930" and "+09:30")
    Offset(&'static str),
    /// RFC 2822, covers zone names like "GMT"/"EST"
    Rfc2822,
    /// strptime format without any offset, interpreted as UTC
    Naive(&'static str),
    /// bare date, midnight UTC
    DateOnly(&'static str),
}

/// Tried in order; the first layout that parses wins, so earlier entries
/// take precedence when a string is compatible with more than one.
const LAYOUTS: &[Layout] = &[
    Layout::Offset("%a, %d %b %Y %H:%M:%S %z"),
    Layout::Rfc2822,
    Layout::Offset("%Y-%m-%dT%H:%M:%S%z"),
    Layout::Naive("%Y-%m-%dT%H:%M:%SZ"),
    Layout::Naive("%Y-%m-%dT%H:%M:%S%.fZ"),
    Layout::Naive("%Y-%m-%d %H:%M:%S"),
    Layout::Offset("%Y-%m-%d %H:%M:%S%z"),
    Layout::DateOnly("%Y-%m-%d"),
];

impl Layout {
    fn try_parse(&self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            Layout::Offset(fmt) => DateTime::parse_from_str(s, fmt)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Layout::Rfc2822 => DateTime::parse_from_rfc2822(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Layout::Naive(fmt) => NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)),
            Layout::DateOnly(fmt) => NaiveDate::parse_from_str(s, fmt)
                .ok()
                .and_then(|nd| nd.and_hms_opt(0, 0, 0))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)),
        }
    }
}

/// Parse a feed timestamp in any of the known layouts into a UTC instant.
/// Each layout is attempted on the raw string first, then on a trimmed
/// variant. Returns None (with a diagnostic) when nothing matches; the
/// caller keeps the record with an unknown publish time.
pub fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    for layout in LAYOUTS {
        for candidate in [raw, raw.trim()] {
            if let Some(dt) = layout.try_parse(candidate) {
                return Some(dt);
            }
        }
    }
    warn!(raw, "could not parse publish date");
    None
}
