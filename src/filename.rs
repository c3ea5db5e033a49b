//! Export filename codec.
//!
//! Downloaded exports are named `tasks_{YYYYMMDD}-{YYYYMMDD}.csv`, where
//! the two dates are equal for a single-day export. The directory
//! listing is the only persisted state, so these names *are* the index
//! format. [`decode`] is total: anything that does not match the
//! pattern yields `None`, never an error.

use chrono::NaiveDate;

use crate::date::DateRange;

const PREFIX: &str = "tasks_";
const SUFFIX: &str = ".csv";

/// Canonical filename for an export covering `range`.
pub fn encode(range: &DateRange) -> String {
    format!(
        "{}{}-{}{}",
        PREFIX,
        range.start().format("%Y%m%d"),
        range.end().format("%Y%m%d"),
        SUFFIX
    )
}

/// Parse a filename back into the range it covers.
///
/// Returns `None` for anything that is not exactly
/// `tasks_{8 digits}-{8 digits}.csv` with valid dates in ascending
/// order. Malformed names are expected (other files share the
/// directory) and are simply invisible to the coverage index.
pub fn decode(name: &str) -> Option<DateRange> {
    let body = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let (start, end) = body.split_once('-')?;
    let start = parse_compact_date(start)?;
    let end = parse_compact_date(end)?;
    DateRange::new(start, end).ok()
}

fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}
