//! Grouping missing days into contiguous export requests.
//!
//! One export request per missing day would mean one full browser
//! round-trip per day; merging consecutive days first keeps the number
//! of session calls minimal.

use chrono::NaiveDate;

use crate::date::DateRange;

/// Merge individual days into maximal contiguous ranges.
///
/// The input is sorted and de-duplicated here regardless of caller
/// ordering, so the output is always ascending, disjoint, and
/// non-adjacent: no returned range can be extended by one more day
/// without leaving the input set. Empty input produces an empty set.
pub fn group_consecutive(days: &[NaiveDate]) -> Vec<DateRange> {
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();

    let mut ranges = Vec::new();
    let mut iter = days.into_iter();
    let Some(first) = iter.next() else {
        return ranges;
    };

    let mut start = first;
    let mut end = first;
    for day in iter {
        if end.succ_opt() == Some(day) {
            end = day;
        } else {
            ranges.push(DateRange::new(start, end).expect("scan keeps start <= end"));
            start = day;
            end = day;
        }
    }
    ranges.push(DateRange::new(start, end).expect("scan keeps start <= end"));
    ranges
}
