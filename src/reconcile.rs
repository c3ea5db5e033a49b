//! Export reconciliation: decide what to skip and what to fetch.
//!
//! Given a requested range and the files already on disk, the
//! reconciler classifies days ([`crate::coverage`]), groups the missing
//! ones into minimal contiguous sub-ranges ([`crate::grouping`]), and
//! drives the session once per sub-range, strictly in ascending order.
//! The session is one shared browser resource, so requests are never
//! issued concurrently.
//!
//! Failures are values here: a sub-range that fails to export is
//! recorded in the trace and the loop moves on to the next one, so a
//! partial outage still yields maximal partial progress. The only
//! "error" state is a run that produced no representative file at all,
//! and that is an absent value, not an `Err`.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::coverage::{self, CoverageReport, ExportFile};
use crate::date::DateRange;
use crate::grouping;
use crate::progress::{ExportEvent, ExportReporter};

/// The stateful export session (in production, a driven browser).
///
/// `request_export` attempts to produce one artifact covering exactly
/// the given range and returns `None` on any failure: network, UI,
/// timeout. The reconciler does not distinguish failure kinds, so the
/// port has no error channel at all.
#[async_trait]
pub trait SessionPort: Send + Sync {
    async fn request_export(&self, range: DateRange) -> Option<PathBuf>;
}

/// One attempted sub-range fetch.
#[derive(Clone, Debug)]
pub struct RangeAttempt {
    pub range: DateRange,
    /// The downloaded file on success, `None` on failure.
    pub path: Option<PathBuf>,
}

/// The result of a reconciliation run.
///
/// Callers that only need "did it work" read [`representative`]; the
/// full trace (coverage counts and every per-sub-range attempt,
/// including all successful paths) stays available for reporting.
///
/// [`representative`]: ReconcileOutcome::representative
#[derive(Clone, Debug, Default)]
pub struct ReconcileOutcome {
    pub covered_days: usize,
    pub missing_days: usize,
    pub attempts: Vec<RangeAttempt>,
    representative: Option<PathBuf>,
}

impl ReconcileOutcome {
    /// The representative artifact: an existing file when nothing was
    /// missing, otherwise the first successfully fetched path. `None`
    /// means total failure.
    pub fn representative(&self) -> Option<&PathBuf> {
        self.representative.as_ref()
    }

    /// Every path produced by a successful sub-range fetch, in
    /// ascending sub-range order.
    pub fn successful_paths(&self) -> Vec<&PathBuf> {
        self.attempts
            .iter()
            .filter_map(|a| a.path.as_ref())
            .collect()
    }
}

/// Reconcile `requested` against the files on disk, fetching only the
/// missing sub-ranges through `session`.
///
/// When every requested day is already covered the session is never
/// invoked; that early return is what makes repeated runs cheap. All
/// missing sub-ranges are attempted even when earlier ones fail.
pub async fn reconcile(
    requested: DateRange,
    existing: &[ExportFile],
    session: &dyn SessionPort,
    reporter: &dyn ExportReporter,
) -> ReconcileOutcome {
    let report = coverage::compute_coverage(&requested, existing);
    let mut outcome = ReconcileOutcome {
        covered_days: report.covered.len(),
        missing_days: report.missing.len(),
        ..Default::default()
    };

    if report.missing.is_empty() {
        // covered can only be empty here if the requested range were
        // empty, which DateRange forbids; that falls through to None.
        if let Some(path) = representative_existing(&report, existing) {
            reporter.report(ExportEvent::FullyCovered {
                range: requested,
                path: path.clone(),
            });
            outcome.representative = Some(path);
        }
        return outcome;
    }

    if !report.covered.is_empty() {
        reporter.report(ExportEvent::PartiallyCovered {
            covered: report.covered.len(),
            missing: report.missing.len(),
        });
    }

    for sub in grouping::group_consecutive(&report.missing) {
        reporter.report(ExportEvent::Fetching { range: sub });
        match session.request_export(sub).await {
            Some(path) => {
                reporter.report(ExportEvent::Fetched {
                    range: sub,
                    path: path.clone(),
                });
                outcome.attempts.push(RangeAttempt {
                    range: sub,
                    path: Some(path),
                });
            }
            None => {
                reporter.report(ExportEvent::FetchFailed { range: sub });
                outcome.attempts.push(RangeAttempt {
                    range: sub,
                    path: None,
                });
            }
        }
    }

    let fetched = outcome.attempts.iter().filter(|a| a.path.is_some()).count();
    reporter.report(ExportEvent::Summary {
        fetched,
        failed: outcome.attempts.len() - fetched,
    });

    outcome.representative = outcome.attempts.iter().find_map(|a| a.path.clone());
    outcome
}

/// The on-disk file backing the first requested day, used as the
/// representative artifact when nothing is missing. Any file whose
/// range contains that day qualifies; the first in listing order wins.
fn representative_existing(report: &CoverageReport, existing: &[ExportFile]) -> Option<PathBuf> {
    let first = *report.covered.first()?;
    existing
        .iter()
        .find(|f| f.range.as_ref().is_some_and(|r| r.contains(first)))
        .map(|f| f.path.clone())
}
