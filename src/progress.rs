//! Export progress and outcome reporting.
//!
//! Surfaces the skip/fetch/failure transitions of a reconciliation run
//! so users can see what was reused from disk and what was actually
//! fetched. Events are emitted on **stderr** so stdout stays parseable
//! for scripts.

use std::io::Write;
use std::path::PathBuf;

use crate::date::DateRange;

/// A single observable event during reconciliation.
#[derive(Clone, Debug)]
pub enum ExportEvent {
    /// Every requested day already exists on disk; nothing will be fetched.
    FullyCovered { range: DateRange, path: PathBuf },
    /// Some requested days exist on disk and will be skipped.
    PartiallyCovered { covered: usize, missing: usize },
    /// A missing sub-range is about to be requested from the session.
    Fetching { range: DateRange },
    /// A sub-range export succeeded.
    Fetched { range: DateRange, path: PathBuf },
    /// A sub-range export failed; later sub-ranges are still attempted.
    FetchFailed { range: DateRange },
    /// All sub-ranges have been attempted.
    Summary { fetched: usize, failed: usize },
}

/// Reports reconciliation progress. Implementations write to stderr
/// (human or JSON).
pub trait ExportReporter: Send + Sync {
    /// Emit a progress event. Called from the reconciler.
    fn report(&self, event: ExportEvent);
}

/// Render an event as its human-readable stderr line.
///
/// Kept as a pure function so message content can be asserted on in
/// tests without capturing stderr.
pub fn render_event(event: &ExportEvent) -> String {
    match event {
        ExportEvent::FullyCovered { range, path } => format!(
            "export {}  all days already on disk, skipping: {}",
            range,
            path.display()
        ),
        ExportEvent::PartiallyCovered { covered, missing } => format!(
            "export  reusing {} day(s) from disk, fetching {} day(s)",
            covered, missing
        ),
        ExportEvent::Fetching { range } => format!("export {}  fetching...", range),
        ExportEvent::Fetched { range, path } => {
            format!("export {}  saved {}", range, path.display())
        }
        ExportEvent::FetchFailed { range } => format!("export {}  failed", range),
        ExportEvent::Summary { fetched, failed } => {
            format!("export  done: {} fetched, {} failed", fetched, failed)
        }
    }
}

/// Human-friendly progress on stderr.
pub struct StderrReporter;

impl ExportReporter for StderrReporter {
    fn report(&self, event: ExportEvent) {
        let line = render_event(&event);
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonReporter;

impl ExportReporter for JsonReporter {
    fn report(&self, event: ExportEvent) {
        let obj = match &event {
            ExportEvent::FullyCovered { range, path } => serde_json::json!({
                "event": "fully_covered",
                "range": range.to_string(),
                "path": path.display().to_string(),
            }),
            ExportEvent::PartiallyCovered { covered, missing } => serde_json::json!({
                "event": "partially_covered",
                "covered": covered,
                "missing": missing,
            }),
            ExportEvent::Fetching { range } => serde_json::json!({
                "event": "fetching",
                "range": range.to_string(),
            }),
            ExportEvent::Fetched { range, path } => serde_json::json!({
                "event": "fetched",
                "range": range.to_string(),
                "path": path.display().to_string(),
            }),
            ExportEvent::FetchFailed { range } => serde_json::json!({
                "event": "fetch_failed",
                "range": range.to_string(),
            }),
            ExportEvent::Summary { fetched, failed } => serde_json::json!({
                "event": "summary",
                "fetched": fetched,
                "failed": failed,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoReporter;

impl ExportReporter for NoReporter {
    fn report(&self, _event: ExportEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ExportReporter> {
        match self {
            ProgressMode::Off => Box::new(NoReporter),
            ProgressMode::Human => Box::new(StderrReporter),
            ProgressMode::Json => Box::new(JsonReporter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 13).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_fully_covered_message_names_the_file() {
        let line = render_event(&ExportEvent::FullyCovered {
            range: range(),
            path: PathBuf::from("/downloads/tasks_20251110-20251113.csv"),
        });
        assert!(line.contains("already on disk"));
        assert!(line.contains("tasks_20251110-20251113.csv"));
        assert!(line.contains("2025-11-10 .. 2025-11-13"));
    }

    #[test]
    fn test_partially_covered_message_counts_days() {
        let line = render_event(&ExportEvent::PartiallyCovered {
            covered: 3,
            missing: 1,
        });
        assert!(line.contains("reusing 3 day(s)"));
        assert!(line.contains("fetching 1 day(s)"));
    }

    #[test]
    fn test_fetch_lifecycle_messages() {
        let fetching = render_event(&ExportEvent::Fetching { range: range() });
        assert!(fetching.contains("fetching"));

        let fetched = render_event(&ExportEvent::Fetched {
            range: range(),
            path: PathBuf::from("/downloads/tasks_20251110-20251113.csv"),
        });
        assert!(fetched.contains("saved"));

        let failed = render_event(&ExportEvent::FetchFailed { range: range() });
        assert!(failed.contains("failed"));
    }

    #[test]
    fn test_summary_message() {
        let line = render_event(&ExportEvent::Summary {
            fetched: 2,
            failed: 1,
        });
        assert!(line.contains("2 fetched"));
        assert!(line.contains("1 failed"));
    }
}
