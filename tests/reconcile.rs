//! Reconciliation properties over a real export directory.
//!
//! These tests exercise the full skip-or-fetch decision chain
//! (directory scan, coverage, grouping, session loop) with a scripted
//! session that records every request it receives.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use ttx::coverage::{scan_export_dir, ExportFile};
use ttx::date::DateRange;
use ttx::progress::NoReporter;
use ttx::reconcile::{reconcile, SessionPort};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end).unwrap()
}

/// Writes `tasks_...csv` fixture files and scans them back.
fn dir_with_files(names: &[&str]) -> (TempDir, Vec<ExportFile>) {
    let tmp = TempDir::new().unwrap();
    for name in names {
        std::fs::write(tmp.path().join(name), "csv").unwrap();
    }
    let files = scan_export_dir(tmp.path()).unwrap();
    (tmp, files)
}

/// A session that records every requested range and answers from a
/// scripted queue. An exhausted queue answers with a synthetic success.
struct ScriptedSession {
    calls: Mutex<Vec<DateRange>>,
    outcomes: Mutex<VecDeque<Option<PathBuf>>>,
}

impl ScriptedSession {
    fn new(outcomes: Vec<Option<PathBuf>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcomes: Mutex::new(outcomes.into()),
        }
    }

    fn always_succeeding() -> Self {
        Self::new(Vec::new())
    }

    fn calls(&self) -> Vec<DateRange> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionPort for ScriptedSession {
    async fn request_export(&self, range: DateRange) -> Option<PathBuf> {
        self.calls.lock().unwrap().push(range);
        match self.outcomes.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Some(PathBuf::from(format!(
                "/downloads/{}",
                ttx::filename::encode(&range)
            ))),
        }
    }
}

#[tokio::test]
async fn fully_covered_range_never_invokes_session() {
    let (_tmp, files) = dir_with_files(&["tasks_20251110-20251113.csv"]);
    let session = ScriptedSession::always_succeeding();

    let outcome = reconcile(
        range(d(2025, 11, 10), d(2025, 11, 13)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    assert!(session.calls().is_empty());
    assert_eq!(outcome.covered_days, 4);
    assert_eq!(outcome.missing_days, 0);
    let representative = outcome.representative().unwrap();
    assert!(representative.ends_with("tasks_20251110-20251113.csv"));
}

#[tokio::test]
async fn jointly_covering_files_also_skip_the_session() {
    let (_tmp, files) = dir_with_files(&[
        "tasks_20251110-20251111.csv",
        "tasks_20251112-20251112.csv",
    ]);
    let session = ScriptedSession::always_succeeding();

    let outcome = reconcile(
        range(d(2025, 11, 10), d(2025, 11, 12)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    assert!(session.calls().is_empty());
    // The representative is the file backing the first requested day.
    assert!(outcome
        .representative()
        .unwrap()
        .ends_with("tasks_20251110-20251111.csv"));
}

#[tokio::test]
async fn empty_directory_requests_the_whole_range_once() {
    let (_tmp, files) = dir_with_files(&[]);
    let session = ScriptedSession::always_succeeding();
    let requested = range(d(2025, 11, 10), d(2025, 11, 13));

    let outcome = reconcile(requested, &files, &session, &NoReporter).await;

    assert_eq!(session.calls(), vec![requested]);
    assert!(outcome.representative().is_some());
}

#[tokio::test]
async fn single_day_request_on_empty_directory() {
    let (_tmp, files) = dir_with_files(&[]);
    let session = ScriptedSession::always_succeeding();
    let requested = DateRange::single(d(2025, 11, 10));

    reconcile(requested, &files, &session, &NoReporter).await;

    assert_eq!(session.calls(), vec![requested]);
}

#[tokio::test]
async fn single_gap_fetches_exactly_the_missing_day() {
    let (_tmp, files) = dir_with_files(&[
        "tasks_20251110-20251110.csv",
        "tasks_20251112-20251112.csv",
    ]);
    let session = ScriptedSession::always_succeeding();

    reconcile(
        range(d(2025, 11, 10), d(2025, 11, 12)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    assert_eq!(
        session.calls(),
        vec![DateRange::single(d(2025, 11, 11))]
    );
}

#[tokio::test]
async fn two_gaps_both_attempted_even_when_the_first_fails() {
    let (_tmp, files) = dir_with_files(&[
        "tasks_20251110-20251110.csv",
        "tasks_20251112-20251112.csv",
        "tasks_20251114-20251114.csv",
    ]);
    let day13 = PathBuf::from("/downloads/tasks_20251113-20251113.csv");
    let session = ScriptedSession::new(vec![None, Some(day13.clone())]);

    let outcome = reconcile(
        range(d(2025, 11, 10), d(2025, 11, 14)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    assert_eq!(
        session.calls(),
        vec![
            DateRange::single(d(2025, 11, 11)),
            DateRange::single(d(2025, 11, 13)),
        ]
    );
    assert_eq!(outcome.attempts.len(), 2);
    assert!(outcome.attempts[0].path.is_none());
    assert_eq!(outcome.representative(), Some(&day13));
    assert_eq!(outcome.successful_paths(), vec![&day13]);
}

#[tokio::test]
async fn representative_is_the_first_successful_path() {
    let (_tmp, files) = dir_with_files(&["tasks_20251112-20251112.csv"]);
    let first = PathBuf::from("/downloads/tasks_20251110-20251111.csv");
    let second = PathBuf::from("/downloads/tasks_20251113-20251114.csv");
    let session = ScriptedSession::new(vec![Some(first.clone()), Some(second.clone())]);

    let outcome = reconcile(
        range(d(2025, 11, 10), d(2025, 11, 14)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    assert_eq!(outcome.representative(), Some(&first));
    assert_eq!(outcome.successful_paths(), vec![&first, &second]);
}

#[tokio::test]
async fn total_failure_yields_no_representative() {
    let (_tmp, files) = dir_with_files(&[]);
    let session = ScriptedSession::new(vec![None]);

    let outcome = reconcile(
        range(d(2025, 11, 10), d(2025, 11, 12)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    assert_eq!(session.calls().len(), 1);
    assert!(outcome.representative().is_none());
    assert!(outcome.successful_paths().is_empty());
    assert_eq!(outcome.attempts.len(), 1);
}

#[tokio::test]
async fn range_named_file_leaves_only_the_day_before_missing() {
    // tasks_20251111-20251113.csv exists; requesting 11-10..11-13 must
    // fetch exactly 11-10.
    let (_tmp, files) = dir_with_files(&["tasks_20251111-20251113.csv"]);
    let session = ScriptedSession::always_succeeding();

    let outcome = reconcile(
        range(d(2025, 11, 10), d(2025, 11, 13)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    assert_eq!(
        session.calls(),
        vec![DateRange::single(d(2025, 11, 10))]
    );
    assert_eq!(outcome.covered_days, 3);
    assert_eq!(outcome.missing_days, 1);
}

#[tokio::test]
async fn unparseable_files_do_not_count_as_coverage() {
    let (tmp, _) = dir_with_files(&[]);
    std::fs::write(tmp.path().join("notes.txt"), "not an export").unwrap();
    std::fs::write(tmp.path().join("tasks_2025111x-20251110.csv"), "bad name").unwrap();
    let files = scan_export_dir(tmp.path()).unwrap();

    let session = ScriptedSession::always_succeeding();
    let requested = DateRange::single(d(2025, 11, 10));
    reconcile(requested, &files, &session, &NoReporter).await;

    assert_eq!(session.calls(), vec![requested]);
}

#[cfg(unix)]
#[tokio::test]
async fn end_to_end_with_command_session() {
    // Full chain against a real on-disk session helper: day 11 is the
    // only gap, the helper writes and reports the file for it.
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("tasks_20251110-20251110.csv"), "a").unwrap();
    std::fs::write(tmp.path().join("tasks_20251112-20251112.csv"), "b").unwrap();
    let files = scan_export_dir(tmp.path()).unwrap();

    let config = ttx::config::SessionConfig {
        command: "/bin/sh".to_string(),
        args: vec![
            "-c".to_string(),
            // With `sh -c`, start/end/output-dir arrive as $0/$1/$2.
            r#"f="$2/tasks_$(echo "$0" | tr -d -)-$(echo "$1" | tr -d -).csv"; echo data > "$f"; echo "$f""#
                .to_string(),
        ],
        timeout_secs: 10,
    };
    let session = ttx::session::CommandSession::new(&config, tmp.path());

    let outcome = reconcile(
        range(d(2025, 11, 10), d(2025, 11, 12)),
        &files,
        &session,
        &NoReporter,
    )
    .await;

    let representative = outcome.representative().unwrap();
    assert_eq!(
        representative,
        &tmp.path().join("tasks_20251111-20251111.csv")
    );
    assert!(representative.exists());
}

/// Property from the coverage contract: covered and missing always
/// partition the requested range, whatever the directory contains.
#[tokio::test]
async fn coverage_counts_partition_the_request() {
    let (_tmp, files) = dir_with_files(&[
        "tasks_20251109-20251110.csv",
        "tasks_20251113-20251113.csv",
        "tasks_20251120-20251125.csv",
    ]);
    let session = ScriptedSession::always_succeeding();
    let requested = range(d(2025, 11, 8), d(2025, 11, 16));

    let outcome = reconcile(requested, &files, &session, &NoReporter).await;

    assert_eq!(
        (outcome.covered_days + outcome.missing_days) as i64,
        requested.len_days()
    );

    // Every requested day is either covered or appears in exactly one
    // attempted sub-range.
    let attempted: Vec<NaiveDate> = outcome
        .attempts
        .iter()
        .flat_map(|a| a.range.days())
        .collect();
    assert_eq!(attempted.len(), outcome.missing_days);
}
