//! Summaries over an exported tasks CSV.
//!
//! The export format is a wide CSV; analysis needs only a handful of
//! columns (task, project, mode, routine, actual time, the timeline
//! date, start/end timestamps). Column headers are those of the web
//! application's CSV export and are matched verbatim. Rows with missing
//! or unparseable time values contribute zero hours rather than failing
//! the whole report.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Columns consulted by the analysis; everything else is ignored.
pub const RELEVANT_COLUMNS: [&str; 9] = [
    "タイムライン日付",
    "タスク名",
    "プロジェクト名",
    "モード名",
    "ルーチン名",
    "見積時間",
    "実績時間",
    "開始日時",
    "終了日時",
];

/// Label used when a row has no project or mode assigned.
const UNASSIGNED: &str = "(none)";

/// One task row, reduced to the columns analysis cares about.
#[derive(Clone, Debug, Default)]
pub struct TaskRow {
    pub date: String,
    pub task: String,
    pub project: String,
    pub mode: String,
    pub routine: String,
    pub actual_hours: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ProjectSummary {
    pub total_projects: usize,
    pub total_hours: f64,
    pub top_project: Option<String>,
    pub top_project_hours: f64,
    pub hours_by_project: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ModeSummary {
    pub total_modes: usize,
    pub total_hours: f64,
    pub top_mode: Option<String>,
    pub top_mode_hours: f64,
    pub hours_by_mode: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RoutineSummary {
    pub total_hours: f64,
    pub routine_hours: f64,
    pub non_routine_hours: f64,
    pub routine_percentage: f64,
    pub non_routine_percentage: f64,
}

/// Read the export and reduce each record to a [`TaskRow`].
///
/// Headers are located by name, so column order in the export does not
/// matter; a column that is absent entirely reads as empty.
pub fn read_rows(csv_path: &Path) -> Result<Vec<TaskRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open export file: {}", csv_path.display()))?;

    let headers = reader.headers()?.clone();
    let idx = |name: &str| headers.iter().position(|h| h == name);
    let date_col = idx("タイムライン日付");
    let task_col = idx("タスク名");
    let project_col = idx("プロジェクト名");
    let mode_col = idx("モード名");
    let routine_col = idx("ルーチン名");
    let actual_col = idx("実績時間");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let get = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        rows.push(TaskRow {
            date: get(date_col),
            task: get(task_col),
            project: get(project_col),
            mode: get(mode_col),
            routine: get(routine_col),
            actual_hours: parse_hours(&get(actual_col)),
        });
    }
    Ok(rows)
}

/// Total and per-project hours, plus the single largest project.
pub fn project_summary(rows: &[TaskRow]) -> ProjectSummary {
    let hours_by_project = hours_by(rows, |r| &r.project);
    let total_hours = hours_by_project.values().sum();
    let (top_project, top_project_hours) = top_entry(&hours_by_project);
    ProjectSummary {
        total_projects: hours_by_project.len(),
        total_hours,
        top_project,
        top_project_hours,
        hours_by_project,
    }
}

/// Total and per-mode hours, plus the single largest mode.
pub fn mode_summary(rows: &[TaskRow]) -> ModeSummary {
    let hours_by_mode = hours_by(rows, |r| &r.mode);
    let total_hours = hours_by_mode.values().sum();
    let (top_mode, top_mode_hours) = top_entry(&hours_by_mode);
    ModeSummary {
        total_modes: hours_by_mode.len(),
        total_hours,
        top_mode,
        top_mode_hours,
        hours_by_mode,
    }
}

/// Split hours into routine vs non-routine. A row is routine when its
/// routine column is non-empty.
pub fn routine_summary(rows: &[TaskRow]) -> RoutineSummary {
    let mut routine_hours = 0.0;
    let mut non_routine_hours = 0.0;
    for row in rows {
        if row.routine.trim().is_empty() {
            non_routine_hours += row.actual_hours;
        } else {
            routine_hours += row.actual_hours;
        }
    }
    let total_hours = routine_hours + non_routine_hours;
    let pct = |part: f64| {
        if total_hours > 0.0 {
            part / total_hours * 100.0
        } else {
            0.0
        }
    };
    RoutineSummary {
        total_hours,
        routine_hours,
        non_routine_hours,
        routine_percentage: pct(routine_hours),
        non_routine_percentage: pct(non_routine_hours),
    }
}

/// Re-read the export keeping only the relevant columns, capped at
/// `max_rows` records, as CSV text for prompt inclusion. Returns an
/// empty string when none of the relevant columns are present.
pub fn csv_sample(csv_path: &Path, max_rows: usize) -> Result<String> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open export file: {}", csv_path.display()))?;

    let headers = reader.headers()?.clone();
    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| RELEVANT_COLUMNS.contains(h))
        .map(|(i, _)| i)
        .collect();
    if keep.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(keep.iter().map(|&i| &headers[i]))?;
    for (n, record) in reader.records().enumerate() {
        if n >= max_rows {
            break;
        }
        let record = record?;
        writer.write_record(keep.iter().map(|&i| record.get(i).unwrap_or_default()))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn hours_by<'a>(rows: &'a [TaskRow], key: impl Fn(&'a TaskRow) -> &'a str) -> BTreeMap<String, f64> {
    let mut hours: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        let name = key(row).trim();
        let name = if name.is_empty() { UNASSIGNED } else { name };
        *hours.entry(name.to_string()).or_insert(0.0) += row.actual_hours;
    }
    hours
}

fn top_entry(hours: &BTreeMap<String, f64>) -> (Option<String>, f64) {
    match hours.iter().max_by(|a, b| a.1.total_cmp(b.1)) {
        Some((name, h)) => (Some(name.clone()), *h),
        None => (None, 0.0),
    }
}

/// Parse an actual-time cell into hours.
///
/// Accepts `H:MM`, `H:MM:SS`, or a plain decimal hour count; anything
/// else is zero.
fn parse_hours(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if s.contains(':') {
        let parts: Option<Vec<f64>> = s.split(':').map(|p| p.parse::<f64>().ok()).collect();
        match parts.as_deref() {
            Some([h, m]) => h + m / 60.0,
            Some([h, m, sec]) => h + m / 60.0 + sec / 3600.0,
            _ => 0.0,
        }
    } else {
        s.parse::<f64>().unwrap_or(0.0)
    }
}
