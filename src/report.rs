//! Markdown report generation for an exported CSV.
//!
//! Reads the export, computes the project/mode/routine summaries,
//! obtains a narrative (provider-backed or fallback), and writes the
//! report next to the exports.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::analyze::{self, ModeSummary, ProjectSummary, RoutineSummary};
use crate::config::Config;
use crate::date::DateRange;
use crate::filename;
use crate::narrative::{self, NarrativeInput};

/// Rows of raw data forwarded into the prompt, at most. Larger exports
/// are truncated to keep the prompt within model limits.
const CSV_SAMPLE_MAX_ROWS: usize = 1000;

/// Generate the analysis report for one export file.
///
/// The report lands in `output_dir` as `report_{YYYYMMDD}-{YYYYMMDD}.md`
/// when the export's filename decodes to a range, `report.md` otherwise.
/// Returns the written path.
pub async fn generate_report(
    csv_path: &Path,
    output_dir: &Path,
    config: &Config,
) -> Result<PathBuf> {
    let rows = analyze::read_rows(csv_path)?;
    let project = analyze::project_summary(&rows);
    let mode = analyze::mode_summary(&rows);
    let routine = analyze::routine_summary(&rows);

    let range = csv_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(filename::decode);

    let sample = analyze::csv_sample(csv_path, CSV_SAMPLE_MAX_ROWS).unwrap_or_default();
    let input = NarrativeInput {
        range,
        project: &project,
        mode: &mode,
        routine: &routine,
        csv_sample: Some(&sample),
    };
    let narrative_text = narrative::generate_narrative(&config.narrative, &input).await;

    let report_name = match &range {
        Some(r) => format!(
            "report_{}-{}.md",
            r.start().format("%Y%m%d"),
            r.end().format("%Y%m%d")
        ),
        None => "report.md".to_string(),
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
    let report_path = output_dir.join(report_name);
    let body = render_report(range.as_ref(), &project, &mode, &routine, &narrative_text);
    std::fs::write(&report_path, body)
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;

    Ok(report_path)
}

/// CLI wrapper: generate the report and print its path on stdout.
pub async fn run_report(config: &Config, csv_path: &Path) -> Result<()> {
    let report_path = generate_report(csv_path, &config.export.output_dir, config).await?;
    println!("{}", report_path.display());
    Ok(())
}

fn render_report(
    range: Option<&DateRange>,
    project: &ProjectSummary,
    mode: &ModeSummary,
    routine: &RoutineSummary,
    narrative_text: &str,
) -> String {
    let mut out = String::new();
    out.push_str("# Time tracking report\n\n");
    if let Some(range) = range {
        out.push_str(&format!("Period: {}\n\n", range));
    }

    out.push_str("## Totals\n\n");
    out.push_str("| | |\n|---|---|\n");
    out.push_str(&format!("| Total hours | {:.2} |\n", project.total_hours));
    out.push_str(&format!("| Projects | {} |\n", project.total_projects));
    out.push_str(&format!("| Modes | {} |\n", mode.total_modes));
    out.push_str(&format!(
        "| Routine share | {:.1}% |\n",
        routine.routine_percentage
    ));
    out.push('\n');

    out.push_str("## Hours by project\n\n");
    out.push_str("| Project | Hours |\n|---|---|\n");
    let mut by_project: Vec<_> = project.hours_by_project.iter().collect();
    by_project.sort_by(|a, b| b.1.total_cmp(a.1));
    for (name, hours) in by_project {
        out.push_str(&format!("| {} | {:.2} |\n", name, hours));
    }
    out.push('\n');

    out.push_str("## Hours by mode\n\n");
    out.push_str("| Mode | Hours |\n|---|---|\n");
    let mut by_mode: Vec<_> = mode.hours_by_mode.iter().collect();
    by_mode.sort_by(|a, b| b.1.total_cmp(a.1));
    for (name, hours) in by_mode {
        out.push_str(&format!("| {} | {:.2} |\n", name, hours));
    }
    out.push('\n');

    out.push_str(narrative_text);
    if !narrative_text.ends_with('\n') {
        out.push('\n');
    }
    out
}
