//! # ttx CLI
//!
//! The `ttx` binary automates exports from a time-tracking web
//! application and keeps them incremental: days that already exist in
//! the output directory are never downloaded again.
//!
//! ## Usage
//!
//! ```bash
//! ttx --config ./config/ttx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ttx export` | Fetch the missing sub-ranges of a date range (default: yesterday) |
//! | `ttx coverage` | Show which requested days are already on disk |
//! | `ttx report --csv <file>` | Generate an analysis report for an export |
//!
//! ## Examples
//!
//! ```bash
//! # Export yesterday (skipped entirely when already on disk)
//! ttx export
//!
//! # Export a range, then analyze the representative file
//! ttx export --start 2025-11-10 --end 2025-11-16 --analyze
//!
//! # See what a range export would fetch, without a session
//! ttx export --start 2025-11-01 --end 2025-11-30 --dry-run
//!
//! # Re-run the analysis on an existing export
//! ttx report --csv ./downloads/tasks_20251110-20251116.csv
//! ```

mod analyze;
mod config;
mod coverage;
mod date;
mod export_cmd;
mod filename;
mod grouping;
mod narrative;
mod progress;
mod reconcile;
mod report;
mod session;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::date::DateRange;
use crate::progress::ProgressMode;

/// ttx: incremental export harness for time-tracking data.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/ttx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ttx",
    about = "Incremental export harness for time-tracking data",
    version,
    long_about = "ttx reconciles a requested date range against CSV exports already on disk, \
    fetches only the missing sub-ranges through a configured export session, and can generate \
    an analysis report (with an LLM-written narrative) from the result."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ttx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Export the missing days of a date range.
    ///
    /// Reconciles the requested range against files already in the
    /// output directory and fetches only the missing sub-ranges through
    /// the configured session command. With no date flags, exports
    /// yesterday.
    Export {
        /// Single export date (YYYY-MM-DD).
        #[arg(long, conflicts_with_all = ["start", "end"])]
        date: Option<String>,

        /// Range start (YYYY-MM-DD). Requires --end.
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Range end (YYYY-MM-DD). Requires --start.
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Print the fetch plan without invoking the session.
        #[arg(long)]
        dry_run: bool,

        /// Generate an analysis report from the representative file afterwards.
        #[arg(long)]
        analyze: bool,

        /// Progress output: `human`, `json`, or `off`.
        /// Default: human when stderr is a TTY, otherwise off.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Show which requested days are already on disk.
    ///
    /// Lists covered and missing days for the range plus the session
    /// requests an export would issue. Never invokes the session.
    Coverage {
        /// Single date (YYYY-MM-DD).
        #[arg(long, conflicts_with_all = ["start", "end"])]
        date: Option<String>,

        /// Range start (YYYY-MM-DD). Requires --end.
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Range end (YYYY-MM-DD). Requires --start.
        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// Generate an analysis report for an existing export file.
    ///
    /// Computes project/mode/routine summaries and a narrative, and
    /// writes a Markdown report into the output directory.
    Report {
        /// Path to the exported CSV.
        #[arg(long)]
        csv: PathBuf,
    },
}

/// Resolve the requested range from the CLI date flags.
///
/// No flags means yesterday, computed here so the core never depends on
/// ambient "today" state.
fn resolve_range(
    date: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<DateRange> {
    match (date, start, end) {
        (Some(d), _, _) => Ok(DateRange::single(parse_date(&d)?)),
        (None, Some(s), Some(e)) => DateRange::new(parse_date(&s)?, parse_date(&e)?),
        (None, None, None) => {
            let yesterday = Local::now()
                .date_naive()
                .pred_opt()
                .context("Cannot compute yesterday")?;
            Ok(DateRange::single(yesterday))
        }
        // clap's `requires` rules make a lone --start/--end unrepresentable.
        _ => bail!("--start and --end must be given together"),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

fn parse_progress(mode: Option<&str>) -> Result<ProgressMode> {
    match mode {
        None => Ok(ProgressMode::default_for_tty()),
        Some("human") => Ok(ProgressMode::Human),
        Some("json") => Ok(ProgressMode::Json),
        Some("off") => Ok(ProgressMode::Off),
        Some(other) => bail!(
            "Unknown progress mode: '{}'. Must be human, json, or off.",
            other
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Export {
            date,
            start,
            end,
            dry_run,
            analyze,
            progress,
        } => {
            let range = resolve_range(date, start, end)?;
            let progress = parse_progress(progress.as_deref())?;
            export_cmd::run_export(&cfg, range, dry_run, analyze, progress).await?;
        }
        Commands::Coverage { date, start, end } => {
            let range = resolve_range(date, start, end)?;
            export_cmd::run_coverage(&cfg, range)?;
        }
        Commands::Report { csv } => {
            report::run_report(&cfg, &csv).await?;
        }
    }

    Ok(())
}
