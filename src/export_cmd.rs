//! The `export` and `coverage` commands.
//!
//! `run_export` is the top of the reconciliation flow: enumerate the
//! output directory, reconcile against the requested range, and print
//! the representative file path on stdout (progress goes to stderr).
//! `run_coverage` answers "what is already on disk" without touching
//! the session at all.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::Config;
use crate::coverage;
use crate::date::DateRange;
use crate::grouping;
use crate::progress::ProgressMode;
use crate::reconcile::{self, SessionPort};
use crate::report;
use crate::session::CommandSession;

/// Placeholder session for runs where every day is already covered and
/// no `[session]` table is configured. Never invoked: the reconciler
/// early-returns before the first request, and `run_export` refuses to
/// start when days are missing and no session exists.
struct UnconfiguredSession;

#[async_trait]
impl SessionPort for UnconfiguredSession {
    async fn request_export(&self, _range: DateRange) -> Option<PathBuf> {
        None
    }
}

pub async fn run_export(
    config: &Config,
    range: DateRange,
    dry_run: bool,
    analyze: bool,
    progress: ProgressMode,
) -> Result<()> {
    let output_dir = &config.export.output_dir;
    let existing = coverage::scan_export_dir(output_dir)?;

    if dry_run {
        let cov = coverage::compute_coverage(&range, &existing);
        println!("requested: {}", range);
        println!("covered days: {}", cov.covered.len());
        println!("missing days: {}", cov.missing.len());
        for sub in grouping::group_consecutive(&cov.missing) {
            println!("would fetch: {}", sub);
        }
        return Ok(());
    }

    let cov = coverage::compute_coverage(&range, &existing);
    if !cov.missing.is_empty() && config.session.is_none() {
        bail!(
            "{} day(s) of {} are missing but [session] is not configured",
            cov.missing.len(),
            range
        );
    }

    let reporter = progress.reporter();
    let outcome = match &config.session {
        Some(session_config) => {
            let session = CommandSession::new(session_config, output_dir);
            reconcile::reconcile(range, &existing, &session, reporter.as_ref()).await
        }
        None => {
            reconcile::reconcile(range, &existing, &UnconfiguredSession, reporter.as_ref()).await
        }
    };

    let Some(representative) = outcome.representative() else {
        bail!("Export failed: no sub-range of {} could be fetched", range);
    };
    println!("{}", representative.display());

    if analyze {
        let report_path = report::generate_report(representative, output_dir, config).await?;
        println!("{}", report_path.display());
    }
    Ok(())
}

pub fn run_coverage(config: &Config, range: DateRange) -> Result<()> {
    let existing = coverage::scan_export_dir(&config.export.output_dir)?;
    let cov = coverage::compute_coverage(&range, &existing);

    println!("requested: {}", range);
    println!("covered ({}):", cov.covered.len());
    for day in &cov.covered {
        println!("  {}", day);
    }
    println!("missing ({}):", cov.missing.len());
    for day in &cov.missing {
        println!("  {}", day);
    }

    let subs = grouping::group_consecutive(&cov.missing);
    if !subs.is_empty() {
        println!("planned requests:");
        for sub in subs {
            println!("  {}", sub);
        }
    }
    Ok(())
}
