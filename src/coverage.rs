//! Existence index: which requested days are already on disk.
//!
//! [`compute_coverage`] classifies every day of a requested range as
//! covered or missing by checking it against the ranges claimed by
//! files already in the output directory. Partial overlaps count at day
//! granularity: a file spanning days 1-3 covers day 2 even when the
//! request is only for day 2. Files whose names do not decode are
//! invisible to the index.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::date::DateRange;
use crate::filename;

/// A file in the export directory and the date range its name claims.
#[derive(Clone, Debug)]
pub struct ExportFile {
    pub path: PathBuf,
    /// `None` when the filename does not match the export pattern; such
    /// files never satisfy coverage.
    pub range: Option<DateRange>,
}

impl ExportFile {
    /// Build from a path, deriving the covered range from the file name.
    pub fn from_path(path: PathBuf) -> Self {
        let range = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(filename::decode);
        Self { path, range }
    }
}

/// Day-by-day classification of a requested range.
///
/// `covered` and `missing` are disjoint, each ascending, and together
/// reproduce exactly the days of the requested range.
#[derive(Clone, Debug, Default)]
pub struct CoverageReport {
    pub covered: Vec<NaiveDate>,
    pub missing: Vec<NaiveDate>,
}

/// Classify every day of `requested` against the existing files.
///
/// O(days x files). Files entirely outside the window simply never
/// match, so no pre-filtering step is needed.
pub fn compute_coverage(requested: &DateRange, files: &[ExportFile]) -> CoverageReport {
    let mut report = CoverageReport::default();
    for day in requested.days() {
        let covered = files
            .iter()
            .filter_map(|f| f.range.as_ref())
            .any(|r| r.contains(day));
        if covered {
            report.covered.push(day);
        } else {
            report.missing.push(day);
        }
    }
    report
}

/// Enumerate the export directory (flat, non-recursive), sorted by path
/// for deterministic ordering. A directory that does not exist yet is
/// an empty listing, not an error.
pub fn scan_export_dir(dir: &Path) -> Result<Vec<ExportFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read export directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(ExportFile::from_path(entry.path()));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
