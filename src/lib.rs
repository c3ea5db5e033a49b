//! # ttx
//!
//! An incremental export harness for personal time-tracking data.
//!
//! `ttx` keeps a flat directory of CSV exports downloaded from a
//! time-tracking web application and fills in only what is missing:
//! given a requested date range it works out, day by day, which days
//! are already covered by files on disk (single-date or range-named),
//! groups the gaps into minimal contiguous sub-ranges, and drives one
//! export session per gap. Already-downloaded data is never fetched
//! again. An optional analysis step turns an export into a Markdown
//! report with an LLM-generated narrative.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────┐   ┌─────────────┐
//! │   CLI    │──▶│         Reconciler           │──▶│ SessionPort │
//! │  (ttx)   │   │ coverage → grouping → fetch  │   │ (browser)   │
//! └──────────┘   └──────────────┬───────────────┘   └─────────────┘
//!                               ▼
//!                      ┌─────────────────┐
//!                      │  report (opt.)  │
//!                      │ analyze + LLM   │
//!                      └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`date`] | `DateRange` with the `start <= end` invariant |
//! | [`filename`] | `tasks_{YYYYMMDD}-{YYYYMMDD}.csv` codec |
//! | [`coverage`] | Which requested days already exist on disk |
//! | [`grouping`] | Merge missing days into contiguous sub-ranges |
//! | [`reconcile`] | Skip-or-fetch orchestration over a `SessionPort` |
//! | [`session`] | External-command session implementation |
//! | [`progress`] | Skip/fetch/failure reporting (human or JSON) |
//! | [`analyze`] | Project/mode/routine summaries over an export |
//! | [`narrative`] | LLM narrative with deterministic fallback |
//! | [`report`] | Markdown report generation |
//! | [`config`] | TOML configuration parsing |

pub mod analyze;
pub mod config;
pub mod coverage;
pub mod date;
pub mod export_cmd;
pub mod filename;
pub mod grouping;
pub mod narrative;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod session;
