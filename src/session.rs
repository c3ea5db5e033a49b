//! External session command: the shippable [`SessionPort`].
//!
//! The browser-automation half of an export (login state, date pickers,
//! the download itself) lives in an external helper program so it can
//! be swapped without touching the reconciliation core. This module
//! invokes that helper once per missing sub-range:
//!
//! ```text
//! <command> [args...] <start YYYY-MM-DD> <end YYYY-MM-DD> <output-dir>
//! ```
//!
//! The helper prints the downloaded file path as its last non-empty
//! stdout line. Spawn errors, non-zero exits, timeouts, and a reported
//! file that does not exist all collapse to `None`: the reconciler does
//! not distinguish failure kinds, it only records them and moves on.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::config::SessionConfig;
use crate::date::DateRange;
use crate::reconcile::SessionPort;

pub struct CommandSession {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    output_dir: PathBuf,
}

impl CommandSession {
    pub fn new(config: &SessionConfig, output_dir: &Path) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            output_dir: output_dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl SessionPort for CommandSession {
    async fn request_export(&self, range: DateRange) -> Option<PathBuf> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg(range.start().format("%Y-%m-%d").to_string())
            .arg(range.end().format("%Y-%m-%d").to_string())
            .arg(&self.output_dir)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                eprintln!("session: failed to run {}: {}", self.command, e);
                return None;
            }
            Err(_) => {
                eprintln!(
                    "session: {} timed out after {}s",
                    self.command,
                    self.timeout.as_secs()
                );
                return None;
            }
        };

        if !output.status.success() {
            eprintln!("session: {} exited with {}", self.command, output.status);
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from)?;

        if !path.exists() {
            eprintln!("session: reported file does not exist: {}", path.display());
            return None;
        }
        Some(path)
    }
}
