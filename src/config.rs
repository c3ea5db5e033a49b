use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub export: ExportConfig,
    #[serde(default)]
    pub session: Option<SessionConfig>,
    #[serde(default)]
    pub narrative: NarrativeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Flat directory holding downloaded exports and generated reports.
    pub output_dir: PathBuf,
}

/// External command that performs one export against the web
/// application. Invoked as:
/// `<command> <args...> <start YYYY-MM-DD> <end YYYY-MM-DD> <output_dir>`.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_session_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_session_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct NarrativeConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional prompt template file; a built-in template is used when
    /// unset or unreadable.
    #[serde(default)]
    pub prompt_template: Option<PathBuf>,
    /// Optional TOML file describing what each project means, injected
    /// into the prompt.
    #[serde(default)]
    pub project_definitions: Option<PathBuf>,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            max_tokens: 4000,
            temperature: 0.7,
            max_retries: 5,
            timeout_secs: 180,
            prompt_template: None,
            project_definitions: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    180
}

impl NarrativeConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate session
    if let Some(session) = &config.session {
        if session.command.trim().is_empty() {
            anyhow::bail!("session.command must not be empty");
        }
        if session.timeout_secs == 0 {
            anyhow::bail!("session.timeout_secs must be > 0");
        }
    }

    // Validate narrative
    if config.narrative.is_enabled() {
        if config.narrative.model.is_none() {
            anyhow::bail!(
                "narrative.model must be specified when provider is '{}'",
                config.narrative.provider
            );
        }
        if config.narrative.max_tokens == 0 {
            anyhow::bail!("narrative.max_tokens must be > 0");
        }
    }

    if !(0.0..=1.0).contains(&config.narrative.temperature) {
        anyhow::bail!("narrative.temperature must be in [0.0, 1.0]");
    }

    match config.narrative.provider.as_str() {
        "disabled" | "anthropic" => {}
        other => anyhow::bail!(
            "Unknown narrative provider: '{}'. Must be disabled or anthropic.",
            other
        ),
    }

    Ok(config)
}
