//! Narrative generation over the analysis summaries.
//!
//! A config-selected provider (`"disabled"` or `"anthropic"`) turns the
//! project/mode/routine summaries into prose. Generation never fails
//! the report: any provider error degrades to a deterministic fallback
//! narrative rendered from the summaries themselves.
//!
//! # Retry Strategy
//!
//! The Anthropic provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::analyze::{ModeSummary, ProjectSummary, RoutineSummary};
use crate::config::NarrativeConfig;
use crate::date::DateRange;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Built-in prompt template, used when no template file is configured.
/// Placeholders are substituted by [`build_prompt`].
const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are an expert in time management and lifestyle improvement.
Based on the following analysis of personal time-tracking data, provide
detailed feedback on how this time could be spent better.
{date_info_section}
{project_definitions_section}

# Per-project analysis
```json
{project_data}
```

# Per-mode analysis
```json
{mode_data}
```

# Routine analysis
```json
{routine_data}
```
{csv_sample_section}
Cover these angles:

## 1. Current state
- Tendencies and notable patterns in how time is spent
- What is well balanced and what is not
- Projects or modes that deserve attention
- What the routine / non-routine split suggests

## 2. Suggestions
- Concrete proposals for a better time allocation
- Work-life balance improvements
- Prioritization advice
- Tasks worth routinizing, and routines worth revisiting

## 3. Action plan
- Concrete actions to start this week
- Short-term (one week) and mid-term (one month) goals
- Indicators to measure progress

Answer in Markdown, structured with headings. Keep the advice specific
and practical.";

/// Everything the prompt template can reference.
pub struct NarrativeInput<'a> {
    /// The period the export covers, when known from its filename.
    pub range: Option<DateRange>,
    pub project: &'a ProjectSummary,
    pub mode: &'a ModeSummary,
    pub routine: &'a RoutineSummary,
    /// Raw CSV sample (relevant columns, capped rows) for the prompt.
    pub csv_sample: Option<&'a str>,
}

/// Generate the narrative, falling back to a static summary on any
/// provider failure. With the `"disabled"` provider this is the
/// fallback directly, without touching the network.
pub async fn generate_narrative(config: &NarrativeConfig, input: &NarrativeInput<'_>) -> String {
    if !config.is_enabled() {
        return fallback_narrative(input.project, input.mode, input.routine);
    }

    let prompt = build_prompt(config, input);
    match request_anthropic(config, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("narrative: generation failed, using fallback: {}", e);
            fallback_narrative(input.project, input.mode, input.routine)
        }
    }
}

/// Assemble the prompt: load the template (configured file or built-in)
/// and substitute every placeholder section.
pub fn build_prompt(config: &NarrativeConfig, input: &NarrativeInput<'_>) -> String {
    let template = load_template(config.prompt_template.as_deref());

    let project_data = serde_json::to_string_pretty(input.project).unwrap_or_default();
    let mode_data = serde_json::to_string_pretty(input.mode).unwrap_or_default();
    let routine_data = serde_json::to_string_pretty(input.routine).unwrap_or_default();

    let csv_sample_section = match input.csv_sample {
        Some(sample) if !sample.is_empty() => format!(
            "\n# Raw data sample (for reference)\n\n```csv\n{}```\n",
            sample
        ),
        _ => String::new(),
    };

    template
        .replace("{date_info_section}", &date_info_section(input.range.as_ref()))
        .replace(
            "{project_definitions_section}",
            &project_definitions_section(config.project_definitions.as_deref()),
        )
        .replace("{project_data}", &project_data)
        .replace("{mode_data}", &mode_data)
        .replace("{routine_data}", &routine_data)
        .replace("{csv_sample_section}", &csv_sample_section)
}

fn load_template(path: Option<&Path>) -> String {
    match path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(template) => template,
            Err(e) => {
                eprintln!(
                    "narrative: cannot read prompt template {}, using built-in: {}",
                    path.display(),
                    e
                );
                DEFAULT_PROMPT_TEMPLATE.to_string()
            }
        },
        None => DEFAULT_PROMPT_TEMPLATE.to_string(),
    }
}

fn date_info_section(range: Option<&DateRange>) -> String {
    let Some(range) = range else {
        return String::new();
    };
    let mut lines = Vec::new();
    if range.start() == range.end() {
        lines.push(format!("\n# Analysis date\n{}", range.start()));
    } else {
        lines.push(format!(
            "\n# Analysis period\n{} to {}",
            range.start(),
            range.end()
        ));
    }
    for day in range.days() {
        lines.push(format!("- {} ({})", day, day.format("%A")));
    }
    lines.join("\n") + "\n"
}

#[derive(Debug, Deserialize, Default)]
struct ProjectDefinitionsFile {
    #[serde(default)]
    projects: BTreeMap<String, ProjectDefinition>,
}

#[derive(Debug, Deserialize, Default)]
struct ProjectDefinition {
    #[serde(default)]
    description: String,
}

/// Render the configured project definitions as a prompt section, or an
/// empty string when nothing usable is configured.
fn project_definitions_section(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return String::new();
    };
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!(
                "narrative: cannot read project definitions {}: {}",
                path.display(),
                e
            );
            return String::new();
        }
    };
    let definitions: ProjectDefinitionsFile = match toml::from_str(&content) {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!(
                "narrative: cannot parse project definitions {}: {}",
                path.display(),
                e
            );
            return String::new();
        }
    };

    let mut lines = vec![
        "\n# Project definitions".to_string(),
        String::new(),
        "These are the definitions of each project:".to_string(),
        String::new(),
    ];
    let mut any = false;
    for (name, definition) in &definitions.projects {
        let description = definition.description.trim();
        if description.is_empty() {
            continue;
        }
        any = true;
        lines.push(format!("## {}", name));
        lines.push(description.to_string());
        lines.push(String::new());
    }
    if !any {
        return String::new();
    }
    lines.join("\n")
}

/// Call the Anthropic Messages API with retry/backoff.
async fn request_anthropic(config: &NarrativeConfig, prompt: &str) -> Result<String> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY not set"))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("narrative.model required"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
        "messages": [{ "role": "user", "content": prompt }],
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_message_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "Anthropic API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("Anthropic API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Narrative request failed after retries")))
}

/// Extract the first text block from a Messages API response.
fn parse_message_response(json: &serde_json::Value) -> Result<String> {
    json.get("content")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|block| block.get("text"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Anthropic response: missing content text"))
}

/// Deterministic narrative rendered from the summaries alone, used when
/// the provider is disabled or unreachable.
pub fn fallback_narrative(
    project: &ProjectSummary,
    mode: &ModeSummary,
    routine: &RoutineSummary,
) -> String {
    let mut lines = vec![
        "## Analysis".to_string(),
        String::new(),
        "> **Note**: the narrative service could not be reached. Showing the basic summary instead."
            .to_string(),
        String::new(),
        "### Projects".to_string(),
        String::new(),
        format!("- Active in {} project(s)", project.total_projects),
        format!("- Total hours: {:.2}", project.total_hours),
    ];
    if let Some(top) = &project.top_project {
        lines.push(format!(
            "- Most time spent on **{}** ({:.2} h)",
            top, project.top_project_hours
        ));
    }

    lines.extend([
        String::new(),
        "### Modes".to_string(),
        String::new(),
        format!("- Active in {} mode(s)", mode.total_modes),
        format!("- Total hours: {:.2}", mode.total_hours),
    ]);
    if let Some(top) = &mode.top_mode {
        lines.push(format!(
            "- Most time spent in **{}** ({:.2} h)",
            top, mode.top_mode_hours
        ));
    }

    lines.extend([
        String::new(),
        "### Routines".to_string(),
        String::new(),
        format!("- Total hours: {:.2}", routine.total_hours),
        format!(
            "- Routine tasks: {:.2} h ({:.1}%)",
            routine.routine_hours, routine.routine_percentage
        ),
        format!(
            "- Non-routine tasks: {:.2} h ({:.1}%)",
            routine.non_routine_hours, routine.non_routine_percentage
        ),
        String::new(),
        "### Suggestions".to_string(),
        String::new(),
        "- Review your time allocation regularly".to_string(),
        "- Aim for a balanced schedule".to_string(),
        "- Focus on high-priority tasks first".to_string(),
        "- Look for tasks that could become routines".to_string(),
        String::new(),
    ]);

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summaries() -> (ProjectSummary, ModeSummary, RoutineSummary) {
        let project = ProjectSummary {
            total_projects: 2,
            total_hours: 5.0,
            top_project: Some("Alpha".to_string()),
            top_project_hours: 3.5,
            hours_by_project: [("Alpha".to_string(), 3.5), ("Beta".to_string(), 1.5)]
                .into_iter()
                .collect(),
        };
        let mode = ModeSummary {
            total_modes: 1,
            total_hours: 5.0,
            top_mode: Some("Work".to_string()),
            top_mode_hours: 5.0,
            hours_by_mode: [("Work".to_string(), 5.0)].into_iter().collect(),
        };
        let routine = RoutineSummary {
            total_hours: 5.0,
            routine_hours: 1.0,
            non_routine_hours: 4.0,
            routine_percentage: 20.0,
            non_routine_percentage: 80.0,
        };
        (project, mode, routine)
    }

    #[test]
    fn test_fallback_mentions_totals_and_tops() {
        let (project, mode, routine) = summaries();
        let text = fallback_narrative(&project, &mode, &routine);
        assert!(text.contains("could not be reached"));
        assert!(text.contains("**Alpha** (3.50 h)"));
        assert!(text.contains("**Work** (5.00 h)"));
        assert!(text.contains("Routine tasks: 1.00 h (20.0%)"));
    }

    #[test]
    fn test_build_prompt_substitutes_placeholders() {
        let (project, mode, routine) = summaries();
        let config = NarrativeConfig::default();
        let input = NarrativeInput {
            range: Some(DateRange::single(
                NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            )),
            project: &project,
            mode: &mode,
            routine: &routine,
            csv_sample: Some("タスク名\nreview\n"),
        };
        let prompt = build_prompt(&config, &input);
        assert!(!prompt.contains("{project_data}"));
        assert!(!prompt.contains("{date_info_section}"));
        assert!(prompt.contains("\"top_project\": \"Alpha\""));
        assert!(prompt.contains("# Analysis date"));
        assert!(prompt.contains("2025-11-10 (Monday)"));
        assert!(prompt.contains("# Raw data sample"));
    }

    #[test]
    fn test_build_prompt_without_optional_sections() {
        let (project, mode, routine) = summaries();
        let config = NarrativeConfig::default();
        let input = NarrativeInput {
            range: None,
            project: &project,
            mode: &mode,
            routine: &routine,
            csv_sample: None,
        };
        let prompt = build_prompt(&config, &input);
        assert!(!prompt.contains("# Analysis date"));
        assert!(!prompt.contains("# Raw data sample"));
        assert!(!prompt.contains("{csv_sample_section}"));
        assert!(!prompt.contains("{project_definitions_section}"));
    }

    #[test]
    fn test_custom_template_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let template = tmp.path().join("template.md");
        std::fs::write(&template, "hours: {routine_data}").unwrap();

        let (project, mode, routine) = summaries();
        let config = NarrativeConfig {
            prompt_template: Some(template),
            ..Default::default()
        };
        let input = NarrativeInput {
            range: None,
            project: &project,
            mode: &mode,
            routine: &routine,
            csv_sample: None,
        };
        let prompt = build_prompt(&config, &input);
        assert!(prompt.starts_with("hours: {"));
        assert!(prompt.contains("\"routine_hours\": 1.0"));
    }

    #[test]
    fn test_project_definitions_section() {
        let tmp = tempfile::TempDir::new().unwrap();
        let defs = tmp.path().join("projects.toml");
        std::fs::write(
            &defs,
            r#"[projects.Alpha]
description = "Main client project"

[projects.Empty]
description = ""
"#,
        )
        .unwrap();

        let section = project_definitions_section(Some(&defs));
        assert!(section.contains("# Project definitions"));
        assert!(section.contains("## Alpha"));
        assert!(section.contains("Main client project"));
        assert!(!section.contains("## Empty"));

        assert_eq!(project_definitions_section(None), "");
        assert_eq!(
            project_definitions_section(Some(&tmp.path().join("missing.toml"))),
            ""
        );
    }

    #[test]
    fn test_parse_message_response() {
        let json = serde_json::json!({
            "content": [{ "type": "text", "text": "## Feedback\nlooks good" }]
        });
        assert_eq!(
            parse_message_response(&json).unwrap(),
            "## Feedback\nlooks good"
        );

        let bad = serde_json::json!({ "content": [] });
        assert!(parse_message_response(&bad).is_err());
    }

    #[tokio::test]
    async fn test_disabled_provider_uses_fallback_without_network() {
        let (project, mode, routine) = summaries();
        let config = NarrativeConfig::default();
        let input = NarrativeInput {
            range: None,
            project: &project,
            mode: &mode,
            routine: &routine,
            csv_sample: None,
        };
        let text = generate_narrative(&config, &input).await;
        assert!(text.contains("basic summary"));
    }
}
