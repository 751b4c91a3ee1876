use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Hint, Result};
use crate::paths::Layout;
use crate::shell;
use crate::template;

/// Declarative step as written in buildseq.json.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default)]
    pub fatal: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when_exists: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Command {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },
    NormalizePaths,
    CopyClientOutput,
    ApiEntrypoint,
    PackageReference,
}

/// In-process step body. Returns an optional message for the step report.
pub type StepFn = Arc<dyn Fn(&Layout) -> Result<Option<String>> + Send + Sync>;

/// What a step does when it runs.
#[derive(Clone)]
pub enum StepAction {
    /// Shell command run through the configured `CommandRunner`.
    Command { command: String, cwd: PathBuf },
    NormalizePaths,
    CopyClientOutput,
    ApiEntrypoint,
    PackageReference,
    Function(StepFn),
}

impl StepAction {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepAction::Command { .. } => "command",
            StepAction::NormalizePaths => "normalize_paths",
            StepAction::CopyClientOutput => "copy_client_output",
            StepAction::ApiEntrypoint => "api_entrypoint",
            StepAction::PackageReference => "package_reference",
            StepAction::Function(_) => "function",
        }
    }
}

impl fmt::Debug for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Command { command, cwd } => f
                .debug_struct("Command")
                .field("command", command)
                .field("cwd", cwd)
                .finish(),
            StepAction::Function(_) => f.write_str("Function(..)"),
            other => f.write_str(other.type_name()),
        }
    }
}

/// A resolved, runnable step.
#[derive(Debug, Clone)]
pub struct BuildStep {
    pub name: String,
    pub action: StepAction,
    pub fatal: bool,
    pub needs: Vec<String>,
    /// Root-relative patterns; the step only runs if one matches.
    pub when_exists: Vec<String>,
}

impl BuildStep {
    pub fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
            fatal: false,
            needs: Vec::new(),
            when_exists: Vec::new(),
        }
    }

    pub fn command(name: impl Into<String>, command: impl Into<String>, cwd: PathBuf) -> Self {
        Self::new(
            name,
            StepAction::Command {
                command: command.into(),
                cwd,
            },
        )
    }

    pub fn function<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Layout) -> Result<Option<String>> + Send + Sync + 'static,
    {
        Self::new(name, StepAction::Function(Arc::new(body)))
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn needs(mut self, names: &[&str]) -> Self {
        self.needs = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn when_exists(mut self, patterns: &[&str]) -> Self {
        self.when_exists = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn describe(&self, layout: &Layout) -> PlannedStep {
        let (command, cwd) = match &self.action {
            StepAction::Command { command, cwd } => {
                (Some(command.clone()), Some(layout.display(cwd)))
            }
            _ => (None, None),
        };

        PlannedStep {
            name: self.name.clone(),
            step_type: self.action.type_name().to_string(),
            command,
            cwd,
            fatal: self.fatal,
            needs: self.needs.clone(),
            when_exists: self.when_exists.clone(),
        }
    }
}

/// Serializable view of a step for `buildseq plan`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub fatal: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when_exists: Vec<String>,
}

/// Turn configured steps into runnable ones, substituting layout placeholders.
///
/// Placeholder values are shell-quoted inside commands and inserted verbatim
/// into `cwd` and `when_exists`.
pub fn resolve_steps(configs: &[StepConfig], layout: &Layout) -> Result<Vec<BuildStep>> {
    let vars = layout.template_vars();
    let quoted: Vec<(&str, String)> = vars
        .iter()
        .map(|(key, value)| (*key, shell::quote_arg(value)))
        .collect();

    let steps: Vec<BuildStep> = configs
        .iter()
        .map(|config| {
            let action = match &config.kind {
                StepKind::Command { command, cwd } => StepAction::Command {
                    command: template::render_owned(command, &quoted),
                    cwd: match cwd {
                        Some(dir) => layout.root.join(template::render_owned(dir, &vars)),
                        None => layout.root.clone(),
                    },
                },
                StepKind::NormalizePaths => StepAction::NormalizePaths,
                StepKind::CopyClientOutput => StepAction::CopyClientOutput,
                StepKind::ApiEntrypoint => StepAction::ApiEntrypoint,
                StepKind::PackageReference => StepAction::PackageReference,
            };

            BuildStep {
                name: config.name.clone(),
                action,
                fatal: config.fatal,
                needs: config.needs.clone(),
                when_exists: config
                    .when_exists
                    .iter()
                    .map(|pattern| template::render_owned(pattern, &vars))
                    .collect(),
            }
        })
        .collect();

    validate_steps(&steps, "steps")?;
    Ok(steps)
}

/// Reject empty or duplicate names, empty commands, and `needs` that do not
/// point at an earlier step.
pub fn validate_steps(steps: &[BuildStep], field: &str) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (idx, step) in steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(Error::validation_invalid_argument(
                field,
                format!("Step #{} has an empty name", idx + 1),
                None,
                None,
            ));
        }

        if seen.contains_key(step.name.as_str()) {
            return Err(Error::validation_invalid_argument(
                field,
                format!("Duplicate step name '{}'", step.name),
                Some(step.name.clone()),
                None,
            ));
        }

        if let StepAction::Command { command, .. } = &step.action {
            if command.trim().is_empty() {
                return Err(Error::validation_invalid_argument(
                    field,
                    format!("Step '{}' has an empty command", step.name),
                    Some(step.name.clone()),
                    None,
                ));
            }
        }

        for need in &step.needs {
            if !seen.contains_key(need.as_str()) {
                let problem = if steps.iter().any(|s| &s.name == need) {
                    format!(
                        "Step '{}' needs '{}', which is declared later",
                        step.name, need
                    )
                } else {
                    format!("Step '{}' depends on unknown step '{}'", step.name, need)
                };
                return Err(Error::validation_invalid_argument(
                    field,
                    problem,
                    Some(step.name.clone()),
                    None,
                ));
            }
        }

        seen.insert(step.name.as_str(), idx);
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
    NotApplicable,
}

impl StepStatus {
    /// Whether a step with this status satisfies a `needs` reference.
    pub fn satisfies_needs(self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::NotApplicable)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    pub status: StepStatus,
    pub fatal: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StepReport {
    pub fn new(step: &BuildStep, status: StepStatus) -> Self {
        Self {
            name: step.name.clone(),
            step_type: step.action.type_name().to_string(),
            status,
            fatal: step.fatal,
            duration_ms: 0,
            exit_code: None,
            message: None,
            error: None,
            hints: Vec::new(),
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Returns the first `needs` entry that did not succeed, if any.
pub fn unmet_need<'a>(step: &'a BuildStep, reports: &[StepReport]) -> Option<&'a str> {
    step.needs.iter().map(String::as_str).find(|need| {
        !reports
            .iter()
            .any(|r| r.name == *need && r.status.satisfies_needs())
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_applicable: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

pub fn build_summary(reports: &[StepReport]) -> RunSummary {
    let count = |status: StepStatus| reports.iter().filter(|r| r.status == status).count();
    let failed = count(StepStatus::Failed);

    let next_actions = if failed > 0 {
        vec!["Fix the failing step and re-run (the sequence is idempotent)".to_string()]
    } else {
        Vec::new()
    };

    RunSummary {
        total_steps: reports.len(),
        succeeded: count(StepStatus::Success),
        failed,
        skipped: count(StepStatus::Skipped),
        not_applicable: count(StepStatus::NotApplicable),
        next_actions,
    }
}
