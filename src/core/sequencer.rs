//! Sequenced build with compensating rollback.
//!
//! A run goes through seven phases:
//!
//! 1. isolate root-level bundler configs ([`BackupSet`])
//! 2. create output directories and a server entry if missing
//! 3. synthesize a placeholder client if missing
//! 4. run the steps in declaration order, aborting after a fatal failure
//! 5. write the fallback page if the client produced nothing servable
//! 6. restore every isolated config
//! 7. report
//!
//! Phases 2, 3 and 5 never abort the run; their failures become warnings.
//! Phase 6 always runs. If the process unwinds before it, the backup guards
//! restore on drop.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::backup::{BackupRecord, BackupSet};
use crate::defaults::BuildConfig;
use crate::error::{Error, Hint, Result, StepCommandFailedDetails};
use crate::executor::{CommandRunner, ShellRunner};
use crate::log_status;
use crate::normalize::{self, NormalizeOutcome};
use crate::paths::Layout;
use crate::patterns;
use crate::pipeline::{
    build_summary, unmet_need, validate_steps, BuildStep, RunSummary, StepAction, StepReport,
    StepStatus,
};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::scaffold::{self, Generated};

static SHELL_RUNNER: ShellRunner = ShellRunner;
static THREAD_SLEEPER: ThreadSleeper = ThreadSleeper;

/// Final outcome of a sequence.
#[derive(Debug, Clone)]
pub enum BuildResult {
    Success,
    Failed { step: String, error: Error },
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildResult::Success)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    Failed,
}

/// Serializable form of the step error that aborted a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailure {
    pub step: String,
    pub code: String,
    pub message: String,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub run_id: String,
    pub root: PathBuf,
    pub status: BuildStatus,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
    pub steps: Vec<StepReport>,
    pub summary: RunSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backups: Vec<BackupRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated: Vec<String>,
    pub fallback_written: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<BuildFailure>,
    #[serde(skip)]
    result: BuildResult,
}

impl BuildReport {
    pub fn result(&self) -> &BuildResult {
        &self.result
    }

    pub fn into_result(self) -> BuildResult {
        self.result
    }

    /// 0 on success, 1 after a fatal step failure.
    pub fn exit_code(&self) -> i32 {
        if self.result.is_success() {
            0
        } else {
            1
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Mutable state threaded through one run.
#[derive(Default)]
struct RunState {
    created_dirs: Vec<String>,
    generated: Vec<String>,
    warnings: Vec<String>,
}

impl RunState {
    fn warn(&mut self, message: String) {
        log_status!("sequence", "Warning: {}", message);
        self.warnings.push(message);
    }

    fn record(&mut self, layout: &Layout, generated: &Generated) {
        for file in &generated.files {
            let shown = layout.display(file);
            if !self.generated.contains(&shown) {
                self.generated.push(shown);
            }
        }
    }
}

/// Result of a single step body.
#[derive(Default)]
struct StepOutcome {
    exit_code: Option<i32>,
    message: Option<String>,
    data: Option<Value>,
}

pub struct Sequencer<'a> {
    layout: Layout,
    config: BuildConfig,
    runner: &'a dyn CommandRunner,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Sequencer<'a> {
    pub fn new(root: &Path, config: BuildConfig) -> Self {
        Self {
            layout: Layout::resolve(root, &config.layout),
            config,
            runner: &SHELL_RUNNER,
            sleeper: &THREAD_SLEEPER,
        }
    }

    pub fn with_runner(mut self, runner: &'a dyn CommandRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Resolve the configured step list against this sequencer's layout.
    pub fn configured_steps(&self) -> Result<Vec<BuildStep>> {
        crate::pipeline::resolve_steps(&self.config.steps, &self.layout)
    }

    /// Run `steps` in order and return the full report.
    pub fn run(&self, steps: &[BuildStep]) -> BuildReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = now();
        let timer = Instant::now();
        let mut state = RunState::default();

        log_status!(
            "sequence",
            "Starting build {} in {}",
            run_id,
            self.layout.root.display()
        );

        if let Err(error) = validate_steps(steps, "steps") {
            return self.finish(
                run_id,
                started_at,
                timer,
                Vec::new(),
                Vec::new(),
                state,
                false,
                BuildResult::Failed {
                    step: "plan".to_string(),
                    error,
                },
            );
        }

        // Phase 1
        let mut backups = match BackupSet::isolate(
            &self.layout.root,
            &self.config.isolate_configs,
            &self.config.backup_suffix,
        ) {
            Ok(set) => set,
            Err(err) => {
                state.warn(format!("Config isolation failed: {}", err.summary()));
                BackupSet::default()
            }
        };

        // Phases 2 and 3
        self.prepare(&mut state);

        // Phase 4
        let (reports, result) = self.execute_steps(steps, &mut state);

        // Phase 5
        let fallback_written = self.ensure_fallback(&mut state);

        // Phase 6
        let records = backups.restore_all(&self.layout.root);
        state.warnings.extend(backups.warnings().iter().cloned());

        self.finish(
            run_id,
            started_at,
            timer,
            reports,
            records,
            state,
            fallback_written,
            result,
        )
    }

    /// Run the configured plan.
    pub fn run_configured(&self) -> Result<BuildReport> {
        let steps = self.configured_steps()?;
        Ok(self.run(&steps))
    }

    fn prepare(&self, state: &mut RunState) {
        let dirs = self.layout.required_dirs(&self.config.extra_dirs);
        match scaffold::ensure_dirs(&dirs) {
            Ok(created) => {
                for dir in created {
                    log_status!("scaffold", "Created {}/", self.layout.display(&dir));
                    state.created_dirs.push(self.layout.display(&dir));
                }
            }
            Err(err) => state.warn(format!("Directory setup failed: {}", err.summary())),
        }

        match scaffold::ensure_server_entry(&self.layout) {
            Ok(generated) => state.record(&self.layout, &generated),
            Err(err) => state.warn(format!("Server entry generation failed: {}", err.summary())),
        }

        match scaffold::ensure_client(&self.layout, &self.config.app_name) {
            Ok(generated) => state.record(&self.layout, &generated),
            Err(err) => state.warn(format!("Placeholder client generation failed: {}", err.summary())),
        }
    }

    fn execute_steps(
        &self,
        steps: &[BuildStep],
        state: &mut RunState,
    ) -> (Vec<StepReport>, BuildResult) {
        let mut reports: Vec<StepReport> = Vec::with_capacity(steps.len());
        let mut abort: Option<(String, Error)> = None;

        for step in steps {
            if abort.is_some() {
                reports.push(StepReport::new(step, StepStatus::Skipped).with_message("aborted"));
                continue;
            }

            if let Some(need) = unmet_need(step, &reports) {
                let message = format!("Skipped because '{}' did not succeed", need);
                log_status!("sequence", "Step '{}': {}", step.name, message);
                reports.push(StepReport::new(step, StepStatus::Skipped).with_message(message));
                continue;
            }

            if !step.when_exists.is_empty()
                && !patterns::any_exists(&self.layout.root, &step.when_exists)
            {
                reports.push(
                    StepReport::new(step, StepStatus::NotApplicable)
                        .with_message(format!("No match for {}", step.when_exists.join(", "))),
                );
                continue;
            }

            log_status!("sequence", "Running step '{}'", step.name);
            let started = Instant::now();
            let outcome = self.execute_step(step, state);
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(outcome) => {
                    let mut report = StepReport::new(step, StepStatus::Success);
                    report.duration_ms = duration_ms;
                    report.exit_code = outcome.exit_code;
                    report.message = outcome.message;
                    report.data = outcome.data;
                    reports.push(report);
                }
                Err(err) => {
                    log_status!("sequence", "Step '{}' failed: {}", step.name, err.summary());
                    let mut report = StepReport::new(step, StepStatus::Failed);
                    report.duration_ms = duration_ms;
                    report.exit_code = err
                        .details
                        .get("exitCode")
                        .and_then(Value::as_i64)
                        .map(|code| code as i32);
                    report.error = Some(err.summary());
                    report.hints = err.hints.clone();
                    reports.push(report);

                    if step.fatal {
                        log_status!("sequence", "Aborting remaining steps");
                        abort = Some((step.name.clone(), err));
                    }
                }
            }
        }

        let result = match abort {
            Some((step, error)) => BuildResult::Failed { step, error },
            None => BuildResult::Success,
        };
        (reports, result)
    }

    fn execute_step(&self, step: &BuildStep, state: &mut RunState) -> Result<StepOutcome> {
        match &step.action {
            StepAction::Command { command, cwd } => {
                let output = self.runner.run(command, cwd);
                if output.success {
                    Ok(StepOutcome {
                        exit_code: Some(output.exit_code),
                        ..StepOutcome::default()
                    })
                } else {
                    Err(Error::step_command_failed(StepCommandFailedDetails {
                        step: step.name.clone(),
                        command: command.clone(),
                        exit_code: output.exit_code,
                        working_dir: cwd.display().to_string(),
                        output_tail: output.tail_text(),
                    }))
                }
            }
            StepAction::NormalizePaths => self.normalize_paths(state),
            StepAction::CopyClientOutput => {
                let generated = scaffold::copy_client_output(&self.layout)?;
                Ok(StepOutcome {
                    message: Some(
                        generated
                            .skipped
                            .clone()
                            .unwrap_or_else(|| "copied client output".to_string()),
                    ),
                    ..StepOutcome::default()
                })
            }
            StepAction::ApiEntrypoint => {
                let generated = scaffold::write_api_entrypoint(&self.layout)?;
                state.record(&self.layout, &generated);
                Ok(StepOutcome::default())
            }
            StepAction::PackageReference => {
                let generated =
                    scaffold::write_package_reference(&self.layout, scaffold::PACKAGE_BUILD_COMMAND)?;
                state.record(&self.layout, &generated);
                Ok(StepOutcome {
                    message: generated.skipped.clone(),
                    ..StepOutcome::default()
                })
            }
            StepAction::Function(body) => Ok(StepOutcome {
                message: body(&self.layout)?,
                ..StepOutcome::default()
            }),
        }
    }

    fn normalize_paths(&self, state: &mut RunState) -> Result<StepOutcome> {
        let targets = path_fix_targets(&self.config, &self.layout);
        let policy = RetryPolicy::from_millis(self.config.path_fix.attempts, self.config.path_fix.delay_ms);
        let results = normalize::fix_files(&targets, policy, self.sleeper)?;

        let mut replacements = 0usize;
        for result in &results {
            match result.outcome {
                NormalizeOutcome::Fixed {
                    replacements: count,
                    ..
                } => replacements += count,
                NormalizeOutcome::Abandoned { attempts } => state.warn(format!(
                    "{} did not appear after {} attempts; path normalization skipped",
                    self.layout.display(&result.file),
                    attempts
                )),
            }
        }

        let data = serde_json::to_value(&results)
            .map_err(|e| Error::internal_json(e.to_string(), Some("normalize report".to_string())))?;

        Ok(StepOutcome {
            message: Some(format!("{} replacement(s)", replacements)),
            data: Some(data),
            ..StepOutcome::default()
        })
    }

    fn ensure_fallback(&self, state: &mut RunState) -> bool {
        if !scaffold::needs_fallback(&self.layout) {
            return false;
        }

        log_status!("sequence", "Client output missing, writing fallback page");
        match scaffold::write_fallback_html(&self.layout, &self.config.app_name) {
            Ok(generated) => {
                state.record(&self.layout, &generated);
                true
            }
            Err(err) => {
                state.warn(format!("Fallback page generation failed: {}", err.summary()));
                false
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        run_id: String,
        started_at: String,
        timer: Instant,
        steps: Vec<StepReport>,
        backups: Vec<BackupRecord>,
        state: RunState,
        fallback_written: bool,
        result: BuildResult,
    ) -> BuildReport {
        let summary = build_summary(&steps);
        let failure = match &result {
            BuildResult::Success => None,
            BuildResult::Failed { step, error } => Some(BuildFailure {
                step: step.clone(),
                code: error.code.as_str().to_string(),
                message: error.message.clone(),
                details: error.details.clone(),
                hints: error.hints.clone(),
            }),
        };
        let status = if result.is_success() {
            BuildStatus::Success
        } else {
            BuildStatus::Failed
        };

        match &result {
            BuildResult::Success => {
                log_status!("sequence", "Build {} completed", run_id);
            }
            BuildResult::Failed { step, .. } => {
                log_status!("sequence", "Build {} failed at step '{}'", run_id, step);
            }
        }

        BuildReport {
            run_id,
            root: self.layout.root.clone(),
            status,
            started_at,
            finished_at: now(),
            duration_ms: timer.elapsed().as_millis() as u64,
            steps,
            summary,
            backups,
            created_dirs: state.created_dirs,
            generated: state.generated,
            fallback_written,
            warnings: state.warnings,
            failure,
            result,
        }
    }
}

/// Configured path-fix targets, or the bundle output when none are set.
pub fn path_fix_targets(config: &BuildConfig, layout: &Layout) -> Vec<PathBuf> {
    if config.path_fix.targets.is_empty() {
        vec![layout.bundle_output.clone()]
    } else {
        config
            .path_fix
            .targets
            .iter()
            .map(|target| layout.root.join(target))
            .collect()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use std::cell::RefCell;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ScriptedRunner {
        fail: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &str, _cwd: &Path) -> CommandOutput {
            self.calls.borrow_mut().push(command.to_string());
            let failed = self.fail.iter().any(|f| command.contains(f));
            CommandOutput {
                success: !failed,
                exit_code: if failed { 2 } else { 0 },
                tail: Vec::new(),
            }
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    #[test]
    fn invalid_plan_fails_before_touching_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("postcss.config.js"), "").unwrap();

        let runner = ScriptedRunner {
            fail: Vec::new(),
            calls: RefCell::new(Vec::new()),
        };
        let steps = vec![BuildStep::command("a", "true", dir.path().to_path_buf()).needs(&["b"])];
        let report = Sequencer::new(dir.path(), BuildConfig::default())
            .with_runner(&runner)
            .run(&steps);

        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failure.as_ref().unwrap().step, "plan");
        assert!(runner.calls.borrow().is_empty());
        assert!(!dir.path().join("client").exists());
    }

    #[test]
    fn non_fatal_failure_keeps_going() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner {
            fail: vec!["first"],
            calls: RefCell::new(Vec::new()),
        };
        let steps = vec![
            BuildStep::command("first", "echo first", dir.path().to_path_buf()),
            BuildStep::command("second", "echo second", dir.path().to_path_buf()),
        ];

        let report = Sequencer::new(dir.path(), BuildConfig::default())
            .with_runner(&runner)
            .with_sleeper(&NoSleep)
            .run(&steps);

        assert!(report.result().is_success());
        assert_eq!(report.step("first").unwrap().status, StepStatus::Failed);
        assert_eq!(report.step("first").unwrap().exit_code, Some(2));
        assert_eq!(report.step("second").unwrap().status, StepStatus::Success);
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn report_serializes_timestamps_and_status() {
        let dir = TempDir::new().unwrap();
        let report = Sequencer::new(dir.path(), BuildConfig::default())
            .with_sleeper(&NoSleep)
            .run(&[BuildStep::function("noop", |_| Ok(Some("done".to_string())))]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["steps"][0]["message"], "done");
        assert!(json["startedAt"].as_str().unwrap().ends_with('Z'));
        assert_eq!(json["runId"].as_str().unwrap().len(), 36);
        assert_eq!(json["fallbackWritten"], true);
    }

    #[test]
    fn path_fix_targets_default_to_bundle_output() {
        let config = BuildConfig::default();
        let layout = Layout::resolve(Path::new("/app"), &config.layout);
        assert_eq!(
            path_fix_targets(&config, &layout),
            vec![PathBuf::from("/app/dist/index.js")]
        );
    }
}
