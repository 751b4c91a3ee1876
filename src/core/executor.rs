// Command execution seam for build steps: real shell locally, fakes in tests.

use std::path::Path;

use crate::command::{self, CommandOutput};

/// Runs a step's shell command to completion.
pub trait CommandRunner {
    fn run(&self, command: &str, cwd: &Path) -> CommandOutput;
}

/// Runs commands through the platform shell, streaming output to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> CommandOutput {
        if !cwd.is_dir() {
            return CommandOutput {
                success: false,
                exit_code: -1,
                tail: vec![format!("Working directory not found: {}", cwd.display())],
            };
        }
        command::run_streaming(command, Some(cwd), None)
    }
}
