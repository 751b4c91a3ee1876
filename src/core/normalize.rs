//! Path separator normalization for bundled output.
//!
//! Bundling on Windows can leave backslash separators in module paths inside
//! the server bundle. Every `\\` and every lone `\` becomes `/`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::io;
use crate::log_status;
use crate::retry::{self, RetryPolicy, Sleeper};

// Escaped pair first so `\\` collapses to one `/`, not two.
static SEPARATOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\\\|\\").unwrap());

/// Replace backslash separators. Returns the new text and the replacement count.
pub fn normalize_separators(content: &str) -> (String, usize) {
    let pattern = &*SEPARATOR_PATTERN;
    let count = pattern.find_iter(content).count();
    if count == 0 {
        return (content.to_string(), 0);
    }
    (pattern.replace_all(content, "/").into_owned(), count)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NormalizeOutcome {
    /// Target found and processed; `changed` is false when it was already clean.
    Fixed { replacements: usize, changed: bool },
    /// Target never appeared within the polling window.
    Abandoned { attempts: u32 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    pub file: PathBuf,
    #[serde(flatten)]
    pub outcome: NormalizeOutcome,
}

impl NormalizeReport {
    pub fn is_abandoned(&self) -> bool {
        matches!(self.outcome, NormalizeOutcome::Abandoned { .. })
    }
}

/// Wait for `target` to exist, then normalize it in place.
///
/// A target that never appears is logged and reported as abandoned; that is
/// not an error. Read and write failures on an existing file are.
pub fn fix_file(target: &Path, policy: RetryPolicy, sleeper: &dyn Sleeper) -> Result<NormalizeReport> {
    let operation = format!("Waiting for {}", target.display());
    let waited = retry::retry(policy, sleeper, &operation, |_| {
        if target.is_file() {
            Ok(())
        } else {
            Err(Error::internal_io(
                "file not found",
                Some(format!("poll {}", target.display())),
            ))
        }
    });

    if waited.is_err() {
        log_status!(
            "paths",
            "Gave up on {} after {} attempts",
            target.display(),
            policy.attempts
        );
        return Ok(NormalizeReport {
            file: target.to_path_buf(),
            outcome: NormalizeOutcome::Abandoned {
                attempts: policy.attempts,
            },
        });
    }

    let content = io::read_file(target, &format!("read {}", target.display()))?;
    let (fixed, replacements) = normalize_separators(&content);
    let changed = fixed != content;

    if changed {
        io::write_file_atomic(target, &fixed, &format!("write {}", target.display()))?;
        log_status!(
            "paths",
            "Normalized {} separator(s) in {}",
            replacements,
            target.display()
        );
    } else {
        log_status!("paths", "No backslash separators in {}", target.display());
    }

    Ok(NormalizeReport {
        file: target.to_path_buf(),
        outcome: NormalizeOutcome::Fixed {
            replacements,
            changed,
        },
    })
}

/// Normalize each target in order. Abandoned targets do not stop the rest.
pub fn fix_files(
    targets: &[PathBuf],
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Vec<NormalizeReport>> {
    targets
        .iter()
        .map(|target| fix_file(target, policy, sleeper))
        .collect()
}
