//! Config isolation for the duration of a build.
//!
//! Root-level bundler configs (postcss, tailwind) are auto-loaded by tools
//! running in nested directories. They are renamed aside before the first
//! step and renamed back afterwards. Each rename is owned by a
//! [`ConfigBackup`] guard whose restore runs exactly once: explicitly through
//! [`ConfigBackup::restore`] or, failing that, when the guard is dropped.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::log_status;
use crate::patterns;

/// Serializable record of one isolated file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub original: PathBuf,
    pub backup: PathBuf,
    pub restored: bool,
}

/// Guard for a single renamed config file.
#[derive(Debug)]
pub struct ConfigBackup {
    original: PathBuf,
    backup: PathBuf,
    restored: bool,
}

impl ConfigBackup {
    /// Rename `original` to `<original><suffix>` and return the guard.
    pub fn isolate(original: &Path, suffix: &str) -> Result<Self> {
        let backup = backup_path(original, suffix);

        fs::rename(original, &backup).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!(
                    "back up {} -> {}",
                    original.display(),
                    backup.display()
                )),
            )
        })?;

        Ok(Self {
            original: original.to_path_buf(),
            backup,
            restored: false,
        })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Move the backup back over the original.
    ///
    /// Calling again after a successful restore is a no-op. A failed restore,
    /// including a backup that vanished, leaves the guard unresolved so the
    /// drop can try once more.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }

        let context = format!(
            "restore {} -> {}",
            self.backup.display(),
            self.original.display()
        );
        if !self.backup.exists() {
            return Err(Error::internal_io(
                "backup file is missing",
                Some(context),
            ));
        }
        fs::rename(&self.backup, &self.original)
            .map_err(|e| Error::internal_io(e.to_string(), Some(context)))?;

        self.restored = true;
        Ok(())
    }

    pub fn record(&self) -> BackupRecord {
        BackupRecord {
            original: self.original.clone(),
            backup: self.backup.clone(),
            restored: self.restored,
        }
    }
}

impl Drop for ConfigBackup {
    fn drop(&mut self) {
        if !self.restored {
            // Best effort during unwinding; nothing to report to.
            let _ = self.restore();
        }
    }
}

pub fn backup_path(original: &Path, suffix: &str) -> PathBuf {
    let mut name = original.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// All configs isolated for one run.
#[derive(Debug, Default)]
pub struct BackupSet {
    backups: Vec<ConfigBackup>,
    warnings: Vec<String>,
}

impl BackupSet {
    /// Isolate every existing file matching `patterns` under `root`.
    ///
    /// Stale backups from an interrupted run are recovered first. If an
    /// original and its backup both exist, the original is left in place and
    /// a warning is recorded. On error, files isolated so far are restored by
    /// their guards before the error is returned.
    pub fn isolate(root: &Path, patterns: &[String], suffix: &str) -> Result<Self> {
        let mut set = BackupSet::default();
        if suffix.is_empty() {
            return Err(Error::config_invalid_value(
                "backup_suffix",
                Some(String::new()),
                "Backup suffix must not be empty",
            ));
        }

        let mut blocked: HashSet<PathBuf> = HashSet::new();

        for pattern in patterns {
            for stale in patterns::expand_files(root, &format!("{}{}", pattern, suffix), "")? {
                let Some(original) = strip_suffix(&stale, suffix) else {
                    continue;
                };

                if original.exists() {
                    set.warn(format!(
                        "Both {} and {} exist; leaving the original in place",
                        display(root, &original),
                        display(root, &stale)
                    ));
                    blocked.insert(original);
                    continue;
                }

                fs::rename(&stale, &original).map_err(|e| {
                    Error::internal_io(
                        e.to_string(),
                        Some(format!("recover stale backup {}", stale.display())),
                    )
                })?;
                set.warn(format!(
                    "Recovered stale backup {} from an interrupted run",
                    display(root, &stale)
                ));
            }
        }

        for pattern in patterns {
            for original in patterns::expand_files(root, pattern, suffix)? {
                if blocked.contains(&original)
                    || set.backups.iter().any(|b| b.original == original)
                {
                    continue;
                }

                let backup = ConfigBackup::isolate(&original, suffix)?;
                log_status!(
                    "backup",
                    "Moved {} aside to {}",
                    display(root, backup.original()),
                    display(root, backup.backup())
                );
                set.backups.push(backup);
            }
        }

        Ok(set)
    }

    /// Restore every guard, in reverse isolation order.
    ///
    /// Failures are recorded as warnings; the returned records show which
    /// files were put back.
    pub fn restore_all(&mut self, root: &Path) -> Vec<BackupRecord> {
        let mut failures = Vec::new();

        for backup in self.backups.iter_mut().rev() {
            if backup.is_restored() {
                continue;
            }
            match backup.restore() {
                Ok(()) => {
                    log_status!("backup", "Restored {}", display(root, backup.original()));
                }
                Err(err) => failures.push(format!(
                    "Failed to restore {}: {}",
                    display(root, backup.original()),
                    err.summary()
                )),
            }
        }

        for failure in failures {
            self.warn(failure);
        }

        self.records()
    }

    pub fn records(&self) -> Vec<BackupRecord> {
        self.backups.iter().map(ConfigBackup::record).collect()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    fn warn(&mut self, message: String) {
        log_status!("backup", "Warning: {}", message);
        self.warnings.push(message);
    }
}

fn strip_suffix(path: &Path, suffix: &str) -> Option<PathBuf> {
    let s = path.to_str()?;
    s.strip_suffix(suffix).map(PathBuf::from)
}

fn display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
