//! Root-relative path pattern resolution with glob support.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Expand a root-relative pattern into existing file paths.
///
/// - Literal patterns (no `*`, `?`, `[`, `]`) resolve to at most one path
/// - Glob patterns expand against `root`; the root itself is escaped
/// - Results are sorted so callers see a stable order
pub fn expand(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !contains_glob_chars(pattern) {
        let path = root.join(pattern);
        return Ok(if path.exists() { vec![path] } else { Vec::new() });
    }

    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);

    let mut entries: Vec<PathBuf> = glob::glob(&full)
        .map_err(|e| {
            Error::validation_invalid_argument(
                "pattern",
                format!("Invalid glob pattern '{}': {}", pattern, e),
                Some(pattern.to_string()),
                None,
            )
        })?
        .filter_map(|entry| entry.ok())
        .collect();

    entries.sort();
    Ok(entries)
}

/// Expand files only, skipping any whose name ends with `exclude_suffix`.
pub fn expand_files(root: &Path, pattern: &str, exclude_suffix: &str) -> Result<Vec<PathBuf>> {
    Ok(expand(root, pattern)?
        .into_iter()
        .filter(|p| p.is_file())
        .filter(|p| {
            exclude_suffix.is_empty()
                || !p.to_string_lossy().ends_with(exclude_suffix)
        })
        .collect())
}

/// True when any pattern matches at least one existing path.
///
/// Invalid patterns count as non-matching.
pub fn any_exists(root: &Path, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pattern| expand(root, pattern).is_ok_and(|found| !found.is_empty()))
}

pub fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn literal_pattern_resolves_existing_file() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("postcss.config.js")).unwrap();

        let found = expand(dir.path(), "postcss.config.js").unwrap();
        assert_eq!(found, vec![dir.path().join("postcss.config.js")]);
        assert!(expand(dir.path(), "postcss.config.cjs").unwrap().is_empty());
    }

    #[test]
    fn glob_pattern_matches_all_variants_sorted() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("tailwind.config.ts")).unwrap();
        File::create(dir.path().join("tailwind.config.js")).unwrap();

        let found = expand(dir.path(), "tailwind.config.*").unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("tailwind.config.js"),
                dir.path().join("tailwind.config.ts"),
            ]
        );
    }

    #[test]
    fn expand_files_skips_backups_and_directories() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("tailwind.config.js")).unwrap();
        File::create(dir.path().join("tailwind.config.js.bak")).unwrap();
        fs::create_dir(dir.path().join("tailwind.config.d")).unwrap();

        let found = expand_files(dir.path(), "tailwind.config.*", ".bak").unwrap();
        assert_eq!(found, vec![dir.path().join("tailwind.config.js")]);
    }

    #[test]
    fn any_exists_checks_nested_patterns() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("client/src")).unwrap();
        File::create(dir.path().join("client/src/App.tsx")).unwrap();

        assert!(any_exists(
            dir.path(),
            &["client/src/main.tsx".to_string(), "client/src/App.tsx".to_string()]
        ));
        assert!(!any_exists(dir.path(), &["client/tailwind.config.*".to_string()]));
    }

    #[test]
    fn test_contains_glob_chars() {
        assert!(contains_glob_chars("tailwind.config.*"));
        assert!(contains_glob_chars("file[0-9].txt"));
        assert!(!contains_glob_chars("client/src/main.tsx"));
    }
}
