use std::env;
use std::path::{Component, Path, PathBuf};

use crate::defaults::LayoutConfig;
use crate::error::{Error, Result};
use crate::template::TemplateVars;

/// Resolve the `--root` argument (with `~` and `$VAR` expansion) into an
/// absolute project root. Defaults to the current directory.
pub fn resolve_root(arg: Option<&str>) -> Result<PathBuf> {
    let cwd = env::current_dir()
        .map_err(|e| Error::internal_io(e.to_string(), Some("read current dir".to_string())))?;

    let Some(raw) = arg else {
        return Ok(cwd);
    };

    let expanded = expand(raw, "root")?;
    let path = PathBuf::from(expanded);
    let root = if path.is_absolute() { path } else { cwd.join(path) };

    if !root.is_dir() {
        return Err(Error::validation_invalid_argument(
            "root",
            format!("Project root is not a directory: {}", root.display()),
            Some(raw.to_string()),
            None,
        ));
    }

    Ok(root)
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand(raw: &str, field: &str) -> Result<String> {
    shellexpand::full(raw)
        .map(|s| s.into_owned())
        .map_err(|e| {
            Error::validation_invalid_argument(
                field,
                format!("Cannot expand '{}': {}", raw, e),
                Some(raw.to_string()),
                None,
            )
        })
}

/// Project layout resolved against a root directory.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub client_dir: PathBuf,
    pub client_output: PathBuf,
    pub server_entry: PathBuf,
    pub dist_dir: PathBuf,
    pub public_dir: PathBuf,
    pub bundle_output: PathBuf,
    pub api_entry: PathBuf,
    pub package_reference: PathBuf,
    config: LayoutConfig,
}

impl Layout {
    pub fn resolve(root: &Path, config: &LayoutConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            client_dir: root.join(&config.client_dir),
            client_output: root.join(&config.client_output),
            server_entry: root.join(&config.server_entry),
            dist_dir: root.join(&config.dist_dir),
            public_dir: root.join(&config.public_dir),
            bundle_output: root.join(&config.bundle_output),
            api_entry: root.join(&config.api_entry),
            package_reference: root.join(&config.package_reference),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn server_dir(&self) -> PathBuf {
        self.server_entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }

    pub fn public_index(&self) -> PathBuf {
        self.public_dir.join("index.html")
    }

    /// Output directories every run needs, in creation order.
    pub fn required_dirs(&self, extra: &[String]) -> Vec<PathBuf> {
        let mut dirs = vec![self.server_dir(), self.dist_dir.clone(), self.public_dir.clone()];
        for dir in extra {
            let path = self.root.join(dir);
            if !dirs.contains(&path) {
                dirs.push(path);
            }
        }
        dirs
    }

    /// Root-relative display form for logs and reports.
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Placeholder values for step commands and `when_exists` patterns.
    pub fn template_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            (TemplateVars::CLIENT_DIR, self.config.client_dir.clone()),
            (TemplateVars::CLIENT_OUTPUT, self.config.client_output.clone()),
            (TemplateVars::SERVER_ENTRY, self.config.server_entry.clone()),
            (TemplateVars::BUNDLE_OUTPUT, self.config.bundle_output.clone()),
            (TemplateVars::PUBLIC_DIR, self.config.public_dir.clone()),
        ]
    }

    /// Path from the api entry's directory to the server bundle, `/`-separated
    /// and prefixed with `./` or `../` so it works as a module specifier.
    pub fn bundle_specifier(&self) -> String {
        let from = self
            .api_entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        relative_specifier(&from, &self.bundle_output)
    }

    /// Path from the server entry's directory to the client build output.
    pub fn client_output_specifier(&self) -> String {
        relative_specifier(&self.server_dir(), &self.client_output)
    }

    /// Path from the api entry's directory to the public dir.
    pub fn public_specifier(&self) -> String {
        let from = self
            .api_entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        relative_specifier(&from, &self.public_dir)
    }
}

fn relative_specifier(from: &Path, to: &Path) -> String {
    let from: Vec<Component> = from.components().collect();
    let to_parts: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for part in &to_parts[common..] {
        parts.push(part.as_os_str().to_string_lossy().into_owned());
    }

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_conventional_tree() {
        let layout = Layout::resolve(Path::new("/app"), &LayoutConfig::default());

        assert_eq!(layout.server_dir(), PathBuf::from("/app/server"));
        assert_eq!(layout.public_index(), PathBuf::from("/app/dist/public/index.html"));
        assert_eq!(layout.display(&layout.bundle_output), "dist/index.js");
        assert_eq!(
            layout.required_dirs(&[]),
            vec![
                PathBuf::from("/app/server"),
                PathBuf::from("/app/dist"),
                PathBuf::from("/app/dist/public"),
            ]
        );
    }

    #[test]
    fn extra_dirs_are_appended_once() {
        let layout = Layout::resolve(Path::new("/app"), &LayoutConfig::default());
        let dirs = layout.required_dirs(&["dist".to_string(), "tmp/cache".to_string()]);
        assert_eq!(dirs.len(), 4);
        assert_eq!(dirs[3], PathBuf::from("/app/tmp/cache"));
    }

    #[test]
    fn bundle_specifier_climbs_out_of_api_dir() {
        let layout = Layout::resolve(Path::new("/app"), &LayoutConfig::default());
        assert_eq!(layout.bundle_specifier(), "../dist/index.js");
        assert_eq!(layout.public_specifier(), "../dist/public");
        assert_eq!(layout.client_output_specifier(), "../client/dist");
    }

    #[test]
    fn bundle_specifier_in_same_dir_gets_dot_prefix() {
        let config = LayoutConfig {
            api_entry: "dist/api.js".to_string(),
            ..LayoutConfig::default()
        };
        let layout = Layout::resolve(Path::new("/app"), &config);
        assert_eq!(layout.bundle_specifier(), "./index.js");
    }

    #[test]
    fn expand_resolves_env_vars() {
        std::env::set_var("BUILDSEQ_PATHS_TEST", "/srv/site");
        assert_eq!(expand("$BUILDSEQ_PATHS_TEST/app", "root").unwrap(), "/srv/site/app");
    }
}
