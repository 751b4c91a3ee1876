use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pipeline::{StepConfig, StepKind};

/// File name looked up in the project root when no `--config` is given.
pub const CONFIG_FILE: &str = "buildseq.json";

/// Root configuration structure for buildseq.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Display name used in generated placeholder pages.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Root-relative files (globs allowed) moved aside for the whole run.
    #[serde(default = "default_isolate_configs")]
    pub isolate_configs: Vec<String>,

    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// Directories created before any step, in addition to the layout's own.
    #[serde(default)]
    pub extra_dirs: Vec<String>,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub path_fix: PathFixConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default = "default_required_env")]
    pub required_env: Vec<String>,

    #[serde(default = "default_steps")]
    pub steps: Vec<StepConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            isolate_configs: default_isolate_configs(),
            backup_suffix: default_backup_suffix(),
            extra_dirs: Vec::new(),
            layout: LayoutConfig::default(),
            path_fix: PathFixConfig::default(),
            database: DatabaseConfig::default(),
            required_env: default_required_env(),
            steps: default_steps(),
        }
    }
}

/// Module format of the generated serverless entrypoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
    #[default]
    Cjs,
    Esm,
}

/// Project layout, all paths relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_client_dir")]
    pub client_dir: String,

    #[serde(default = "default_client_output")]
    pub client_output: String,

    #[serde(default = "default_server_entry")]
    pub server_entry: String,

    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,

    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    #[serde(default = "default_bundle_output")]
    pub bundle_output: String,

    #[serde(default = "default_api_entry")]
    pub api_entry: String,

    #[serde(default)]
    pub api_format: ApiFormat,

    #[serde(default = "default_package_reference")]
    pub package_reference: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            client_dir: default_client_dir(),
            client_output: default_client_output(),
            server_entry: default_server_entry(),
            dist_dir: default_dist_dir(),
            public_dir: default_public_dir(),
            bundle_output: default_bundle_output(),
            api_entry: default_api_entry(),
            api_format: ApiFormat::default(),
            package_reference: default_package_reference(),
        }
    }
}

/// Configuration for the path separator normalization step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFixConfig {
    /// Files to rewrite. Empty means the layout's bundle output.
    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default = "default_poll_attempts")]
    pub attempts: u32,

    #[serde(default = "default_poll_delay_ms")]
    pub delay_ms: u64,
}

impl Default for PathFixConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            attempts: default_poll_attempts(),
            delay_ms: default_poll_delay_ms(),
        }
    }
}

/// Configuration for the hosted Postgres connection string fix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_env_var")]
    pub env_var: String,

    /// Host fragment identifying the provider that requires SSL.
    #[serde(default = "default_provider_marker")]
    pub provider_marker: String,

    /// `key=value` query parameter appended when missing.
    #[serde(default = "default_ssl_param")]
    pub ssl_param: String,

    #[serde(default = "default_instructions_file")]
    pub instructions_file: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            env_var: default_database_env_var(),
            provider_marker: default_provider_marker(),
            ssl_param: default_ssl_param(),
            instructions_file: default_instructions_file(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_app_name() -> String {
    "App".to_string()
}

fn default_isolate_configs() -> Vec<String> {
    vec![
        "postcss.config.js".to_string(),
        "postcss.config.cjs".to_string(),
        "tailwind.config.js".to_string(),
        "tailwind.config.cjs".to_string(),
        "tailwind.config.ts".to_string(),
    ]
}

fn default_backup_suffix() -> String {
    ".bak".to_string()
}

fn default_client_dir() -> String {
    "client".to_string()
}

fn default_client_output() -> String {
    "client/dist".to_string()
}

fn default_server_entry() -> String {
    "server/index.js".to_string()
}

fn default_dist_dir() -> String {
    "dist".to_string()
}

fn default_public_dir() -> String {
    "dist/public".to_string()
}

fn default_bundle_output() -> String {
    "dist/index.js".to_string()
}

fn default_api_entry() -> String {
    "api/index.js".to_string()
}

fn default_package_reference() -> String {
    "package.json.vercel".to_string()
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_delay_ms() -> u64 {
    500
}

fn default_database_env_var() -> String {
    "DATABASE_URL".to_string()
}

fn default_provider_marker() -> String {
    "neon.tech".to_string()
}

fn default_ssl_param() -> String {
    "sslmode=require".to_string()
}

fn default_instructions_file() -> String {
    ".db-connection-fix.txt".to_string()
}

fn default_required_env() -> Vec<String> {
    vec!["DATABASE_URL".to_string(), "SESSION_SECRET".to_string()]
}

fn command_step(name: &str, command: &str, cwd: Option<&str>) -> StepConfig {
    StepConfig {
        name: name.to_string(),
        kind: StepKind::Command {
            command: command.to_string(),
            cwd: cwd.map(str::to_string),
        },
        fatal: false,
        needs: Vec::new(),
        when_exists: Vec::new(),
    }
}

fn builtin_step(name: &str, kind: StepKind) -> StepConfig {
    StepConfig {
        name: name.to_string(),
        kind,
        fatal: false,
        needs: Vec::new(),
        when_exists: Vec::new(),
    }
}

/// The reference plan: server bundle first (fatal), then the client chain,
/// each client step gated on its predecessor.
pub fn default_steps() -> Vec<StepConfig> {
    let server_bundle = StepConfig {
        fatal: true,
        ..command_step(
            "server-bundle",
            "npx esbuild {{serverEntry}} --bundle --platform=node --target=node16 \
             --format=cjs --packages=external --minify --sourcemap --outfile={{bundleOutput}}",
            None,
        )
    };

    let client_tailwind = StepConfig {
        when_exists: vec![
            "{{clientDir}}/tailwind.config.js".to_string(),
            "{{clientDir}}/tailwind.config.cjs".to_string(),
            "{{clientDir}}/tailwind.config.ts".to_string(),
        ],
        ..command_step(
            "client-tailwind",
            "npm install tailwindcss postcss autoprefixer",
            Some("{{clientDir}}"),
        )
    };

    let client_install = command_step("client-install", "npm install", Some("{{clientDir}}"));

    let client_typescript = StepConfig {
        needs: vec!["client-install".to_string()],
        when_exists: vec![
            "{{clientDir}}/src/main.tsx".to_string(),
            "{{clientDir}}/src/App.tsx".to_string(),
        ],
        ..command_step(
            "client-typescript",
            "npm install typescript @types/node @types/react @types/react-dom",
            Some("{{clientDir}}"),
        )
    };

    let client_build = StepConfig {
        needs: vec!["client-install".to_string(), "client-typescript".to_string()],
        ..command_step("client-build", "npm run build", Some("{{clientDir}}"))
    };

    let copy_client = StepConfig {
        needs: vec!["client-build".to_string()],
        ..builtin_step("copy-client-output", StepKind::CopyClientOutput)
    };

    vec![
        server_bundle,
        builtin_step("normalize-paths", StepKind::NormalizePaths),
        client_tailwind,
        client_install,
        client_typescript,
        client_build,
        copy_client,
        builtin_step("api-entrypoint", StepKind::ApiEntrypoint),
        builtin_step("package-reference", StepKind::PackageReference),
    ]
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load the config for a project root.
///
/// - `explicit` set: the file must exist and parse
/// - otherwise `<root>/buildseq.json` is used when present, built-in defaults when absent
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<BuildConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::validation_invalid_argument(
                    "config",
                    format!("Config file not found: {}", path.display()),
                    Some(path.display().to_string()),
                    None,
                ));
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path(root);
            if !path.exists() {
                return Ok(BuildConfig::default());
            }
            path
        }
    };

    let content = fs::read_to_string(&path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    parse_config(&content, &path)
}

/// Parse config content; `path` is only used for error reporting.
pub fn parse_config(content: &str, path: &Path) -> Result<BuildConfig> {
    let config: BuildConfig = serde_json::from_str(content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
    validate(&config)?;
    Ok(config)
}

/// Value checks serde cannot express. Step-list checks happen at plan time.
pub fn validate(config: &BuildConfig) -> Result<()> {
    if config.path_fix.attempts == 0 {
        return Err(Error::config_invalid_value(
            "path_fix.attempts",
            Some("0".to_string()),
            "must be at least 1",
        ));
    }
    if config.backup_suffix.trim().is_empty() {
        return Err(Error::config_invalid_value(
            "backup_suffix",
            Some(config.backup_suffix.clone()),
            "must not be empty",
        ));
    }
    Ok(())
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Check if a project-level buildseq.json exists
pub fn config_exists(root: &Path) -> bool {
    config_path(root).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_config(dir.path(), None).unwrap();

        assert_eq!(cfg.backup_suffix, ".bak");
        assert_eq!(cfg.path_fix.attempts, 10);
        assert_eq!(cfg.database.provider_marker, "neon.tech");
        assert_eq!(cfg.steps.len(), 9);
        assert!(cfg.steps[0].fatal);
        assert!(!config_exists(dir.path()));
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            config_path(dir.path()),
            r#"{"app_name": "LostShop", "layout": {"api_format": "esm"}, "path_fix": {"attempts": 3}}"#,
        )
        .unwrap();

        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.app_name, "LostShop");
        assert_eq!(cfg.layout.api_format, ApiFormat::Esm);
        assert_eq!(cfg.layout.client_dir, "client");
        assert_eq!(cfg.path_fix.attempts, 3);
        assert_eq!(cfg.path_fix.delay_ms, 500);
    }

    #[test]
    fn custom_steps_replace_default_plan() {
        let content = r#"{
            "steps": [
                {"name": "bundle", "type": "command", "command": "make", "fatal": true},
                {"name": "fix", "type": "normalize_paths", "needs": ["bundle"]}
            ]
        }"#;
        let cfg = parse_config(content, Path::new("buildseq.json")).unwrap();

        assert_eq!(cfg.steps.len(), 2);
        assert_eq!(
            cfg.steps[0].kind,
            StepKind::Command {
                command: "make".to_string(),
                cwd: None
            }
        );
        assert_eq!(cfg.steps[1].kind, StepKind::NormalizePaths);
        assert_eq!(cfg.steps[1].needs, vec!["bundle".to_string()]);
    }

    #[test]
    fn invalid_json_is_an_error_not_a_silent_default() {
        let dir = tempdir().unwrap();
        fs::write(config_path(dir.path()), "{ not json").unwrap();

        let err = load_config(dir.path(), None).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
    }

    #[test]
    fn zero_poll_attempts_is_rejected() {
        let err = parse_config(r#"{"path_fix": {"attempts": 0}}"#, Path::new("buildseq.json"))
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["key"], "path_fix.attempts");
    }

    #[test]
    fn explicit_missing_file_is_rejected() {
        let dir = tempdir().unwrap();
        let err = load_config(dir.path(), Some(&dir.path().join("nope.json"))).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }
}
