//! Placeholder and deployment file generators.
//!
//! Generators that stand in for missing inputs (server entry, client tree,
//! package reference) never overwrite existing files. Generators whose output
//! belongs to the build (fallback page, api entrypoint) always rewrite.

use std::path::{Path, PathBuf};

use heck::ToKebabCase;
use serde::Serialize;
use serde_json::{json, Value};

use crate::defaults::ApiFormat;
use crate::error::{Error, Result};
use crate::io;
use crate::log_status;
use crate::paths::Layout;
use crate::template::{self, TemplateVars};
use crate::templates;

/// Build script placed in the package reference manifest.
pub const PACKAGE_BUILD_COMMAND: &str = "buildseq run";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Generated {
    pub target: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl Generated {
    fn written(target: &Path, files: Vec<PathBuf>) -> Self {
        Self {
            target: target.to_path_buf(),
            files,
            skipped: None,
        }
    }

    fn skipped(target: &Path, reason: impl Into<String>) -> Self {
        Self {
            target: target.to_path_buf(),
            files: Vec::new(),
            skipped: Some(reason.into()),
        }
    }

    pub fn is_written(&self) -> bool {
        self.skipped.is_none()
    }
}

/// Create each directory that does not exist yet. Returns the ones created.
pub fn ensure_dirs(dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for dir in dirs {
        if io::ensure_dir(dir)? {
            created.push(dir.clone());
        }
    }
    Ok(created)
}

/// Write a minimal static server module if the server entry is absent.
pub fn ensure_server_entry(layout: &Layout) -> Result<Generated> {
    let target = &layout.server_entry;
    if target.exists() {
        return Ok(Generated::skipped(target, "already exists"));
    }

    let specifier = layout.client_output_specifier();
    let content = template::render(
        templates::SERVER_INDEX,
        &[(TemplateVars::CLIENT_OUTPUT, specifier.as_str())],
    );
    io::write_file_with_parents(target, &content, "write server entry")?;
    log_status!("scaffold", "Created {}", layout.display(target));

    Ok(Generated::written(target, vec![target.clone()]))
}

/// npm package name for the placeholder client.
pub fn client_package_name(app_name: &str) -> String {
    let base = app_name.to_kebab_case();
    if base.is_empty() {
        "app-client".to_string()
    } else {
        format!("{}-client", base)
    }
}

fn client_package_json(package_name: &str) -> Result<String> {
    let manifest = json!({
        "name": package_name,
        "private": true,
        "version": "0.0.0",
        "type": "module",
        "scripts": {
            "dev": "vite",
            "build": "vite build",
            "preview": "vite preview"
        },
        "dependencies": {
            "react": "^18.2.0",
            "react-dom": "^18.2.0"
        },
        "devDependencies": {
            "@vitejs/plugin-react": "^4.0.0",
            "vite": "^4.3.9"
        }
    });

    serde_json::to_string_pretty(&manifest)
        .map(|s| s + "\n")
        .map_err(|e| Error::internal_json(e.to_string(), Some("client package.json".to_string())))
}

/// Synthesize a self-contained placeholder client if the client dir is absent.
pub fn ensure_client(layout: &Layout, app_name: &str) -> Result<Generated> {
    let dir = &layout.client_dir;
    if dir.exists() {
        return Ok(Generated::skipped(dir, "already exists"));
    }

    log_status!(
        "scaffold",
        "{} not found, creating a placeholder client",
        layout.display(dir)
    );

    let package_name = client_package_name(app_name);
    let vars = [(TemplateVars::APP_NAME, app_name)];

    let files: Vec<(&str, String)> = vec![
        ("package.json", client_package_json(&package_name)?),
        ("vite.config.js", templates::CLIENT_VITE_CONFIG.to_string()),
        ("postcss.config.js", templates::CLIENT_POSTCSS_CONFIG.to_string()),
        ("index.html", template::render(templates::CLIENT_INDEX_HTML, &vars)),
        ("src/main.jsx", templates::CLIENT_MAIN_JSX.to_string()),
        ("src/App.jsx", template::render(templates::CLIENT_APP_JSX, &vars)),
        ("src/index.css", templates::CLIENT_INDEX_CSS.to_string()),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (relative, content) in files {
        let path = dir.join(relative);
        io::write_file_with_parents(&path, &content, &format!("write client/{}", relative))?;
        written.push(path);
    }

    log_status!("scaffold", "Created placeholder client ({} files)", written.len());
    Ok(Generated::written(dir, written))
}

/// The client build produced nothing servable.
pub fn needs_fallback(layout: &Layout) -> bool {
    io::is_dir_empty(&layout.client_output) || !layout.public_index().is_file()
}

/// Write the static fallback page to the public index path.
pub fn write_fallback_html(layout: &Layout, app_name: &str) -> Result<Generated> {
    let target = layout.public_index();
    let content = template::render(templates::FALLBACK_HTML, &[(TemplateVars::APP_NAME, app_name)]);
    io::write_file_with_parents(&target, &content, "write fallback index.html")?;
    log_status!("scaffold", "Created fallback {}", layout.display(&target));

    Ok(Generated::written(&target, vec![target.clone()]))
}

/// Copy the client build output into the public dir.
///
/// A missing or empty source is not an error: nothing is copied and the
/// result is marked skipped.
pub fn copy_client_output(layout: &Layout) -> Result<Generated> {
    let source = &layout.client_output;
    if io::is_dir_empty(source) {
        log_status!("copy", "Nothing to copy from {}", layout.display(source));
        return Ok(Generated::skipped(&layout.public_dir, "nothing to copy"));
    }

    let count = io::copy_dir_contents(source, &layout.public_dir)?;
    log_status!(
        "copy",
        "Copied {} file(s) from {} to {}",
        count,
        layout.display(source),
        layout.display(&layout.public_dir)
    );

    Ok(Generated::written(&layout.public_dir, vec![layout.public_dir.clone()]))
}

/// Write the serverless entrypoint that loads the server bundle.
pub fn write_api_entrypoint(layout: &Layout) -> Result<Generated> {
    let target = &layout.api_entry;
    let bundle = layout.bundle_specifier();
    let public = layout.public_specifier();

    let template_text = match layout.config().api_format {
        ApiFormat::Cjs => templates::API_ENTRY_CJS,
        ApiFormat::Esm => templates::API_ENTRY_ESM,
    };
    let content = template::render(
        template_text,
        &[
            (TemplateVars::BUNDLE_PATH, bundle.as_str()),
            (TemplateVars::PUBLIC_PATH, public.as_str()),
        ],
    );

    io::write_file_with_parents(target, &content, "write api entrypoint")?;
    log_status!("scaffold", "Wrote {}", layout.display(target));

    Ok(Generated::written(target, vec![target.clone()]))
}

/// Write a copy of the root package.json with its build script pointed at
/// `build_command`. Skipped when the reference already exists or there is no
/// root manifest.
pub fn write_package_reference(layout: &Layout, build_command: &str) -> Result<Generated> {
    let target = &layout.package_reference;
    if target.exists() {
        return Ok(Generated::skipped(target, "already exists"));
    }

    let manifest_path = layout.root.join("package.json");
    if !manifest_path.is_file() {
        return Ok(Generated::skipped(target, "no package.json in project root"));
    }

    let raw = io::read_file(&manifest_path, "read package.json")?;
    let mut manifest: Value = serde_json::from_str(&raw)
        .map_err(|e| Error::validation_invalid_json(e, Some("package.json".to_string())))?;

    let Some(object) = manifest.as_object_mut() else {
        return Err(Error::validation_invalid_argument(
            "package.json",
            "Expected a JSON object",
            None,
            None,
        ));
    };

    let scripts = object
        .entry("scripts")
        .or_insert_with(|| Value::Object(Default::default()));
    if !scripts.is_object() {
        *scripts = Value::Object(Default::default());
    }
    if let Some(scripts) = scripts.as_object_mut() {
        scripts.insert("build".to_string(), Value::String(build_command.to_string()));
    }

    let content = serde_json::to_string_pretty(&manifest)
        .map_err(|e| Error::internal_json(e.to_string(), Some("package reference".to_string())))?;
    io::write_file(target, &(content + "\n"), "write package reference")?;
    log_status!("scaffold", "Created {}", layout.display(target));

    Ok(Generated::written(target, vec![target.clone()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::LayoutConfig;
    use std::fs;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> Layout {
        Layout::resolve(dir.path(), &LayoutConfig::default())
    }

    #[test]
    fn client_package_name_is_kebab_case() {
        assert_eq!(client_package_name("LostShop"), "lost-shop-client");
        assert_eq!(client_package_name("My App"), "my-app-client");
        assert_eq!(client_package_name(""), "app-client");
    }

    #[test]
    fn ensure_client_writes_placeholder_tree() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);

        let generated = ensure_client(&layout, "LostShop").unwrap();
        assert!(generated.is_written());
        assert_eq!(generated.files.len(), 7);

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("client/package.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["name"], "lost-shop-client");
        assert_eq!(manifest["scripts"]["build"], "vite build");

        let app = fs::read_to_string(dir.path().join("client/src/App.jsx")).unwrap();
        assert!(app.contains("Welcome to LostShop"));
        assert!(dir.path().join("client/src/main.jsx").is_file());
        assert!(dir.path().join("client/index.html").is_file());
    }

    #[test]
    fn ensure_client_leaves_existing_tree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("client")).unwrap();

        let generated = ensure_client(&layout(&dir), "App").unwrap();
        assert!(!generated.is_written());
        assert!(!dir.path().join("client/package.json").exists());
    }

    #[test]
    fn server_entry_points_at_client_output() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);

        ensure_server_entry(&layout).unwrap();
        let content = fs::read_to_string(&layout.server_entry).unwrap();
        assert!(content.contains("'../client/dist'"));

        fs::write(&layout.server_entry, "custom").unwrap();
        assert!(!ensure_server_entry(&layout).unwrap().is_written());
        assert_eq!(fs::read_to_string(&layout.server_entry).unwrap(), "custom");
    }

    #[test]
    fn fallback_needed_until_public_index_exists() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        assert!(needs_fallback(&layout));

        write_fallback_html(&layout, "Shop").unwrap();
        // The client output is still empty, so the page stays a fallback.
        assert!(needs_fallback(&layout));

        fs::create_dir_all(&layout.client_output).unwrap();
        fs::write(layout.client_output.join("index.html"), "<html>").unwrap();
        assert!(!needs_fallback(&layout));
    }

    #[test]
    fn copy_tolerates_missing_source() {
        let dir = TempDir::new().unwrap();
        let generated = copy_client_output(&layout(&dir)).unwrap();
        assert_eq!(generated.skipped.as_deref(), Some("nothing to copy"));
    }

    #[test]
    fn copy_moves_build_into_public_dir() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        fs::create_dir_all(layout.client_output.join("assets")).unwrap();
        fs::write(layout.client_output.join("index.html"), "<html>").unwrap();
        fs::write(layout.client_output.join("assets/app.js"), "1").unwrap();

        assert!(copy_client_output(&layout).unwrap().is_written());
        assert!(layout.public_index().is_file());
        assert!(layout.public_dir.join("assets/app.js").is_file());
    }

    #[test]
    fn api_entrypoint_formats() {
        let dir = TempDir::new().unwrap();
        let cjs = layout(&dir);
        write_api_entrypoint(&cjs).unwrap();
        let content = fs::read_to_string(&cjs.api_entry).unwrap();
        assert!(content.contains("require('../dist/index.js')"));
        assert!(content.contains("'../dist/public'"));

        let esm = Layout::resolve(
            dir.path(),
            &LayoutConfig {
                api_format: ApiFormat::Esm,
                ..LayoutConfig::default()
            },
        );
        write_api_entrypoint(&esm).unwrap();
        let content = fs::read_to_string(&esm.api_entry).unwrap();
        assert!(content.contains("import * as server from '../dist/index.js'"));
    }

    #[test]
    fn package_reference_rewrites_build_script_once() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);

        assert_eq!(
            write_package_reference(&layout, PACKAGE_BUILD_COMMAND)
                .unwrap()
                .skipped
                .as_deref(),
            Some("no package.json in project root")
        );

        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "shop", "scripts": {"build": "node build-sequence.js", "start": "node dist"}}"#,
        )
        .unwrap();

        assert!(write_package_reference(&layout, PACKAGE_BUILD_COMMAND)
            .unwrap()
            .is_written());
        let reference: Value =
            serde_json::from_str(&fs::read_to_string(&layout.package_reference).unwrap()).unwrap();
        assert_eq!(reference["scripts"]["build"], "buildseq run");
        assert_eq!(reference["scripts"]["start"], "node dist");

        let again = write_package_reference(&layout, "other").unwrap();
        assert_eq!(again.skipped.as_deref(), Some("already exists"));
    }
}
