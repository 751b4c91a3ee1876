use clap::{Args, ValueEnum};
use serde::Serialize;

use buildseq::paths::Layout;
use buildseq::scaffold::{self, Generated};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ScaffoldArgs {
    /// Generator to run
    #[arg(value_enum)]
    pub target: ScaffoldTarget,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScaffoldTarget {
    /// Placeholder client tree (only if the client directory is missing)
    Client,
    /// Minimal static server entry (only if missing)
    Server,
    /// Serverless api entrypoint
    Api,
    /// Static fallback page in the public directory
    Fallback,
    /// Deployment package manifest (only if missing)
    PackageReference,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldOutput {
    pub target: String,
    pub written: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

pub fn run(args: ScaffoldArgs, global: &GlobalArgs) -> CmdResult<ScaffoldOutput> {
    let project = global.load()?;
    let layout = Layout::resolve(&project.root, &project.config.layout);
    let app_name = project.config.app_name.as_str();

    let generated = match args.target {
        ScaffoldTarget::Client => scaffold::ensure_client(&layout, app_name)?,
        ScaffoldTarget::Server => scaffold::ensure_server_entry(&layout)?,
        ScaffoldTarget::Api => scaffold::write_api_entrypoint(&layout)?,
        ScaffoldTarget::Fallback => scaffold::write_fallback_html(&layout, app_name)?,
        ScaffoldTarget::PackageReference => {
            scaffold::write_package_reference(&layout, scaffold::PACKAGE_BUILD_COMMAND)?
        }
    };

    Ok((to_output(&layout, generated), 0))
}

fn to_output(layout: &Layout, generated: Generated) -> ScaffoldOutput {
    ScaffoldOutput {
        target: layout.display(&generated.target),
        written: generated.is_written(),
        files: generated.files.iter().map(|f| layout.display(f)).collect(),
        skipped: generated.skipped,
    }
}
