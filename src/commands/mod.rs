use std::path::PathBuf;

use buildseq::defaults::{self, BuildConfig};
use buildseq::paths;

pub type CmdResult<T> = buildseq::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub root: Option<String>,
    pub config: Option<String>,
}

/// Project root and loaded configuration shared by every command.
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: BuildConfig,
    pub config_file: Option<PathBuf>,
}

impl GlobalArgs {
    pub(crate) fn load(&self) -> buildseq::Result<Project> {
        let root = paths::resolve_root(self.root.as_deref())?;

        let explicit = match self.config.as_deref() {
            Some(raw) => Some(PathBuf::from(paths::expand(raw, "config")?)),
            None => None,
        };

        let config = defaults::load_config(&root, explicit.as_deref())?;
        let config_file = explicit.or_else(|| {
            defaults::config_exists(&root).then(|| defaults::config_path(&root))
        });

        Ok(Project {
            root,
            config,
            config_file,
        })
    }
}

pub mod db;
pub mod env;
pub mod fix_paths;
pub mod plan;
pub mod run;
pub mod scaffold;

macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        buildseq::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (buildseq::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::FixPaths(args) => dispatch!(args, global, fix_paths),
        crate::Commands::Db(args) => dispatch!(args, global, db),
        crate::Commands::Env(args) => dispatch!(args, global, env),
        crate::Commands::Scaffold(args) => dispatch!(args, global, scaffold),
    }
}
