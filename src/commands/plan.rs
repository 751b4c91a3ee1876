use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use buildseq::pipeline::PlannedStep;
use buildseq::sequencer::{self, Sequencer};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args, Debug, Default)]
pub struct PlanArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutput {
    pub root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub isolate_configs: Vec<String>,
    pub path_fix_targets: Vec<String>,
    pub steps: Vec<PlannedStep>,
}

pub fn run(_args: PlanArgs, global: &GlobalArgs) -> CmdResult<PlanOutput> {
    let project = global.load()?;
    let isolate_configs = project.config.isolate_configs.clone();
    let sequencer = Sequencer::new(&project.root, project.config);
    let layout = sequencer.layout();

    let steps = sequencer
        .configured_steps()?
        .iter()
        .map(|step| step.describe(layout))
        .collect();

    let path_fix_targets = sequencer::path_fix_targets(sequencer.config(), layout)
        .iter()
        .map(|target| layout.display(target))
        .collect();

    Ok((
        PlanOutput {
            root: project.root,
            config_file: project.config_file,
            isolate_configs,
            path_fix_targets,
            steps,
        },
        0,
    ))
}
