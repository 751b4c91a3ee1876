use clap::Args;
use buildseq::sequencer::{BuildReport, Sequencer};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args, Debug, Default)]
pub struct RunArgs {}

pub fn run(_args: RunArgs, global: &GlobalArgs) -> CmdResult<BuildReport> {
    let project = global.load()?;
    let report = Sequencer::new(&project.root, project.config).run_configured()?;
    let exit_code = report.exit_code();
    Ok((report, exit_code))
}
