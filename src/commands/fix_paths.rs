use clap::Args;
use serde::Serialize;

use buildseq::normalize::{self, NormalizeReport};
use buildseq::paths::Layout;
use buildseq::retry::{RetryPolicy, ThreadSleeper};
use buildseq::sequencer;

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args, Debug, Default)]
pub struct FixPathsArgs {
    /// Override the number of existence checks per target
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Override the delay between checks, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixPathsOutput {
    pub files: Vec<NormalizeReport>,
    pub abandoned: usize,
}

pub fn run(args: FixPathsArgs, global: &GlobalArgs) -> CmdResult<FixPathsOutput> {
    let project = global.load()?;
    let layout = Layout::resolve(&project.root, &project.config.layout);
    let targets = sequencer::path_fix_targets(&project.config, &layout);

    let policy = RetryPolicy::from_millis(
        args.attempts.unwrap_or(project.config.path_fix.attempts),
        args.delay_ms.unwrap_or(project.config.path_fix.delay_ms),
    );

    let files = normalize::fix_files(&targets, policy, &ThreadSleeper)?;
    let abandoned = files.iter().filter(|f| f.is_abandoned()).count();

    Ok((FixPathsOutput { files, abandoned }, 0))
}
