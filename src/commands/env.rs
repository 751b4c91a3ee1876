use clap::{Args, Subcommand};

use buildseq::environment::{self, EnvCheck};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct EnvArgs {
    #[command(subcommand)]
    command: EnvCommand,
}

#[derive(Subcommand)]
enum EnvCommand {
    /// Report missing deployment variables and the database URL status
    Check,
}

pub fn run(args: EnvArgs, global: &GlobalArgs) -> CmdResult<EnvCheck> {
    match args.command {
        EnvCommand::Check => {
            let project = global.load()?;
            let result = environment::check(
                &project.config.required_env,
                &project.config.database,
                environment::process_lookup,
            );
            let exit_code = if result.ok { 0 } else { 1 };
            Ok((result, exit_code))
        }
    }
}
