use clap::{Args, Subcommand};
use serde::Serialize;

use buildseq::database::{self, DatabaseCheck, DatabaseStatus};
use buildseq::environment;
use buildseq::log_status;
use buildseq::Error;

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct DbArgs {
    #[command(subcommand)]
    command: DbCommand,
}

#[derive(Subcommand)]
enum DbCommand {
    /// Check the database URL and add the SSL parameter when the provider needs it
    Check {
        /// URL to check instead of the configured environment variable
        #[arg(long)]
        url: Option<String>,

        /// Do not write the permanent-fix instructions file
        #[arg(long)]
        no_instructions: bool,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCheckOutput {
    #[serde(flatten)]
    pub check: DatabaseCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub fn run(args: DbArgs, global: &GlobalArgs) -> CmdResult<DbCheckOutput> {
    match args.command {
        DbCommand::Check {
            url,
            no_instructions,
        } => check(url, no_instructions, global),
    }
}

fn check(url: Option<String>, no_instructions: bool, global: &GlobalArgs) -> CmdResult<DbCheckOutput> {
    let project = global.load()?;
    let settings = &project.config.database;

    let value = url.or_else(|| environment::process_lookup(&settings.env_var));
    let check = database::check(value.as_deref(), settings);
    if check.is_missing() {
        return Err(Error::database_url_missing(&settings.env_var));
    }

    let mut output = DbCheckOutput {
        check,
        instructions_file: None,
        warnings: Vec::new(),
    };

    if output.check.status == DatabaseStatus::Fixed && !no_instructions {
        match database::write_instructions(&project.root, settings) {
            Ok(path) => {
                log_status!("database", "Wrote {}", path.display());
                output.instructions_file = Some(settings.instructions_file.clone());
            }
            Err(err) => output
                .warnings
                .push(format!("Could not write instructions: {}", err.summary())),
        }
    }

    Ok((output, 0))
}
