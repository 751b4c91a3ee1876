use clap::{Parser, Subcommand};

use buildseq::output;
use commands::GlobalArgs;

mod commands;

use commands::{db, env, fix_paths, plan, run, scaffold};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "buildseq")]
#[command(version = VERSION)]
#[command(about = "Sequenced client/server build with config isolation and rollback")]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<String>,

    /// Config file (defaults to buildseq.json in the project root)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full build sequence (default)
    Run(run::RunArgs),
    /// Show the resolved build plan without running it
    Plan(plan::PlanArgs),
    /// Normalize path separators in the server bundle
    FixPaths(fix_paths::FixPathsArgs),
    /// Database URL operations
    Db(db::DbArgs),
    /// Deployment environment checks
    Env(env::EnvArgs),
    /// Run a single file generator
    Scaffold(scaffold::ScaffoldArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        root: cli.root,
        config: cli.config,
    };

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Run(run::RunArgs::default()));

    let (json_result, exit_code) = commands::run_json(command, &global);

    if let Err(err) = output::print_result(json_result) {
        eprintln!("[output] {}", err.summary());
        return std::process::ExitCode::from(exit_code_to_u8(1));
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
