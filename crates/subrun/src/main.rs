//! subrun - SLURM-style client front-ends.
//!
//! Each subcommand resolves its options through the same lifecycle:
//! compiled defaults, environment overlay, command-line overlay, then
//! verification. What happens afterwards is the smallest honest
//! terminal behavior for a front-end with no controller behind it:
//! `run`/`launch` execute the resolved command locally with the
//! derived `SLURM_*` environment, `batch` validates the script and
//! prints the submission line, `attach` reports the resolved target.

use clap::{Parser, Subcommand};
use miette::Result;
use subrun_cli::{AttachArgs, BatchArgs, LaunchArgs, RunArgs};

mod attach;
mod batch;
mod launch;
mod run;

#[derive(Parser, Debug)]
#[command(name = "subrun", version)]
#[command(about = "Resolve, verify and launch batch job options")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Batch(BatchArgs),
    Attach(AttachArgs),
    Launch(LaunchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            init_logging(args.common.verbose);
            run::execute(args)
        }
        Command::Batch(args) => {
            init_logging(args.common.verbose);
            batch::execute(args)
        }
        Command::Attach(args) => {
            init_logging(args.verbose);
            attach::execute(args)
        }
        Command::Launch(args) => {
            init_logging(args.common.verbose);
            launch::execute(args)
        }
    }
}

/// Map stacked `-v` flags onto the tracing filter; RUST_LOG still
/// wins when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
