//! The `run` subcommand: resolve options and execute the step's
//! first task locally.

use miette::{miette, IntoDiagnostic, Result};
use subrun_cli::RunArgs;
use subrun_core::{env_snapshot, exported_env, RunOptions};

pub fn execute(args: RunArgs) -> Result<()> {
    let mut opts = RunOptions::defaults("run");
    opts.apply_env(&env_snapshot()).into_diagnostic()?;
    args.apply(&mut opts).into_diagnostic()?;
    opts.verify().into_diagnostic()?;
    opts.dump();

    if opts.test_only {
        let json = serde_json::to_string_pretty(&opts).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    let argv = match &opts.prog_table {
        Some(table) => table
            .command_for(0)
            .ok_or_else(|| miette!("multi-prog table has no entry for task 0"))?,
        None => opts.argv.clone(),
    };

    tracing::info!("launching {:?} with {} task(s)", argv, opts.common.ntasks);
    let status = std::process::Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(&opts.common.cwd)
        .envs(exported_env(&opts.common))
        .env("SLURM_PROCID", "0")
        .env("SLURM_LOCALID", "0")
        .env("SLURM_NODEID", "0")
        .status()
        .into_diagnostic()?;

    std::process::exit(status.code().unwrap_or(1));
}
