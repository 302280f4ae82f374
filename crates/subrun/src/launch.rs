//! The `launch` subcommand: resolve options against an existing
//! allocation and execute the first task locally.

use miette::{IntoDiagnostic, Result};
use subrun_cli::LaunchArgs;
use subrun_core::{env_snapshot, exported_env, LaunchOptions};

pub fn execute(args: LaunchArgs) -> Result<()> {
    let mut opts = LaunchOptions::defaults("launch");
    opts.apply_env(&env_snapshot()).into_diagnostic()?;
    args.apply(&mut opts).into_diagnostic()?;
    opts.verify().into_diagnostic()?;
    opts.dump();

    if opts.test_only {
        let json = serde_json::to_string_pretty(&opts).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    let env = exported_env(&opts.common);

    if let Some(prolog) = &opts.task_prolog {
        let status = std::process::Command::new(prolog)
            .current_dir(&opts.common.cwd)
            .envs(env.clone())
            .status()
            .into_diagnostic()?;
        if !status.success() {
            tracing::warn!("task prolog {} exited with {}", prolog, status);
        }
    }

    tracing::info!(
        "launching {:?} in job {:?}",
        opts.argv,
        opts.common.jobid
    );
    let status = std::process::Command::new(&opts.argv[0])
        .args(&opts.argv[1..])
        .current_dir(&opts.common.cwd)
        .envs(env.clone())
        .env("SLURM_PROCID", "0")
        .env("SLURM_LOCALID", "0")
        .env("SLURM_NODEID", "0")
        .status()
        .into_diagnostic()?;

    if let Some(epilog) = &opts.task_epilog {
        let epilog_status = std::process::Command::new(epilog)
            .current_dir(&opts.common.cwd)
            .envs(env)
            .status()
            .into_diagnostic()?;
        if !epilog_status.success() {
            tracing::warn!("task epilog {} exited with {}", epilog, epilog_status);
        }
    }

    std::process::exit(status.code().unwrap_or(1));
}
