//! The `attach` subcommand: resolve and report the attach target.

use miette::{miette, IntoDiagnostic, Result};
use subrun_cli::AttachArgs;
use subrun_core::{env_snapshot, AttachOptions, IoRedirect};

pub fn execute(args: AttachArgs) -> Result<()> {
    let mut opts = AttachOptions::defaults("attach");
    opts.apply_env(&env_snapshot()).into_diagnostic()?;
    args.apply(&mut opts).into_diagnostic()?;
    opts.verify().into_diagnostic()?;
    opts.dump();

    if opts.test_only {
        let json = serde_json::to_string_pretty(&opts).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    let step = opts
        .step
        .ok_or_else(|| miette!("no job step id after verification"))?;
    if opts.layout_only {
        println!("step {step}: layout requires a running controller");
        return Ok(());
    }

    let mode = |redirect: &Option<IoRedirect>| match redirect {
        Some(r) => r.to_string(),
        None => "all".to_string(),
    };
    println!(
        "would attach to step {} (stdin {}, stdout {}, stderr {}{})",
        step,
        mode(&opts.common.input),
        mode(&opts.common.output),
        mode(&opts.common.error),
        if opts.label { ", labelled" } else { "" },
    );
    Ok(())
}
