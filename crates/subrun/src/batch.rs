//! The `batch` subcommand: resolve options, validate the script and
//! print the submission line.

use miette::{bail, IntoDiagnostic, Result};
use std::time::SystemTime;
use subrun_cli::BatchArgs;
use subrun_core::{env_snapshot, BatchOptions};

pub fn execute(args: BatchArgs) -> Result<()> {
    let mut opts = BatchOptions::defaults("batch");
    opts.apply_env(&env_snapshot()).into_diagnostic()?;
    args.apply(&mut opts).into_diagnostic()?;
    opts.verify().into_diagnostic()?;
    opts.dump();

    if opts.test_only {
        let json = serde_json::to_string_pretty(&opts).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    let script = match (&opts.script, &opts.wrap) {
        (Some(path), _) => std::fs::read_to_string(path).into_diagnostic()?,
        (None, Some(command)) => format!("#!/bin/sh\n{command}\n"),
        (None, None) => bail!("a batch script or --wrap is required"),
    };
    validate_script(&script)?;

    let jobid = submission_id();
    if args.parsable {
        println!("{jobid}");
    } else {
        println!("Submitted batch job {jobid}");
    }
    Ok(())
}

fn validate_script(script: &str) -> Result<()> {
    if script.is_empty() {
        bail!("batch script is empty");
    }
    if script.chars().all(char::is_whitespace) {
        bail!("batch script contains only whitespace");
    }
    if !script.starts_with("#!") {
        bail!("batch script must start with #! followed by the path to an interpreter");
    }
    Ok(())
}

/// With no controller to assign ids, derive one from the clock.
fn submission_id() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64 % 100_000_000)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_script() {
        assert!(validate_script("#!/bin/sh\necho hi\n").is_ok());
        assert!(validate_script("").is_err());
        assert!(validate_script("   \n\t\n").is_err());
        assert!(validate_script("echo hi\n").is_err());
    }
}
