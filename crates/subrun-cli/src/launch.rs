//! `launch` command arguments (tasks inside an existing allocation).

use camino::Utf8PathBuf;
use clap::Args;
use subrun_core::{LaunchOptions, OptionsError};

use crate::common::CommonArgs;

#[derive(Args, Debug)]
#[command(about = "Launch tasks within an existing job allocation")]
pub struct LaunchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Script run by each task before the command
    #[arg(long, value_name = "FILE")]
    pub task_prolog: Option<Utf8PathBuf>,

    /// Script run by each task after the command
    #[arg(long, value_name = "FILE")]
    pub task_epilog: Option<Utf8PathBuf>,

    /// Resolve and print the options without launching anything
    #[arg(long)]
    pub test_only: bool,

    /// Command to run and its arguments
    #[arg(trailing_var_arg = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl LaunchArgs {
    /// The command-line overlay pass. The job id itself rides on the
    /// shared `--jobid` flag; verification rejects a launch without
    /// one.
    pub fn apply(&self, opts: &mut LaunchOptions) -> Result<(), OptionsError> {
        self.common.apply(&mut opts.common)?;
        if let Some(prolog) = &self.task_prolog {
            opts.task_prolog = Some(prolog.clone());
        }
        if let Some(epilog) = &self.task_epilog {
            opts.task_epilog = Some(epilog.clone());
        }
        if self.test_only {
            opts.test_only = true;
        }
        opts.argv = self.command.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: LaunchArgs,
    }

    fn parse(argv: &[&str]) -> LaunchArgs {
        TestCli::try_parse_from(argv.iter().copied()).expect("parse").args
    }

    #[test]
    fn test_jobid_and_command() {
        let args = parse(&["launch", "--jobid", "42", "-n", "4", "--", "worker", "--fast"]);
        let mut opts = LaunchOptions::defaults("launch");
        args.apply(&mut opts).unwrap();

        assert_eq!(opts.common.jobid, Some(42));
        assert_eq!(opts.common.ntasks, 4);
        assert_eq!(opts.argv, vec!["worker", "--fast"]);
    }

    #[test]
    fn test_prolog_epilog() {
        let args = parse(&[
            "launch",
            "--jobid",
            "42",
            "--task-prolog",
            "pre.sh",
            "--task-epilog",
            "post.sh",
            "worker",
        ]);
        let mut opts = LaunchOptions::defaults("launch");
        args.apply(&mut opts).unwrap();
        assert_eq!(opts.task_prolog.as_deref().map(|p| p.as_str()), Some("pre.sh"));
        assert_eq!(opts.task_epilog.as_deref().map(|p| p.as_str()), Some("post.sh"));
    }

    #[test]
    fn test_command_required() {
        assert!(TestCli::try_parse_from(["launch", "--jobid", "42"]).is_err());
    }
}
