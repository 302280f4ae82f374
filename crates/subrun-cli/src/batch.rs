//! `batch` command arguments (script submission).

use camino::Utf8PathBuf;
use clap::Args;
use subrun_core::{BatchOptions, OptionsError};

use crate::common::CommonArgs;

#[derive(Args, Debug)]
#[command(about = "Submit a batch script")]
pub struct BatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Wrap a command line in a generated sh script instead of
    /// reading a script file
    #[arg(long, value_name = "COMMAND")]
    pub wrap: Option<String>,

    /// Requeue the job after node failure
    #[arg(long, conflicts_with = "no_requeue")]
    pub requeue: bool,

    /// Never requeue the job
    #[arg(long)]
    pub no_requeue: bool,

    /// Adjusted scheduling priority
    #[arg(long, value_name = "ADJUSTMENT", allow_hyphen_values = true)]
    pub nice: Option<i32>,

    /// Replicate the submitting user's login environment
    #[arg(long)]
    pub get_user_env: bool,

    /// Print the submission id only, parsable form
    #[arg(long)]
    pub parsable: bool,

    /// Resolve and print the options without submitting
    #[arg(long)]
    pub test_only: bool,

    /// Batch script to submit
    #[arg(value_name = "SCRIPT")]
    pub script: Option<Utf8PathBuf>,

    /// Arguments passed through to the script
    #[arg(trailing_var_arg = true, value_name = "ARGS")]
    pub script_args: Vec<String>,
}

impl BatchArgs {
    /// The command-line overlay pass.
    pub fn apply(&self, opts: &mut BatchOptions) -> Result<(), OptionsError> {
        self.common.apply(&mut opts.common)?;
        if let Some(wrap) = &self.wrap {
            opts.wrap = Some(wrap.clone());
        }
        if self.requeue {
            opts.requeue = Some(true);
        }
        if self.no_requeue {
            opts.requeue = Some(false);
        }
        if let Some(nice) = self.nice {
            opts.nice = Some(nice);
        }
        if self.get_user_env {
            opts.get_user_env = true;
        }
        if self.test_only {
            opts.test_only = true;
        }
        if let Some(script) = &self.script {
            opts.script = Some(script.clone());
        }
        if !self.script_args.is_empty() {
            opts.script_args = self.script_args.clone();
        }
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
        args: BatchArgs,
    }

    fn parse(argv: &[&str]) -> BatchArgs {
        TestCli::try_parse_from(argv.iter().copied()).expect("parse").args
    }

    #[test]
    fn test_script_and_args() {
        let args = parse(&["batch", "-p", "long", "job.sh", "alpha", "beta"]);
        let mut opts = BatchOptions::defaults("batch");
        args.apply(&mut opts).unwrap();

        assert_eq!(opts.common.partition.as_deref(), Some("long"));
        assert_eq!(opts.script.as_deref().map(|p| p.as_str()), Some("job.sh"));
        assert_eq!(opts.script_args, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_wrap() {
        let args = parse(&["batch", "--wrap", "hostname"]);
        let mut opts = BatchOptions::defaults("batch");
        args.apply(&mut opts).unwrap();
        assert_eq!(opts.wrap.as_deref(), Some("hostname"));
        assert!(opts.script.is_none());
    }

    #[test]
    fn test_requeue_flags() {
        let args = parse(&["batch", "--requeue", "job.sh"]);
        let mut opts = BatchOptions::defaults("batch");
        args.apply(&mut opts).unwrap();
        assert_eq!(opts.requeue, Some(true));

        let args = parse(&["batch", "--no-requeue", "job.sh"]);
        let mut opts = BatchOptions::defaults("batch");
        args.apply(&mut opts).unwrap();
        assert_eq!(opts.requeue, Some(false));

        assert!(TestCli::try_parse_from(["batch", "--requeue", "--no-requeue", "job.sh"]).is_err());
    }

    #[test]
    fn test_negative_nice() {
        let args = parse(&["batch", "--nice", "-10", "job.sh"]);
        assert_eq!(args.nice, Some(-10));
    }
}
