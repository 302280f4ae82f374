//! `run` command arguments (interactive job-step launch).

use camino::Utf8PathBuf;
use clap::Args;
use subrun_core::{OptionsError, RunOptions};

use crate::common::CommonArgs;

#[derive(Args, Debug)]
#[command(about = "Run a parallel job step")]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Run different programs per task from a config file
    #[arg(long)]
    pub multi_prog: bool,

    /// Run relative to the n'th node of the allocation
    #[arg(short = 'r', long, value_name = "N")]
    pub relative: Option<u32>,

    /// File listing the hosts to run on, one per line
    #[arg(long, value_name = "FILE")]
    pub hostfile: Option<Utf8PathBuf>,

    /// Seconds to wait for remaining tasks after the first exits
    #[arg(short = 'W', long = "wait", value_name = "SEC")]
    pub wait_secs: Option<u32>,

    /// Kill the step if any task exits with a non-zero code
    #[arg(short = 'K', long)]
    pub kill_on_bad_exit: bool,

    /// Debug level for the node daemons
    #[arg(long, value_name = "LEVEL", hide_short_help = true)]
    pub slurmd_debug: Option<u8>,

    /// Resolve and print the options without launching anything
    #[arg(long)]
    pub test_only: bool,

    /// Command to run and its arguments (the multi-prog config file
    /// when --multi-prog is given)
    #[arg(trailing_var_arg = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl RunArgs {
    /// The command-line overlay pass.
    pub fn apply(&self, opts: &mut RunOptions) -> Result<(), OptionsError> {
        self.common.apply(&mut opts.common)?;
        if self.multi_prog {
            opts.multi_prog = true;
        }
        if let Some(relative) = self.relative {
            opts.relative = Some(relative);
        }
        if let Some(hostfile) = &self.hostfile {
            opts.hostfile = Some(hostfile.clone());
        }
        if let Some(wait) = self.wait_secs {
            opts.wait_secs = Some(wait);
        }
        if self.kill_on_bad_exit {
            opts.kill_on_bad_exit = true;
        }
        if let Some(level) = self.slurmd_debug {
            opts.slurmd_debug = Some(level);
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
    use subrun_parsers::{Distribution, TimeLimit};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> RunArgs {
        TestCli::try_parse_from(argv.iter().copied()).expect("parse").args
    }

    #[test]
    fn test_cli_overlay() {
        let args = parse(&[
            "run", "-n", "8", "-N", "2-4", "-m", "block:cyclic", "-t", "30", "--mem", "4G",
            "--cpu-bind", "rank", "-v", "-v", "--", "hostname", "-f",
        ]);
        let mut opts = RunOptions::defaults("run");
        args.apply(&mut opts).unwrap();

        assert_eq!(opts.common.ntasks, 8);
        assert!(opts.common.ntasks_set);
        assert_eq!(opts.common.min_nodes, 2);
        assert_eq!(opts.common.max_nodes, Some(4));
        assert_eq!(opts.common.distribution, Some(Distribution::BlockCyclic));
        assert_eq!(opts.common.time_limit, Some(TimeLimit::Minutes(30)));
        assert_eq!(opts.common.mem_mb, Some(4096));
        assert_eq!(opts.common.verbose, 2);
        assert_eq!(opts.argv, vec!["hostname", "-f"]);
    }

    #[test]
    fn test_cli_overrides_env_value() {
        // simulate the env pass having set ntasks, then the CLI wins
        let mut opts = RunOptions::defaults("run");
        opts.common.ntasks = 4;
        opts.common.ntasks_set = true;

        let args = parse(&["run", "-n", "16", "--", "hostname"]);
        args.apply(&mut opts).unwrap();
        assert_eq!(opts.common.ntasks, 16);
    }

    #[test]
    fn test_untouched_flags_preserve_earlier_passes() {
        let mut opts = RunOptions::defaults("run");
        opts.common.partition = Some("debug".to_string());
        opts.common.verbose = 3;

        let args = parse(&["run", "--", "hostname"]);
        args.apply(&mut opts).unwrap();
        assert_eq!(opts.common.partition.as_deref(), Some("debug"));
        assert_eq!(opts.common.verbose, 3);
    }

    #[test]
    fn test_bad_values_rejected_at_parse() {
        assert!(TestCli::try_parse_from(["run", "-N", "0", "hostname"]).is_err());
        assert!(TestCli::try_parse_from(["run", "-m", "diagonal", "hostname"]).is_err());
        assert!(TestCli::try_parse_from(["run", "--mem", "lots", "hostname"]).is_err());
        assert!(TestCli::try_parse_from(["run"]).is_err());
    }

    #[test]
    fn test_multi_prog_and_hostfile() {
        let args = parse(&["run", "--multi-prog", "--hostfile", "hosts.txt", "multi.conf"]);
        let mut opts = RunOptions::defaults("run");
        args.apply(&mut opts).unwrap();
        assert!(opts.multi_prog);
        assert_eq!(opts.hostfile.as_deref().map(|p| p.as_str()), Some("hosts.txt"));
        assert_eq!(opts.argv, vec!["multi.conf"]);
    }
}
