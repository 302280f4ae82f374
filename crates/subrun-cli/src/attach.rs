//! `attach` command arguments (reconnect to a running step).

use clap::{ArgAction, Args};
use subrun_core::{AttachOptions, IoRedirect, OptionsError, StepId};

#[derive(Args, Debug)]
#[command(about = "Attach to the I/O of a running job step")]
pub struct AttachArgs {
    /// Job step to attach to
    #[arg(value_name = "JOBID[.STEPID]")]
    pub step: String,

    /// Prepend the task id to every output line
    #[arg(short = 'l', long = "label")]
    pub label: bool,

    /// Print the step's task layout and exit
    #[arg(long)]
    pub layout_only: bool,

    /// Attach through a pseudo terminal
    #[arg(long)]
    pub pty: bool,

    /// Which task's stdin to forward (all|none|<taskid>)
    #[arg(short = 'i', long, value_name = "MODE")]
    pub input: Option<String>,

    /// Which task's stdout to show
    #[arg(short = 'o', long, value_name = "MODE")]
    pub output: Option<String>,

    /// Which task's stderr to show
    #[arg(short = 'e', long, value_name = "MODE")]
    pub error: Option<String>,

    /// Increase verbosity (repeatable)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short = 'Q', long)]
    pub quiet: bool,

    /// Resolve and print the options without attaching
    #[arg(long)]
    pub test_only: bool,
}

impl AttachArgs {
    /// The command-line overlay pass.
    pub fn apply(&self, opts: &mut AttachOptions) -> Result<(), OptionsError> {
        let step: StepId = self.step.parse()?;
        opts.step = Some(step);
        if self.label {
            opts.label = true;
        }
        if self.layout_only {
            opts.layout_only = true;
        }
        if self.pty {
            opts.pty = true;
        }
        if let Some(input) = &self.input {
            opts.common.input = Some(IoRedirect::parse(input));
        }
        if let Some(output) = &self.output {
            opts.common.output = Some(IoRedirect::parse(output));
        }
        if let Some(error) = &self.error {
            opts.common.error = Some(IoRedirect::parse(error));
        }
        if self.verbose > 0 {
            opts.common.verbose = self.verbose;
        }
        if self.quiet {
            opts.common.quiet = true;
        }
        if self.test_only {
            opts.test_only = true;
        }
        Ok(())
    }
}
