//! Option resolution errors.

use chrono::NaiveDateTime;
use subrun_hostlist::HostlistError;
use subrun_parsers::ParseError;
use thiserror::Error;

use crate::multiprog::MultiProgError;

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("environment variable {var}: {source}")]
    Env {
        var: &'static str,
        source: ParseError,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Hostlist(#[from] HostlistError),
    #[error(transparent)]
    MultiProg(#[from] MultiProgError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("--mem and --mem-per-cpu are mutually exclusive")]
    MemConflict,
    #[error("--quiet and --verbose are mutually exclusive")]
    QuietVerbose,
    #[error("plane distribution requires a plane size")]
    PlaneSizeMissing,
    #[error("plane size given but distribution is {0}")]
    PlaneSizeUnused(String),
    #[error("{0} binding requires a map or mask list")]
    BindListMissing(&'static str),
    #[error("node {0} appears in both the nodelist and the exclude list")]
    NodeOverlap(String),
    #[error("arbitrary distribution needs one host per task: {ntasks} tasks, {hosts} hosts")]
    ArbitraryTaskCount { ntasks: u32, hosts: usize },
    #[error("begin time {0} is in the past")]
    BeginInPast(NaiveDateTime),
    #[error("cannot resolve executable \"{0}\"")]
    ExecNotFound(String),
    #[error("script file \"{0}\" is not readable")]
    ScriptUnreadable(String),
    #[error("a batch script or --wrap is required")]
    MissingScript,
    #[error("a batch script and --wrap are mutually exclusive")]
    ScriptAndWrap,
    #[error("a job id is required (--jobid or SLAUNCH_JOBID)")]
    MissingJobId,
    #[error("a job step id is required")]
    MissingStep,
    #[error("no command given")]
    NoCommand,
}
