//! Per-command option structs and their compiled defaults.

use camino::Utf8PathBuf;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use subrun_parsers::{ConnType, CpuBind, Distribution, MemBind, ParseError, TimeLimit};

use crate::multiprog::MultiProg;

/// Invoking user, captured once at defaults time.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user: String,
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    pub fn capture() -> Self {
        let uid = nix::unistd::getuid();
        let gid = nix::unistd::getgid();
        let user = nix::unistd::User::from_uid(uid)
            .ok()
            .flatten()
            .map(|u| u.name)
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| uid.as_raw().to_string());
        Self {
            user,
            uid: uid.as_raw(),
            gid: gid.as_raw(),
        }
    }
}

/// Where a task's stdin/stdout/stderr goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IoRedirect {
    /// Connect every task (the default).
    All,
    /// /dev/null.
    None,
    /// Only the given task id; the rest get /dev/null.
    Task(u32),
    /// A file name pattern (`%t`, `%J` etc. expanded per task later).
    File(String),
}

impl IoRedirect {
    /// `all`, `none`, a bare task id, or anything else as a file name.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "all" => return IoRedirect::All,
            "none" => return IoRedirect::None,
            _ => {}
        }
        match s.parse::<u32>() {
            Ok(task) => IoRedirect::Task(task),
            Err(_) => IoRedirect::File(s.to_string()),
        }
    }
}

impl fmt::Display for IoRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoRedirect::All => write!(f, "all"),
            IoRedirect::None => write!(f, "none"),
            IoRedirect::Task(t) => write!(f, "{}", t),
            IoRedirect::File(name) => write!(f, "{}", name),
        }
    }
}

/// A `jobid.stepid` pair; the step defaults to 0 when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepId {
    pub jobid: u32,
    pub stepid: u32,
}

impl FromStr for StepId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::new("job step id", s);
        let (job, step) = match s.split_once('.') {
            Some((j, st)) => (j, Some(st)),
            None => (s, None),
        };
        let jobid = job.parse().map_err(|_| err())?;
        let stepid = match step {
            Some(st) => st.parse().map_err(|_| err())?,
            None => 0,
        };
        Ok(Self { jobid, stepid })
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.jobid, self.stepid)
    }
}

/// Options shared by every client command.
///
/// The `*_set` flags record whether a later overlay pass touched the
/// field, which the verification pass needs to tell an explicit value
/// from a compiled default.
#[derive(Debug, Clone, Serialize)]
pub struct CommonOptions {
    // identity/session
    pub progname: String,
    pub user: String,
    pub uid: u32,
    pub gid: u32,
    pub cwd: Utf8PathBuf,

    // job sizing
    pub ntasks: u32,
    pub ntasks_set: bool,
    pub cpus_per_task: u32,
    pub cpus_set: bool,
    pub min_nodes: u32,
    pub max_nodes: Option<u32>,
    pub nodes_set: bool,
    pub ntasks_per_node: Option<u32>,
    pub sockets_per_node: Option<u32>,
    pub cores_per_socket: Option<u32>,
    pub threads_per_core: Option<u32>,
    pub distribution: Option<Distribution>,
    pub plane_size: Option<u32>,

    // scheduling/constraints
    pub job_name: Option<String>,
    pub partition: Option<String>,
    pub time_limit: Option<TimeLimit>,
    pub mem_mb: Option<u64>,
    pub mem_per_cpu_mb: Option<u64>,
    pub tmp_disk_mb: Option<u64>,
    pub mincpus: Option<u32>,
    pub nodelist: Option<String>,
    pub exclude: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodelist_hosts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_hosts: Vec<String>,
    pub constraint: Option<String>,
    pub begin: Option<NaiveDateTime>,
    pub dependency: Option<String>,
    pub qos: Option<String>,
    pub reservation: Option<String>,
    pub account: Option<String>,
    pub ckpt_interval_min: Option<u32>,
    pub geometry: Option<[u16; 3]>,
    pub conn_type: Option<ConnType>,
    pub no_rotate: bool,
    pub overcommit: bool,
    pub hold: bool,
    pub share: bool,
    pub immediate: bool,
    pub jobid: Option<u32>,

    // binding
    pub cpu_bind: Option<CpuBind>,
    pub mem_bind: Option<MemBind>,

    // I/O redirection
    pub input: Option<IoRedirect>,
    pub output: Option<IoRedirect>,
    pub error: Option<IoRedirect>,
    pub labelio: bool,
    pub unbuffered: bool,

    // verbosity
    pub verbose: u8,
    pub quiet: bool,
}

impl CommonOptions {
    /// Compiled defaults plus identity capture.
    pub fn defaults(progname: &str) -> Self {
        let identity = Identity::capture();
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        Self {
            progname: progname.to_string(),
            user: identity.user,
            uid: identity.uid,
            gid: identity.gid,
            cwd,
            ntasks: 1,
            ntasks_set: false,
            cpus_per_task: 1,
            cpus_set: false,
            min_nodes: 1,
            max_nodes: None,
            nodes_set: false,
            ntasks_per_node: None,
            sockets_per_node: None,
            cores_per_socket: None,
            threads_per_core: None,
            distribution: None,
            plane_size: None,
            job_name: None,
            partition: None,
            time_limit: None,
            mem_mb: None,
            mem_per_cpu_mb: None,
            tmp_disk_mb: None,
            mincpus: None,
            nodelist: None,
            exclude: None,
            nodelist_hosts: Vec::new(),
            exclude_hosts: Vec::new(),
            constraint: None,
            begin: None,
            dependency: None,
            qos: None,
            reservation: None,
            account: None,
            ckpt_interval_min: None,
            geometry: None,
            conn_type: None,
            no_rotate: false,
            overcommit: false,
            hold: false,
            share: false,
            immediate: false,
            jobid: None,
            cpu_bind: None,
            mem_bind: None,
            input: None,
            output: None,
            error: None,
            labelio: false,
            unbuffered: false,
            verbose: 0,
            quiet: false,
        }
    }

    /// Log every populated field group at debug level.
    pub fn dump(&self) {
        tracing::debug!(
            "defined options for program `{}`: user {} (uid {}, gid {}), cwd {}",
            self.progname,
            self.user,
            self.uid,
            self.gid,
            self.cwd
        );
        tracing::debug!(
            "sizing: ntasks {}{}, cpus_per_task {}, nodes {}..{}",
            self.ntasks,
            if self.ntasks_set { " (set)" } else { "" },
            self.cpus_per_task,
            self.min_nodes,
            self.max_nodes
                .map(|m| m.to_string())
                .unwrap_or_else(|| "max".to_string()),
        );
        if let Some(dist) = self.distribution {
            tracing::debug!("distribution: {} (plane_size {:?})", dist, self.plane_size);
        }
        if let Some(name) = &self.job_name {
            tracing::debug!("job_name: {}", name);
        }
        if let Some(partition) = &self.partition {
            tracing::debug!("partition: {}", partition);
        }
        if let Some(limit) = self.time_limit {
            tracing::debug!("time_limit: {}", limit);
        }
        if self.mem_mb.is_some() || self.mem_per_cpu_mb.is_some() || self.tmp_disk_mb.is_some() {
            tracing::debug!(
                "constraints: mem {:?} MB, mem_per_cpu {:?} MB, tmp {:?} MB, mincpus {:?}",
                self.mem_mb,
                self.mem_per_cpu_mb,
                self.tmp_disk_mb,
                self.mincpus
            );
        }
        if !self.nodelist_hosts.is_empty() {
            tracing::debug!("nodelist: {:?}", self.nodelist_hosts);
        }
        if !self.exclude_hosts.is_empty() {
            tracing::debug!("exclude: {:?}", self.exclude_hosts);
        }
        if let Some(bind) = &self.cpu_bind {
            tracing::debug!("cpu_bind: {}", bind.to_env_string());
        }
        if let Some(bind) = &self.mem_bind {
            tracing::debug!("mem_bind: {}", bind.to_env_string());
        }
        if let Some(geometry) = &self.geometry {
            tracing::debug!(
                "geometry: {} conn_type {:?} no_rotate {}",
                subrun_parsers::topology::geometry_string(geometry),
                self.conn_type,
                self.no_rotate
            );
        }
    }
}

/// Options for `run` (interactive job-step launch).
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    /// Command and arguments; with `multi_prog` the first element is
    /// the config file instead.
    pub argv: Vec<String>,
    pub multi_prog: bool,
    #[serde(skip)]
    pub prog_table: Option<MultiProg>,
    pub relative: Option<u32>,
    pub hostfile: Option<Utf8PathBuf>,
    pub wait_secs: Option<u32>,
    pub kill_on_bad_exit: bool,
    pub slurmd_debug: Option<u8>,
    pub test_only: bool,
}

impl RunOptions {
    pub fn defaults(progname: &str) -> Self {
        Self {
            common: CommonOptions::defaults(progname),
            argv: Vec::new(),
            multi_prog: false,
            prog_table: None,
            relative: None,
            hostfile: None,
            wait_secs: None,
            kill_on_bad_exit: false,
            slurmd_debug: None,
            test_only: false,
        }
    }

    pub fn dump(&self) {
        self.common.dump();
        tracing::debug!(
            "run: argv {:?} multi_prog {} relative {:?} wait {:?}",
            self.argv,
            self.multi_prog,
            self.relative,
            self.wait_secs
        );
    }
}

/// Options for `batch` (script submission).
#[derive(Debug, Clone, Serialize)]
pub struct BatchOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    pub script: Option<Utf8PathBuf>,
    pub script_args: Vec<String>,
    pub wrap: Option<String>,
    pub requeue: Option<bool>,
    pub nice: Option<i32>,
    pub get_user_env: bool,
    pub test_only: bool,
}

impl BatchOptions {
    pub fn defaults(progname: &str) -> Self {
        Self {
            common: CommonOptions::defaults(progname),
            script: None,
            script_args: Vec::new(),
            wrap: None,
            requeue: None,
            nice: None,
            get_user_env: false,
            test_only: false,
        }
    }

    pub fn dump(&self) {
        self.common.dump();
        tracing::debug!(
            "batch: script {:?} args {:?} wrap {:?} requeue {:?}",
            self.script,
            self.script_args,
            self.wrap,
            self.requeue
        );
    }
}

/// Options for `attach` (reconnect to a running step's I/O).
#[derive(Debug, Clone, Serialize)]
pub struct AttachOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    pub step: Option<StepId>,
    pub label: bool,
    pub layout_only: bool,
    pub pty: bool,
    pub test_only: bool,
}

impl AttachOptions {
    pub fn defaults(progname: &str) -> Self {
        Self {
            common: CommonOptions::defaults(progname),
            step: None,
            label: false,
            layout_only: false,
            pty: false,
            test_only: false,
        }
    }

    pub fn dump(&self) {
        self.common.dump();
        tracing::debug!(
            "attach: step {:?} label {} layout_only {} pty {}",
            self.step,
            self.label,
            self.layout_only,
            self.pty
        );
    }
}

/// Options for `launch` (tasks inside an existing allocation).
#[derive(Debug, Clone, Serialize)]
pub struct LaunchOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    pub argv: Vec<String>,
    pub task_prolog: Option<Utf8PathBuf>,
    pub task_epilog: Option<Utf8PathBuf>,
    pub test_only: bool,
}

impl LaunchOptions {
    pub fn defaults(progname: &str) -> Self {
        Self {
            common: CommonOptions::defaults(progname),
            argv: Vec::new(),
            task_prolog: None,
            task_epilog: None,
            test_only: false,
        }
    }

    pub fn dump(&self) {
        self.common.dump();
        tracing::debug!(
            "launch: jobid {:?} argv {:?} prolog {:?} epilog {:?}",
            self.common.jobid,
            self.argv,
            self.task_prolog,
            self.task_epilog
        );
    }
}
