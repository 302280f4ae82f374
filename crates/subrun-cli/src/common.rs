//! Flags shared by the job-submitting commands.

use camino::Utf8PathBuf;
use chrono::Local;
use clap::{ArgAction, Args};
use subrun_core::{CommonOptions, IoRedirect, OptionsError};
use subrun_parsers::{
    parse_begin_time, parse_cpu_bind, parse_conn_type, parse_distribution, parse_geometry,
    parse_mem_bind, parse_node_range, parse_size_mb, parse_time_limit, ConnType, CpuBind,
    Distribution, MemBind, ParseError, TimeLimit,
};

/// A `--distribution` value: the policy plus an embedded plane size.
#[derive(Debug, Clone)]
pub struct DistSpec {
    pub dist: Distribution,
    pub plane_size: Option<u32>,
}

fn dist_spec(s: &str) -> Result<DistSpec, ParseError> {
    parse_distribution(s).map(|(dist, plane_size)| DistSpec { dist, plane_size })
}

#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Number of tasks to run
    #[arg(short = 'n', long, value_name = "N")]
    pub ntasks: Option<u32>,

    /// Number of CPUs required per task
    #[arg(short = 'c', long, value_name = "N")]
    pub cpus_per_task: Option<u32>,

    /// Number of nodes on which to run
    #[arg(short = 'N', long, value_name = "MIN[-MAX]", value_parser = parse_node_range)]
    pub nodes: Option<(u32, Option<u32>)>,

    /// Number of tasks to invoke on each node
    #[arg(long, value_name = "N")]
    pub ntasks_per_node: Option<u32>,

    #[arg(long, value_name = "N", hide_short_help = true)]
    pub sockets_per_node: Option<u32>,

    #[arg(long, value_name = "N", hide_short_help = true)]
    pub cores_per_socket: Option<u32>,

    #[arg(long, value_name = "N", hide_short_help = true)]
    pub threads_per_core: Option<u32>,

    /// Distribution method for tasks (block|cyclic|arbitrary|plane=<size>)
    #[arg(short = 'm', long, value_name = "TYPE", value_parser = dist_spec)]
    pub distribution: Option<DistSpec>,

    /// Name of the job
    #[arg(short = 'J', long, value_name = "NAME")]
    pub job_name: Option<String>,

    /// Partition requested
    #[arg(short = 'p', long, value_name = "PARTITION")]
    pub partition: Option<String>,

    /// Time limit (minutes, hh:mm:ss or d-hh:mm:ss)
    #[arg(short = 't', long = "time", value_name = "LIMIT", value_parser = parse_time_limit)]
    pub time_limit: Option<TimeLimit>,

    /// Working directory for the job
    #[arg(short = 'D', long, value_name = "PATH")]
    pub chdir: Option<Utf8PathBuf>,

    /// Real memory required per node (with optional K/M/G/T suffix)
    #[arg(long, value_name = "SIZE", value_parser = parse_size_mb)]
    pub mem: Option<u64>,

    /// Memory required per allocated CPU
    #[arg(long, value_name = "SIZE", value_parser = parse_size_mb)]
    pub mem_per_cpu: Option<u64>,

    /// Temporary disk space required per node
    #[arg(long = "tmp", value_name = "SIZE", value_parser = parse_size_mb)]
    pub tmp_disk: Option<u64>,

    /// Minimum number of CPUs per node
    #[arg(long, value_name = "N")]
    pub mincpus: Option<u32>,

    /// Request specific hosts (hostlist expression)
    #[arg(short = 'w', long, value_name = "HOSTS")]
    pub nodelist: Option<String>,

    /// Exclude specific hosts
    #[arg(short = 'x', long, value_name = "HOSTS")]
    pub exclude: Option<String>,

    /// Node feature constraint expression
    #[arg(short = 'C', long, value_name = "LIST")]
    pub constraint: Option<String>,

    /// Defer start until this time (now+60, HH:MM, YYYY-MM-DD...)
    #[arg(short = 'b', long, value_name = "TIME")]
    pub begin: Option<String>,

    /// Defer start until another job completes
    #[arg(short = 'd', long, value_name = "JOBID")]
    pub dependency: Option<String>,

    /// Quality of service
    #[arg(long, value_name = "QOS")]
    pub qos: Option<String>,

    /// Allocate resources from this reservation
    #[arg(long, value_name = "NAME")]
    pub reservation: Option<String>,

    /// Account charged for the job
    #[arg(short = 'A', long, value_name = "ACCOUNT")]
    pub account: Option<String>,

    /// Checkpoint interval
    #[arg(long = "checkpoint", value_name = "INTERVAL", value_parser = parse_time_limit)]
    pub ckpt_interval: Option<TimeLimit>,

    /// Node geometry (XxYxZ)
    #[arg(long, value_name = "GEOMETRY", value_parser = parse_geometry, hide_short_help = true)]
    pub geometry: Option<[u16; 3]>,

    /// Node connection type (mesh|torus|nav)
    #[arg(long, value_name = "TYPE", value_parser = parse_conn_type, hide_short_help = true)]
    pub conn_type: Option<ConnType>,

    /// Disallow rotation of the geometry
    #[arg(short = 'R', long, hide_short_help = true)]
    pub no_rotate: bool,

    /// CPU binding (none|rank|map_cpu:<list>|mask_cpu:<list>|...)
    #[arg(long = "cpu-bind", alias = "cpu_bind", value_name = "SPEC", value_parser = parse_cpu_bind)]
    pub cpu_bind: Option<CpuBind>,

    /// Memory binding (none|rank|local|map_mem:<list>|mask_mem:<list>)
    #[arg(long = "mem-bind", alias = "mem_bind", value_name = "SPEC", value_parser = parse_mem_bind)]
    pub mem_bind: Option<MemBind>,

    /// Where stdin comes from (all|none|<taskid>|<file>)
    #[arg(short = 'i', long, value_name = "MODE")]
    pub input: Option<String>,

    /// Where stdout goes
    #[arg(short = 'o', long, value_name = "MODE")]
    pub output: Option<String>,

    /// Where stderr goes
    #[arg(short = 'e', long, value_name = "MODE")]
    pub error: Option<String>,

    /// Prepend the task id to every output line
    #[arg(short = 'l', long = "label")]
    pub labelio: bool,

    /// Do not line-buffer task output
    #[arg(short = 'u', long)]
    pub unbuffered: bool,

    /// Overcommit resources
    #[arg(short = 'O', long)]
    pub overcommit: bool,

    /// Submit in a held state
    #[arg(short = 'H', long)]
    pub hold: bool,

    /// Share nodes with other jobs
    #[arg(short = 's', long)]
    pub share: bool,

    /// Exit instead of waiting if resources are not available
    #[arg(short = 'I', long)]
    pub immediate: bool,

    /// Run under an already-allocated job
    #[arg(long, value_name = "JOBID")]
    pub jobid: Option<u32>,

    /// Increase verbosity (repeatable)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short = 'Q', long)]
    pub quiet: bool,
}

impl CommonArgs {
    /// The command-line overlay pass: copy every flag the user gave
    /// onto the options, leaving the rest untouched.
    pub fn apply(&self, c: &mut CommonOptions) -> Result<(), OptionsError> {
        if let Some(ntasks) = self.ntasks {
            c.ntasks = ntasks;
            c.ntasks_set = true;
        }
        if let Some(cpus) = self.cpus_per_task {
            c.cpus_per_task = cpus;
            c.cpus_set = true;
        }
        if let Some((min, max)) = self.nodes {
            c.min_nodes = min;
            c.max_nodes = max;
            c.nodes_set = true;
        }
        if let Some(per_node) = self.ntasks_per_node {
            c.ntasks_per_node = Some(per_node);
        }
        if let Some(sockets) = self.sockets_per_node {
            c.sockets_per_node = Some(sockets);
        }
        if let Some(cores) = self.cores_per_socket {
            c.cores_per_socket = Some(cores);
        }
        if let Some(threads) = self.threads_per_core {
            c.threads_per_core = Some(threads);
        }
        if let Some(spec) = &self.distribution {
            c.distribution = Some(spec.dist);
            if spec.plane_size.is_some() {
                c.plane_size = spec.plane_size;
            }
        }
        if let Some(name) = &self.job_name {
            c.job_name = Some(name.clone());
        }
        if let Some(partition) = &self.partition {
            c.partition = Some(partition.clone());
        }
        if let Some(limit) = self.time_limit {
            c.time_limit = Some(limit);
        }
        if let Some(dir) = &self.chdir {
            c.cwd = dir.clone();
        }
        if let Some(mem) = self.mem {
            c.mem_mb = Some(mem);
        }
        if let Some(mem) = self.mem_per_cpu {
            c.mem_per_cpu_mb = Some(mem);
        }
        if let Some(tmp) = self.tmp_disk {
            c.tmp_disk_mb = Some(tmp);
        }
        if let Some(mincpus) = self.mincpus {
            c.mincpus = Some(mincpus);
        }
        if let Some(nodelist) = &self.nodelist {
            c.nodelist = Some(nodelist.clone());
        }
        if let Some(exclude) = &self.exclude {
            c.exclude = Some(exclude.clone());
        }
        if let Some(constraint) = &self.constraint {
            c.constraint = Some(constraint.clone());
        }
        if let Some(begin) = &self.begin {
            c.begin = Some(parse_begin_time(begin, Local::now().naive_local())?);
        }
        if let Some(dependency) = &self.dependency {
            c.dependency = Some(dependency.clone());
        }
        if let Some(qos) = &self.qos {
            c.qos = Some(qos.clone());
        }
        if let Some(reservation) = &self.reservation {
            c.reservation = Some(reservation.clone());
        }
        if let Some(account) = &self.account {
            c.account = Some(account.clone());
        }
        if let Some(interval) = self.ckpt_interval {
            c.ckpt_interval_min = interval.as_minutes();
        }
        if let Some(geometry) = self.geometry {
            c.geometry = Some(geometry);
        }
        if let Some(conn) = self.conn_type {
            c.conn_type = Some(conn);
        }
        if self.no_rotate {
            c.no_rotate = true;
        }
        if let Some(bind) = &self.cpu_bind {
            c.cpu_bind = Some(bind.clone());
        }
        if let Some(bind) = &self.mem_bind {
            c.mem_bind = Some(bind.clone());
        }
        if let Some(input) = &self.input {
            c.input = Some(IoRedirect::parse(input));
        }
        if let Some(output) = &self.output {
            c.output = Some(IoRedirect::parse(output));
        }
        if let Some(error) = &self.error {
            c.error = Some(IoRedirect::parse(error));
        }
        if self.labelio {
            c.labelio = true;
        }
        if self.unbuffered {
            c.unbuffered = true;
        }
        if self.overcommit {
            c.overcommit = true;
        }
        if self.hold {
            c.hold = true;
        }
        if self.share {
            c.share = true;
        }
        if self.immediate {
            c.immediate = true;
        }
        if let Some(jobid) = self.jobid {
            c.jobid = Some(jobid);
        }
        if self.verbose > 0 {
            c.verbose = self.verbose;
        }
        if self.quiet {
            c.quiet = true;
        }
        Ok(())
    }
}
