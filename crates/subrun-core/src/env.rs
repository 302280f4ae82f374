//! Environment-variable overlay.
//!
//! Each command has a table of recognized variables, applied between
//! the compiled defaults and the command line. The tables act on an
//! injected snapshot of the environment so the overlay is testable.

use camino::Utf8PathBuf;
use std::collections::HashMap;
use subrun_parsers::{
    non_empty_string, parse_bool, parse_conn_type, parse_cpu_bind, parse_distribution,
    parse_geometry, parse_mem_bind, parse_node_range, parse_size_mb, parse_time_limit, ParseError,
};

use crate::error::OptionsError;
use crate::options::{
    AttachOptions, BatchOptions, CommonOptions, IoRedirect, LaunchOptions, RunOptions,
};

/// Snapshot of the process environment.
pub type Env = HashMap<String, String>;

/// Capture the live environment.
pub fn env_snapshot() -> Env {
    std::env::vars().collect()
}

/// What a recognized variable sets on [`CommonOptions`].
#[derive(Debug, Clone, Copy)]
enum Setter {
    Ntasks,
    CpusPerTask,
    Nodes,
    NtasksPerNode,
    Distribution,
    PlaneSize,
    CpuBind,
    MemBind,
    Partition,
    TimeLimit,
    JobName,
    JobId,
    Account,
    Dependency,
    Exclude,
    Geometry,
    ConnType,
    NoRotate,
    Immediate,
    Overcommit,
    LabelIo,
    Unbuffered,
    StdinMode,
    StdoutMode,
    StderrMode,
    Debug,
    Mem,
    MemPerCpu,
    TmpDisk,
}

struct EnvVar {
    name: &'static str,
    /// Fallback variable consulted when `name` is unset.
    alt: Option<&'static str>,
    setter: Setter,
}

const fn var(name: &'static str, setter: Setter) -> EnvVar {
    EnvVar {
        name,
        alt: None,
        setter,
    }
}

const fn var2(name: &'static str, alt: &'static str, setter: Setter) -> EnvVar {
    EnvVar {
        name,
        alt: Some(alt),
        setter,
    }
}

const RUN_ENV: &[EnvVar] = &[
    var("SLURM_NPROCS", Setter::Ntasks),
    var("SLURM_CPUS_PER_TASK", Setter::CpusPerTask),
    var("SLURM_NNODES", Setter::Nodes),
    var("SLURM_NTASKS_PER_NODE", Setter::NtasksPerNode),
    var("SLURM_DISTRIBUTION", Setter::Distribution),
    var("SLURM_DIST_PLANESIZE", Setter::PlaneSize),
    var("SLURM_CPU_BIND", Setter::CpuBind),
    var("SLURM_MEM_BIND", Setter::MemBind),
    var("SLURM_PARTITION", Setter::Partition),
    var("SLURM_TIMELIMIT", Setter::TimeLimit),
    var("SLURM_JOB_NAME", Setter::JobName),
    var("SLURM_JOBID", Setter::JobId),
    var("SLURM_ACCOUNT", Setter::Account),
    var("SLURM_DEPENDENCY", Setter::Dependency),
    var("SLURM_EXCLUDE", Setter::Exclude),
    var("SLURM_GEOMETRY", Setter::Geometry),
    var("SLURM_CONN_TYPE", Setter::ConnType),
    var("SLURM_NO_ROTATE", Setter::NoRotate),
    var("SLURM_IMMEDIATE", Setter::Immediate),
    var("SLURM_OVERCOMMIT", Setter::Overcommit),
    var("SLURM_LABELIO", Setter::LabelIo),
    var("SLURM_UNBUFFEREDIO", Setter::Unbuffered),
    var("SLURM_STDINMODE", Setter::StdinMode),
    var("SLURM_STDOUTMODE", Setter::StdoutMode),
    var("SLURM_STDERRMODE", Setter::StderrMode),
    var("SLURM_DEBUG", Setter::Debug),
    var("SLURM_MEM_PER_NODE", Setter::Mem),
    var("SLURM_MEM_PER_CPU", Setter::MemPerCpu),
    var("SLURM_TMP_DISK", Setter::TmpDisk),
];

const BATCH_ENV: &[EnvVar] = &[
    var2("SBATCH_NTASKS", "SLURM_NPROCS", Setter::Ntasks),
    var2("SBATCH_CPUS_PER_TASK", "SLURM_CPUS_PER_TASK", Setter::CpusPerTask),
    var2("SBATCH_NNODES", "SLURM_NNODES", Setter::Nodes),
    var2("SBATCH_DISTRIBUTION", "SLURM_DISTRIBUTION", Setter::Distribution),
    var2("SBATCH_PARTITION", "SLURM_PARTITION", Setter::Partition),
    var2("SBATCH_TIMELIMIT", "SLURM_TIMELIMIT", Setter::TimeLimit),
    var2("SBATCH_JOB_NAME", "SLURM_JOB_NAME", Setter::JobName),
    var2("SBATCH_JOBID", "SLURM_JOBID", Setter::JobId),
    var2("SBATCH_ACCOUNT", "SLURM_ACCOUNT", Setter::Account),
    var("SBATCH_DEPENDENCY", Setter::Dependency),
    var("SBATCH_EXCLUDE", Setter::Exclude),
    var("SBATCH_GEOMETRY", Setter::Geometry),
    var("SBATCH_CONN_TYPE", Setter::ConnType),
    var("SBATCH_NO_ROTATE", Setter::NoRotate),
    var("SBATCH_IMMEDIATE", Setter::Immediate),
    var("SBATCH_OVERCOMMIT", Setter::Overcommit),
    var("SBATCH_DEBUG", Setter::Debug),
];

const LAUNCH_ENV: &[EnvVar] = &[
    var("SLAUNCH_NPROCS", Setter::Ntasks),
    var("SLAUNCH_CPUS_PER_TASK", Setter::CpusPerTask),
    var("SLAUNCH_NNODES", Setter::Nodes),
    var("SLAUNCH_DISTRIBUTION", Setter::Distribution),
    var("SLAUNCH_DIST_PLANESIZE", Setter::PlaneSize),
    var("SLAUNCH_CPU_BIND", Setter::CpuBind),
    var("SLAUNCH_MEM_BIND", Setter::MemBind),
    var("SLAUNCH_PARTITION", Setter::Partition),
    var("SLAUNCH_JOBID", Setter::JobId),
    var("SLAUNCH_LABELIO", Setter::LabelIo),
    var("SLAUNCH_UNBUFFEREDIO", Setter::Unbuffered),
    var("SLAUNCH_STDINMODE", Setter::StdinMode),
    var("SLAUNCH_STDOUTMODE", Setter::StdoutMode),
    var("SLAUNCH_STDERRMODE", Setter::StderrMode),
    var("SLAUNCH_DEBUG", Setter::Debug),
];

fn apply_table(
    table: &[EnvVar],
    env: &Env,
    opts: &mut CommonOptions,
) -> Result<(), OptionsError> {
    for entry in table {
        let raw = env
            .get(entry.name)
            .or_else(|| entry.alt.and_then(|alt| env.get(alt)));
        let Some(raw) = raw else { continue };
        apply_one(entry.setter, raw, opts)
            .map_err(|source| OptionsError::Env {
                var: entry.name,
                source,
            })?;
    }
    Ok(())
}

fn apply_one(setter: Setter, raw: &str, opts: &mut CommonOptions) -> Result<(), ParseError> {
    match setter {
        Setter::Ntasks => {
            opts.ntasks = raw.parse().map_err(|_| ParseError::new("task count", raw))?;
            opts.ntasks_set = true;
        }
        Setter::CpusPerTask => {
            opts.cpus_per_task = raw
                .parse()
                .map_err(|_| ParseError::new("cpu count", raw))?;
            opts.cpus_set = true;
        }
        Setter::Nodes => {
            let (min, max) = parse_node_range(raw)?;
            opts.min_nodes = min;
            opts.max_nodes = max;
            opts.nodes_set = true;
        }
        Setter::NtasksPerNode => {
            opts.ntasks_per_node =
                Some(raw.parse().map_err(|_| ParseError::new("task count", raw))?);
        }
        Setter::Distribution => {
            let (dist, plane_size) = parse_distribution(raw)?;
            opts.distribution = Some(dist);
            if plane_size.is_some() {
                opts.plane_size = plane_size;
            }
        }
        Setter::PlaneSize => {
            let size: u32 = raw
                .parse()
                .map_err(|_| ParseError::new("plane size", raw))?;
            if size == 0 {
                return Err(ParseError::new("plane size", raw));
            }
            opts.plane_size = Some(size);
        }
        Setter::CpuBind => opts.cpu_bind = Some(parse_cpu_bind(raw)?),
        Setter::MemBind => opts.mem_bind = Some(parse_mem_bind(raw)?),
        // an exported-but-empty string variable never clobbers an
        // earlier pass
        Setter::Partition => {
            if let Some(partition) = non_empty_string(raw) {
                opts.partition = Some(partition);
            }
        }
        Setter::TimeLimit => opts.time_limit = Some(parse_time_limit(raw)?),
        Setter::JobName => {
            if let Some(name) = non_empty_string(raw) {
                opts.job_name = Some(name);
            }
        }
        Setter::JobId => {
            opts.jobid = Some(raw.parse().map_err(|_| ParseError::new("job id", raw))?);
        }
        Setter::Account => {
            if let Some(account) = non_empty_string(raw) {
                opts.account = Some(account);
            }
        }
        Setter::Dependency => {
            if let Some(dependency) = non_empty_string(raw) {
                opts.dependency = Some(dependency);
            }
        }
        Setter::Exclude => {
            if let Some(exclude) = non_empty_string(raw) {
                opts.exclude = Some(exclude);
            }
        }
        Setter::Geometry => opts.geometry = Some(parse_geometry(raw)?),
        Setter::ConnType => opts.conn_type = Some(parse_conn_type(raw)?),
        Setter::NoRotate => opts.no_rotate = parse_bool(raw)?,
        Setter::Immediate => opts.immediate = parse_bool(raw)?,
        Setter::Overcommit => opts.overcommit = parse_bool(raw)?,
        Setter::LabelIo => opts.labelio = parse_bool(raw)?,
        Setter::Unbuffered => opts.unbuffered = parse_bool(raw)?,
        Setter::StdinMode => opts.input = Some(IoRedirect::parse(raw)),
        Setter::StdoutMode => opts.output = Some(IoRedirect::parse(raw)),
        Setter::StderrMode => opts.error = Some(IoRedirect::parse(raw)),
        Setter::Debug => {
            opts.verbose = raw
                .parse()
                .map_err(|_| ParseError::new("debug level", raw))?;
        }
        Setter::Mem => opts.mem_mb = Some(parse_size_mb(raw)?),
        Setter::MemPerCpu => opts.mem_per_cpu_mb = Some(parse_size_mb(raw)?),
        Setter::TmpDisk => opts.tmp_disk_mb = Some(parse_size_mb(raw)?),
    }
    Ok(())
}

impl RunOptions {
    /// Overlay `SLURM_*` variables onto the defaults.
    pub fn apply_env(&mut self, env: &Env) -> Result<(), OptionsError> {
        apply_table(RUN_ENV, env, &mut self.common)?;
        if let Some(hostfile) = env.get("SLURM_HOSTFILE") {
            self.hostfile = Some(Utf8PathBuf::from(hostfile));
        }
        if let Some(wait) = env.get("SLURM_WAIT") {
            self.wait_secs = Some(
                wait.parse()
                    .map_err(|_| OptionsError::Env {
                        var: "SLURM_WAIT",
                        source: ParseError::new("wait seconds", wait),
                    })?,
            );
        }
        Ok(())
    }
}

impl BatchOptions {
    /// Overlay `SBATCH_*` variables (with `SLURM_*` fallbacks for the
    /// historically shared names).
    pub fn apply_env(&mut self, env: &Env) -> Result<(), OptionsError> {
        apply_table(BATCH_ENV, env, &mut self.common)
    }
}

impl AttachOptions {
    /// Attach recognizes no environment variables; the pass exists so
    /// every command shares the same lifecycle.
    pub fn apply_env(&mut self, _env: &Env) -> Result<(), OptionsError> {
        Ok(())
    }
}

impl LaunchOptions {
    /// Overlay `SLAUNCH_*` variables onto the defaults.
    pub fn apply_env(&mut self, env: &Env) -> Result<(), OptionsError> {
        apply_table(LAUNCH_ENV, env, &mut self.common)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subrun_parsers::{CpuBindMode, Distribution, TimeLimit};

    fn env(pairs: &[(&str, &str)]) -> Env {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_run_env_overlay() {
        let mut opts = RunOptions::defaults("run");
        let env = env(&[
            ("SLURM_NPROCS", "8"),
            ("SLURM_NNODES", "2-4"),
            ("SLURM_DISTRIBUTION", "cyclic"),
            ("SLURM_CPU_BIND", "v,map_cpu:0,1"),
            ("SLURM_TIMELIMIT", "1:30:00"),
            ("SLURM_STDOUTMODE", "out-%t.txt"),
            ("IRRELEVANT", "junk"),
        ]);
        opts.apply_env(&env).unwrap();

        assert_eq!(opts.common.ntasks, 8);
        assert!(opts.common.ntasks_set);
        assert_eq!(opts.common.min_nodes, 2);
        assert_eq!(opts.common.max_nodes, Some(4));
        assert_eq!(opts.common.distribution, Some(Distribution::Cyclic));
        let bind = opts.common.cpu_bind.as_ref().unwrap();
        assert_eq!(bind.mode, Some(CpuBindMode::MapCpu));
        assert!(bind.verbose);
        assert_eq!(opts.common.time_limit, Some(TimeLimit::Minutes(90)));
        assert_eq!(
            opts.common.output,
            Some(IoRedirect::File("out-%t.txt".to_string()))
        );
    }

    #[test]
    fn test_run_env_invalid_value() {
        let mut opts = RunOptions::defaults("run");
        let env = env(&[("SLURM_NPROCS", "many")]);
        let err = opts.apply_env(&env).unwrap_err();
        assert!(matches!(
            err,
            OptionsError::Env {
                var: "SLURM_NPROCS",
                ..
            }
        ));
    }

    #[test]
    fn test_batch_env_fallback() {
        let mut opts = BatchOptions::defaults("batch");
        let e = env(&[("SLURM_PARTITION", "debug")]);
        opts.apply_env(&e).unwrap();
        assert_eq!(opts.common.partition.as_deref(), Some("debug"));

        // SBATCH_* wins over the SLURM_* fallback
        let mut opts = BatchOptions::defaults("batch");
        let e = env(&[
            ("SBATCH_PARTITION", "batch"),
            ("SLURM_PARTITION", "debug"),
        ]);
        opts.apply_env(&e).unwrap();
        assert_eq!(opts.common.partition.as_deref(), Some("batch"));
    }

    #[test]
    fn test_launch_env_prefix() {
        let mut opts = LaunchOptions::defaults("launch");
        let env = env(&[
            ("SLAUNCH_JOBID", "42"),
            ("SLURM_NPROCS", "99"), // wrong prefix, ignored
        ]);
        opts.apply_env(&env).unwrap();
        assert_eq!(opts.common.jobid, Some(42));
        assert_eq!(opts.common.ntasks, 1);
    }

    #[test]
    fn test_empty_string_value_ignored() {
        let mut opts = RunOptions::defaults("run");
        opts.common.partition = Some("debug".to_string());
        let env = env(&[("SLURM_PARTITION", "")]);
        opts.apply_env(&env).unwrap();
        assert_eq!(opts.common.partition.as_deref(), Some("debug"));
    }

    #[test]
    fn test_plane_size_from_distribution() {
        let mut opts = RunOptions::defaults("run");
        let env = env(&[("SLURM_DISTRIBUTION", "plane=4")]);
        opts.apply_env(&env).unwrap();
        assert_eq!(opts.common.distribution, Some(Distribution::Plane));
        assert_eq!(opts.common.plane_size, Some(4));
    }

    #[test]
    fn test_hostfile_env() {
        let mut opts = RunOptions::defaults("run");
        let env = env(&[("SLURM_HOSTFILE", "/tmp/hosts")]);
        opts.apply_env(&env).unwrap();
        assert_eq!(
            opts.hostfile.as_deref(),
            Some(camino::Utf8Path::new("/tmp/hosts"))
        );
    }
}
