//! Derived environment export.
//!
//! After verification the resolved options are materialized as
//! `SLURM_*` variables for the spawned job, in the same shapes the
//! task-side consumers re-parse.

use subrun_hostlist::Hostlist;
use subrun_parsers::topology::geometry_string;
use subrun_parsers::Distribution;

use crate::options::CommonOptions;

/// Build the `SLURM_*` environment derived from verified options.
pub fn exported_env(c: &CommonOptions) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = Vec::new();
    let mut set = |name: &str, value: String| env.push((name.to_string(), value));

    set("SLURM_NPROCS", c.ntasks.to_string());
    let nnodes = match c.max_nodes {
        Some(max) if max != c.min_nodes => format!("{}-{}", c.min_nodes, max),
        _ => c.min_nodes.to_string(),
    };
    set("SLURM_NNODES", nnodes);
    if c.cpus_set {
        set("SLURM_CPUS_PER_TASK", c.cpus_per_task.to_string());
    }
    if let Some(per_node) = c.ntasks_per_node {
        set("SLURM_NTASKS_PER_NODE", per_node.to_string());
    }
    if let Some(name) = &c.job_name {
        set("SLURM_JOB_NAME", name.clone());
    }
    if let Some(jobid) = c.jobid {
        set("SLURM_JOBID", jobid.to_string());
    }

    if let Some(dist) = c.distribution {
        set("SLURM_DISTRIBUTION", dist.as_env_str().to_string());
        if dist == Distribution::Plane {
            if let Some(size) = c.plane_size {
                set("SLURM_DIST_PLANESIZE", size.to_string());
            }
        }
    }

    if let Some(bind) = &c.cpu_bind {
        let verbose = if bind.verbose { "verbose" } else { "quiet" };
        set("SLURM_CPU_BIND_VERBOSE", verbose.to_string());
        set("SLURM_CPU_BIND_TYPE", bind.type_str().to_string());
        set("SLURM_CPU_BIND_LIST", bind.list_str().to_string());
        set("SLURM_CPU_BIND", bind.to_env_string());
    }
    if let Some(bind) = &c.mem_bind {
        let verbose = if bind.verbose { "verbose" } else { "quiet" };
        set("SLURM_MEM_BIND_VERBOSE", verbose.to_string());
        set("SLURM_MEM_BIND_TYPE", bind.type_str().to_string());
        set("SLURM_MEM_BIND_LIST", bind.list_str().to_string());
        set("SLURM_MEM_BIND", bind.to_env_string());
    }

    if !c.nodelist_hosts.is_empty() {
        let list = Hostlist::from_hosts(c.nodelist_hosts.clone());
        set("SLURM_NODELIST", list.ranged_string());
    }
    if !c.exclude_hosts.is_empty() {
        let list = Hostlist::from_hosts(c.exclude_hosts.clone());
        set("SLURM_EXCLUDE", list.ranged_string());
    }

    if let Some(geometry) = &c.geometry {
        set("SLURM_GEOMETRY", geometry_string(geometry));
    }
    if let Some(conn) = c.conn_type {
        set("SLURM_CONN_TYPE", conn.to_string());
    }
    if c.overcommit {
        set("SLURM_OVERCOMMIT", "1".to_string());
    }
    if c.labelio {
        set("SLURM_LABELIO", "1".to_string());
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use subrun_parsers::{parse_cpu_bind, parse_distribution};

    fn get<'a>(env: &'a [(String, String)], name: &str) -> Option<&'a str> {
        env.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_basic_export() {
        let mut opts = CommonOptions::defaults("run");
        opts.ntasks = 8;
        opts.min_nodes = 2;
        opts.max_nodes = Some(4);
        opts.job_name = Some("sim".to_string());

        let env = exported_env(&opts);
        assert_eq!(get(&env, "SLURM_NPROCS"), Some("8"));
        assert_eq!(get(&env, "SLURM_NNODES"), Some("2-4"));
        assert_eq!(get(&env, "SLURM_JOB_NAME"), Some("sim"));
        assert_eq!(get(&env, "SLURM_DISTRIBUTION"), None);
    }

    #[test]
    fn test_distribution_and_plane() {
        let mut opts = CommonOptions::defaults("run");
        let (dist, size) = parse_distribution("plane=4").unwrap();
        opts.distribution = Some(dist);
        opts.plane_size = size;

        let env = exported_env(&opts);
        assert_eq!(get(&env, "SLURM_DISTRIBUTION"), Some("plane"));
        assert_eq!(get(&env, "SLURM_DIST_PLANESIZE"), Some("4"));
    }

    #[test]
    fn test_cpu_bind_quartet() {
        let mut opts = CommonOptions::defaults("run");
        opts.cpu_bind = Some(parse_cpu_bind("v,map_cpu:0,2").unwrap());

        let env = exported_env(&opts);
        assert_eq!(get(&env, "SLURM_CPU_BIND_VERBOSE"), Some("verbose"));
        assert_eq!(get(&env, "SLURM_CPU_BIND_TYPE"), Some("map_cpu:"));
        assert_eq!(get(&env, "SLURM_CPU_BIND_LIST"), Some("0,2"));
        assert_eq!(get(&env, "SLURM_CPU_BIND"), Some("verbose,map_cpu:0,2"));
    }

    #[test]
    fn test_nodelist_ranged() {
        let mut opts = CommonOptions::defaults("run");
        opts.nodelist_hosts = vec!["n1".into(), "n2".into(), "n3".into()];

        let env = exported_env(&opts);
        assert_eq!(get(&env, "SLURM_NODELIST"), Some("n[1-3]"));
    }
}
