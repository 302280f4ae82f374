//! Post-parse verification and derivation.

use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use subrun_hostlist::{read_hostfile, Hostlist};
use subrun_parsers::{CpuBindMode, Distribution, MemBindMode};

use crate::error::OptionsError;
use crate::multiprog::MultiProg;
use crate::options::{AttachOptions, BatchOptions, CommonOptions, LaunchOptions, RunOptions};
use crate::path::{fullpath, search_path};

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn verify_common(c: &mut CommonOptions, now: NaiveDateTime) -> Result<(), OptionsError> {
    if c.quiet && c.verbose > 0 {
        return Err(OptionsError::QuietVerbose);
    }
    if c.mem_mb.is_some() && c.mem_per_cpu_mb.is_some() {
        return Err(OptionsError::MemConflict);
    }

    match (c.distribution, c.plane_size) {
        (Some(Distribution::Plane), None) => return Err(OptionsError::PlaneSizeMissing),
        (dist, Some(_)) if dist != Some(Distribution::Plane) => {
            let name = dist
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unset".to_string());
            return Err(OptionsError::PlaneSizeUnused(name));
        }
        _ => {}
    }

    if let Some(bind) = &c.cpu_bind {
        let needs_list = matches!(bind.mode, Some(CpuBindMode::MapCpu | CpuBindMode::MaskCpu));
        if needs_list && bind.list.is_none() {
            return Err(OptionsError::BindListMissing("cpu"));
        }
    }
    if let Some(bind) = &c.mem_bind {
        let needs_list = matches!(bind.mode, Some(MemBindMode::MapMem | MemBindMode::MaskMem));
        if needs_list && bind.list.is_none() {
            return Err(OptionsError::BindListMissing("memory"));
        }
    }

    // Arbitrary distribution lists one host per task, repeats allowed;
    // every other distribution wants each node once.
    let arbitrary = c.distribution == Some(Distribution::Arbitrary);
    if c.nodelist_hosts.is_empty() {
        if let Some(expr) = &c.nodelist {
            let mut list = Hostlist::parse(expr)?;
            if !arbitrary {
                list.uniq();
            }
            c.nodelist_hosts = list.hosts().to_vec();
        }
    }
    if let Some(expr) = &c.exclude {
        let mut list = Hostlist::parse(expr)?;
        list.uniq();
        c.exclude_hosts = list.hosts().to_vec();
    }
    for host in &c.nodelist_hosts {
        if c.exclude_hosts.contains(host) {
            return Err(OptionsError::NodeOverlap(host.clone()));
        }
    }

    if !c.nodelist_hosts.is_empty() && !c.nodes_set {
        let unique: HashSet<&String> = c.nodelist_hosts.iter().collect();
        c.min_nodes = unique.len() as u32;
        c.nodes_set = true;
    }

    if !c.ntasks_set && c.nodes_set {
        c.ntasks = c.min_nodes;
    } else if c.ntasks_set && c.nodes_set && c.ntasks < c.min_nodes {
        tracing::warn!(
            "requested {} nodes for {} tasks, using {} nodes instead",
            c.min_nodes,
            c.ntasks,
            c.ntasks
        );
        c.min_nodes = c.ntasks;
    }

    if arbitrary && c.nodelist_hosts.len() != c.ntasks as usize {
        return Err(OptionsError::ArbitraryTaskCount {
            ntasks: c.ntasks,
            hosts: c.nodelist_hosts.len(),
        });
    }

    if let Some(begin) = c.begin {
        if begin < now {
            return Err(OptionsError::BeginInPast(begin));
        }
    }

    Ok(())
}

impl RunOptions {
    pub fn verify(&mut self) -> Result<(), OptionsError> {
        self.verify_at(Local::now().naive_local())
    }

    pub fn verify_at(&mut self, now: NaiveDateTime) -> Result<(), OptionsError> {
        if self.argv.is_empty() {
            return Err(OptionsError::NoCommand);
        }

        // A hostfile feeds the nodelist, typically for arbitrary
        // distribution; an explicit --nodelist wins.
        if let Some(hostfile) = &self.hostfile {
            if self.common.nodelist.is_none() && self.common.nodelist_hosts.is_empty() {
                let list = read_hostfile(hostfile)?;
                self.common.nodelist_hosts = list.hosts().to_vec();
            }
        }

        verify_common(&mut self.common, now)?;

        if self.common.job_name.is_none() {
            self.common.job_name = Some(basename(&self.argv[0]));
        }

        if self.multi_prog {
            let config = fullpath(&self.argv[0], &self.common.cwd);
            let mut table = MultiProg::load(&config)?;
            table.validate(self.common.ntasks, &self.common.cwd)?;
            self.prog_table = Some(table);
        } else {
            let resolved = search_path(&self.common.cwd, &self.argv[0], false)
                .ok_or_else(|| OptionsError::ExecNotFound(self.argv[0].clone()))?;
            self.argv[0] = resolved.into_string();
        }
        Ok(())
    }
}

impl BatchOptions {
    pub fn verify(&mut self) -> Result<(), OptionsError> {
        self.verify_at(Local::now().naive_local())
    }

    pub fn verify_at(&mut self, now: NaiveDateTime) -> Result<(), OptionsError> {
        match (&self.script, &self.wrap) {
            (None, None) => return Err(OptionsError::MissingScript),
            (Some(_), Some(_)) => return Err(OptionsError::ScriptAndWrap),
            _ => {}
        }

        if let Some(script) = self.script.take() {
            let full = fullpath(script.as_str(), &self.common.cwd);
            let readable = std::fs::metadata(&full)
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !readable {
                return Err(OptionsError::ScriptUnreadable(full.into_string()));
            }
            if self.common.job_name.is_none() {
                self.common.job_name = Some(basename(full.as_str()));
            }
            self.script = Some(full);
        } else if self.common.job_name.is_none() {
            self.common.job_name = Some("wrap".to_string());
        }

        verify_common(&mut self.common, now)
    }
}

impl AttachOptions {
    pub fn verify(&mut self) -> Result<(), OptionsError> {
        self.verify_at(Local::now().naive_local())
    }

    pub fn verify_at(&mut self, now: NaiveDateTime) -> Result<(), OptionsError> {
        if self.step.is_none() {
            return Err(OptionsError::MissingStep);
        }
        verify_common(&mut self.common, now)
    }
}

impl LaunchOptions {
    pub fn verify(&mut self) -> Result<(), OptionsError> {
        self.verify_at(Local::now().naive_local())
    }

    pub fn verify_at(&mut self, now: NaiveDateTime) -> Result<(), OptionsError> {
        if self.argv.is_empty() {
            return Err(OptionsError::NoCommand);
        }
        if self.common.jobid.is_none() {
            return Err(OptionsError::MissingJobId);
        }

        verify_common(&mut self.common, now)?;

        if self.common.job_name.is_none() {
            self.common.job_name = Some(basename(&self.argv[0]));
        }
        let resolved = search_path(&self.common.cwd, &self.argv[0], false)
            .ok_or_else(|| OptionsError::ExecNotFound(self.argv[0].clone()))?;
        self.argv[0] = resolved.into_string();

        for script in [&self.task_prolog, &self.task_epilog].into_iter().flatten() {
            let full = fullpath(script.as_str(), &self.common.cwd);
            let readable = std::fs::metadata(&full)
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !readable {
                return Err(OptionsError::ScriptUnreadable(full.into_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use chrono::NaiveDate;
    use std::os::unix::fs::OpenOptionsExt;
    use subrun_parsers::parse_distribution;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 3, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn run_opts(tmp: &tempfile::TempDir) -> RunOptions {
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .mode(0o755)
            .open(dir.join("tool"))
            .unwrap();
        let mut opts = RunOptions::defaults("run");
        opts.common.cwd = dir.to_path_buf();
        opts.argv = vec!["./tool".to_string()];
        opts
    }

    #[test]
    fn test_run_verify_resolves_command_and_job_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.verify_at(now()).unwrap();

        assert!(opts.argv[0].starts_with('/'));
        assert_eq!(opts.common.job_name.as_deref(), Some("tool"));
    }

    #[test]
    fn test_run_verify_missing_command() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.argv = vec!["no-such-program".to_string()];
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::ExecNotFound(_))
        ));

        opts.argv.clear();
        assert!(matches!(opts.verify_at(now()), Err(OptionsError::NoCommand)));
    }

    #[test]
    fn test_mem_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.mem_mb = Some(1024);
        opts.common.mem_per_cpu_mb = Some(512);
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::MemConflict)
        ));
    }

    #[test]
    fn test_plane_size_checks() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.distribution = Some(Distribution::Plane);
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::PlaneSizeMissing)
        ));

        let mut opts = run_opts(&tmp);
        opts.common.distribution = Some(Distribution::Block);
        opts.common.plane_size = Some(4);
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::PlaneSizeUnused(_))
        ));

        let mut opts = run_opts(&tmp);
        let (dist, size) = parse_distribution("plane=2").unwrap();
        opts.common.distribution = Some(dist);
        opts.common.plane_size = size;
        opts.verify_at(now()).unwrap();
    }

    #[test]
    fn test_nodelist_derives_node_count_and_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.nodelist = Some("n[1-4]".to_string());
        opts.verify_at(now()).unwrap();

        assert_eq!(opts.common.min_nodes, 4);
        assert!(opts.common.nodes_set);
        // tasks follow the node count when unset
        assert_eq!(opts.common.ntasks, 4);
    }

    #[test]
    fn test_node_count_clamped_to_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.ntasks = 2;
        opts.common.ntasks_set = true;
        opts.common.min_nodes = 4;
        opts.common.nodes_set = true;
        opts.verify_at(now()).unwrap();
        assert_eq!(opts.common.min_nodes, 2);
    }

    #[test]
    fn test_exclude_overlap() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.nodelist = Some("n[1-4]".to_string());
        opts.common.exclude = Some("n3".to_string());
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::NodeOverlap(host)) if host == "n3"
        ));
    }

    #[test]
    fn test_arbitrary_needs_host_per_task() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.distribution = Some(Distribution::Arbitrary);
        opts.common.ntasks = 3;
        opts.common.ntasks_set = true;
        opts.common.nodelist = Some("n1,n1,n2".to_string());
        opts.verify_at(now()).unwrap();
        // repeats kept for arbitrary, node count is the unique hosts
        assert_eq!(opts.common.nodelist_hosts, vec!["n1", "n1", "n2"]);
        assert_eq!(opts.common.min_nodes, 2);

        let mut opts = run_opts(&tmp);
        opts.common.distribution = Some(Distribution::Arbitrary);
        opts.common.ntasks = 3;
        opts.common.ntasks_set = true;
        opts.common.nodelist = Some("n1".to_string());
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::ArbitraryTaskCount { ntasks: 3, hosts: 1 })
        ));
    }

    #[test]
    fn test_begin_in_past() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.begin = Some(now() - chrono::Duration::hours(1));
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::BeginInPast(_))
        ));
    }

    #[test]
    fn test_quiet_verbose_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        opts.common.quiet = true;
        opts.common.verbose = 1;
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::QuietVerbose)
        ));
    }

    #[test]
    fn test_batch_verify_script() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        std::fs::write(dir.join("job.sh"), "#!/bin/sh\necho hi\n").unwrap();

        let mut opts = BatchOptions::defaults("batch");
        opts.common.cwd = dir.to_path_buf();
        opts.script = Some("job.sh".into());
        opts.verify_at(now()).unwrap();
        assert_eq!(opts.common.job_name.as_deref(), Some("job.sh"));
        assert!(opts.script.as_ref().unwrap().as_str().starts_with('/'));

        let mut opts = BatchOptions::defaults("batch");
        opts.common.cwd = dir.to_path_buf();
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::MissingScript)
        ));

        let mut opts = BatchOptions::defaults("batch");
        opts.common.cwd = dir.to_path_buf();
        opts.script = Some("job.sh".into());
        opts.wrap = Some("echo hi".to_string());
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::ScriptAndWrap)
        ));
    }

    #[test]
    fn test_batch_wrap_job_name() {
        let mut opts = BatchOptions::defaults("batch");
        opts.wrap = Some("echo hi".to_string());
        opts.verify_at(now()).unwrap();
        assert_eq!(opts.common.job_name.as_deref(), Some("wrap"));
    }

    #[test]
    fn test_attach_requires_step() {
        let mut opts = AttachOptions::defaults("attach");
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::MissingStep)
        ));

        opts.step = Some("7.0".parse().unwrap());
        opts.verify_at(now()).unwrap();
    }

    #[test]
    fn test_launch_requires_jobid() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .mode(0o755)
            .open(dir.join("tool"))
            .unwrap();

        let mut opts = LaunchOptions::defaults("launch");
        opts.common.cwd = dir.to_path_buf();
        opts.argv = vec!["./tool".to_string()];
        assert!(matches!(
            opts.verify_at(now()),
            Err(OptionsError::MissingJobId)
        ));

        opts.common.jobid = Some(42);
        opts.verify_at(now()).unwrap();
        assert!(opts.argv[0].starts_with('/'));
    }

    #[test]
    fn test_run_hostfile_feeds_nodelist() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = run_opts(&tmp);
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        std::fs::write(dir.join("hosts"), "n1\nn2\n").unwrap();
        opts.hostfile = Some(dir.join("hosts"));
        opts.verify_at(now()).unwrap();
        assert_eq!(opts.common.nodelist_hosts, vec!["n1", "n2"]);
        assert_eq!(opts.common.min_nodes, 2);
    }
}
