// src/cgroup.rs
//
// =============================================================================
// SAFEBOX: CGROUP-V2 RESOURCE-LIMIT ENFORCER
// =============================================================================
//
// Direct cgroup-v2 unified-hierarchy file writes, generalized from
// `boxlite::jailer::cgroup`'s root-owned layout (its rootless systemd-scope
// branch is not carried over — this manager supports only the root-owned
// layout under `<root>/safebox_<job_id>/`; the rootless delegated-subtree
// case is left for a future iteration).

use crate::error::CgroupError;
use std::fs;
use std::path::{Path, PathBuf};

/// An owned cgroup-v2 subdirectory. Dropping one without calling `destroy`
/// is a bug — debug builds log a warning from `Drop`
/// so tests catch the leak without making it a hard panic in release.
#[derive(Debug)]
pub struct CgroupHandle {
    path: PathBuf,
    name: String,
    destroyed: bool,
}

impl CgroupHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CgroupHandle {
    fn drop(&mut self) {
        if !self.destroyed {
            log::warn!(
                "cgroup handle for {} dropped without destroy() — {} may be orphaned",
                self.name,
                self.path.display()
            );
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CgroupStats {
    pub memory_current: u64,
    pub cpu_usage_us: u64,
    pub throttled_us: u64,
}

/// Manages cgroup-v2 subdirectories under a single configured root.
pub struct CgroupManager {
    root: PathBuf,
}

impl CgroupManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Joins `name` under the manager root and rejects any path that would
    /// escape it; this manager only ever writes within its configured root
    /// subtree.
    fn resolve(&self, name: &str) -> Result<PathBuf, CgroupError> {
        if name.contains('/') || name == ".." || name == "." || name.is_empty() {
            return Err(CgroupError::PathTraversal(self.root.join(name)));
        }
        let candidate = self.root.join(name);
        Ok(candidate)
    }

    fn is_cgroup_v2(&self) -> bool {
        self.root.join("cgroup.controllers").exists()
    }

    /// `root/group_name/` — idempotent on a pre-existing, empty group.
    pub fn create(&self, group_name: &str) -> Result<CgroupHandle, CgroupError> {
        if !self.is_cgroup_v2() {
            return Err(CgroupError::ControllersUnavailable(self.root.clone()));
        }
        let path = self.resolve(group_name)?;

        if path.exists() {
            let occupied = fs::read_to_string(path.join("cgroup.procs"))
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false);
            if occupied {
                return Err(CgroupError::AlreadyExists(path));
            }
        } else if let Err(source) = fs::create_dir(&path) {
            return Err(CgroupError::WriteFailed { path, source });
        }

        Ok(CgroupHandle {
            path,
            name: group_name.to_string(),
            destroyed: false,
        })
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), CgroupError> {
        fs::write(path, content).map_err(|source| CgroupError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_file(&self, path: &Path) -> Result<String, CgroupError> {
        fs::read_to_string(path).map_err(|source| CgroupError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes `bytes` to `memory.max`, or `"max"` for no limit.
    pub fn set_memory_max(&self, handle: &CgroupHandle, bytes: Option<u64>) -> Result<(), CgroupError> {
        let value = bytes.map(|b| b.to_string()).unwrap_or_else(|| "max".to_string());
        self.write_file(&handle.path.join("memory.max"), &value)
    }

    /// Writes `"<quota> <period>"` to `cpu.max`; `quota = None` means
    /// `"max"` (unlimited).
    pub fn set_cpu_max(
        &self,
        handle: &CgroupHandle,
        quota_us: Option<u64>,
        period_us: u64,
    ) -> Result<(), CgroupError> {
        let quota = quota_us.map(|q| q.to_string()).unwrap_or_else(|| "max".to_string());
        self.write_file(&handle.path.join("cpu.max"), &format!("{quota} {period_us}"))
    }

    /// Writes `pid\n` to `cgroup.procs`.
    pub fn attach(&self, handle: &CgroupHandle, pid: i32) -> Result<(), CgroupError> {
        self.write_file(&handle.path.join("cgroup.procs"), &format!("{pid}\n"))
    }

    /// Reads `memory.current` and parses `cpu.stat`'s `usage_usec` /
    /// `throttled_usec` fields.
    pub fn stats(&self, handle: &CgroupHandle) -> Result<CgroupStats, CgroupError> {
        let memory_current = self
            .read_file(&handle.path.join("memory.current"))?
            .trim()
            .parse()
            .unwrap_or(0);

        let cpu_stat = self.read_file(&handle.path.join("cpu.stat"))?;
        let mut cpu_usage_us = 0;
        let mut throttled_us = 0;
        for line in cpu_stat.lines() {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("usage_usec"), Some(v)) => cpu_usage_us = v.parse().unwrap_or(0),
                (Some("throttled_usec"), Some(v)) => throttled_us = v.parse().unwrap_or(0),
                _ => {}
            }
        }

        Ok(CgroupStats {
            memory_current,
            cpu_usage_us,
            throttled_us,
        })
    }

    /// Removes the directory. Fails if `cgroup.procs` is non-empty.
    pub fn destroy(&self, mut handle: CgroupHandle) -> Result<(), CgroupError> {
        if !handle.path.exists() {
            handle.destroyed = true;
            return Ok(());
        }
        let occupied = self
            .read_file(&handle.path.join("cgroup.procs"))
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if occupied {
            return Err(CgroupError::NotEmpty(handle.path.clone()));
        }
        fs::remove_dir(&handle.path).map_err(|source| CgroupError::WriteFailed {
            path: handle.path.clone(),
            source,
        })?;
        handle.destroyed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_root() -> (tempfile_like::TempDir, CgroupManager) {
        let dir = tempfile_like::TempDir::new();
        fs::write(dir.path().join("cgroup.controllers"), "cpu memory pids").unwrap();
        let mgr = CgroupManager::new(dir.path());
        (dir, mgr)
    }

    /// Minimal self-contained temp-dir helper so this module's tests do not
    /// depend on a dev-dependency crate for a single use.
    mod tempfile_like {
        use std::path::{Path, PathBuf};

        pub struct TempDir(PathBuf);

        impl TempDir {
            pub fn new() -> Self {
                let mut path = std::env::temp_dir();
                let unique = format!("safebox-cgroup-test-{}-{}", std::process::id(), unique_suffix());
                path.push(unique);
                std::fs::create_dir_all(&path).unwrap();
                TempDir(path)
            }

            pub fn path(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }

        fn unique_suffix() -> u64 {
            use std::sync::atomic::{AtomicU64, Ordering};
            static COUNTER: AtomicU64 = AtomicU64::new(0);
            COUNTER.fetch_add(1, Ordering::Relaxed)
        }
    }

    #[test]
    fn create_is_idempotent_on_empty_group() {
        let (_dir, mgr) = fake_root();
        let h1 = mgr.create("safebox_0").unwrap();
        mgr.destroy(h1).unwrap();
        let h2 = mgr.create("safebox_0").unwrap();
        mgr.destroy(h2).unwrap();
    }

    #[test]
    fn create_rejects_controllers_unavailable() {
        let dir = tempfile_like::TempDir::new();
        let mgr = CgroupManager::new(dir.path());
        let err = mgr.create("safebox_0").unwrap_err();
        assert!(matches!(err, CgroupError::ControllersUnavailable(_)));
    }

    #[test]
    fn create_rejects_path_traversal() {
        let (_dir, mgr) = fake_root();
        let err = mgr.create("../escape").unwrap_err();
        assert!(matches!(err, CgroupError::PathTraversal(_)));
    }

    #[test]
    fn set_memory_max_writes_expected_value() {
        let (dir, mgr) = fake_root();
        let handle = mgr.create("safebox_1").unwrap();
        mgr.set_memory_max(&handle, Some(10 * 1024 * 1024)).unwrap();
        let written = fs::read_to_string(dir.path().join("safebox_1").join("memory.max")).unwrap();
        assert_eq!(written, "10485760");
        mgr.destroy(handle).unwrap();
    }

    #[test]
    fn set_memory_max_unlimited_writes_max() {
        let (_dir, mgr) = fake_root();
        let handle = mgr.create("safebox_2").unwrap();
        mgr.set_memory_max(&handle, None).unwrap();
        let written = fs::read_to_string(handle.path().join("memory.max")).unwrap();
        assert_eq!(written, "max");
        mgr.destroy(handle).unwrap();
    }

    #[test]
    fn set_cpu_max_writes_quota_and_period() {
        let (_dir, mgr) = fake_root();
        let handle = mgr.create("safebox_3").unwrap();
        mgr.set_cpu_max(&handle, Some(50_000), 100_000).unwrap();
        let written = fs::read_to_string(handle.path().join("cpu.max")).unwrap();
        assert_eq!(written, "50000 100000");
        mgr.destroy(handle).unwrap();
    }

    #[test]
    fn destroy_fails_when_procs_non_empty() {
        let (_dir, mgr) = fake_root();
        let handle = mgr.create("safebox_4").unwrap();
        fs::write(handle.path().join("cgroup.procs"), "1234\n").unwrap();
        let path = handle.path().to_path_buf();
        let err = mgr.destroy(handle).unwrap_err();
        assert!(matches!(err, CgroupError::NotEmpty(p) if p == path));
    }

    #[test]
    fn stats_parses_cpu_stat_fields() {
        let (_dir, mgr) = fake_root();
        let handle = mgr.create("safebox_5").unwrap();
        fs::write(handle.path().join("memory.current"), "1048576\n").unwrap();
        fs::write(
            handle.path().join("cpu.stat"),
            "usage_usec 900\nuser_usec 500\nsystem_usec 400\nthrottled_usec 25\n",
        )
        .unwrap();
        let stats = mgr.stats(&handle).unwrap();
        assert_eq!(stats.memory_current, 1_048_576);
        assert_eq!(stats.cpu_usage_us, 900);
        assert_eq!(stats.throttled_us, 25);
        mgr.destroy(handle).unwrap();
    }
}
