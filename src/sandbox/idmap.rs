// src/sandbox/idmap.rs
//
// User-namespace ID map writes. Must run in the parent,
// strictly before the child is signaled past its synchronization barrier —
// the kernel only lets the parent (or a process with CAP_SYS_ADMIN in the
// child's owning user namespace) write these files once, and only before
// the child's first `setuid`/`setgid`.

use crate::error::LaunchError;
use nix::unistd::{Gid, Uid};
use std::fs;
use std::path::PathBuf;

fn proc_path(pid: i32, file: &str) -> PathBuf {
    PathBuf::from(format!("/proc/{pid}/{file}"))
}

fn write(pid: i32, file: &str, contents: &str) -> Result<(), LaunchError> {
    fs::write(proc_path(pid, file), contents).map_err(|source| LaunchError::IdMapFailed { pid, source })
}

/// Writes `setgroups`, `uid_map`, and `gid_map` for `pid`, mapping in-child
/// uid/gid `0` to the parent's own effective uid/gid. This
/// is what lets the child's later `prctl`/mount steps run as "root" inside
/// its own namespace while the kernel still enforces the parent's real
/// privilege level outside it.
pub fn write_id_maps(pid: i32, parent_euid: Uid, parent_egid: Gid) -> Result<(), LaunchError> {
    // setgroups must be written (and set to "deny") before gid_map on
    // kernels that don't grant CAP_SETGID in the new user namespace.
    write(pid, "setgroups", "deny")?;
    write(pid, "uid_map", &format!("0 {parent_euid} 1\n"))?;
    write(pid, "gid_map", &format!("0 {parent_egid} 1\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_path_builds_expected_location() {
        assert_eq!(proc_path(42, "uid_map"), PathBuf::from("/proc/42/uid_map"));
    }

    /// Requires a live child pid to write into /proc/<pid>/uid_map; exercised
    /// end-to-end by the coordinator's ignored root-only integration tests.
    #[test]
    #[ignore = "requires an unshared, unmapped child process and CAP_SYS_ADMIN"]
    fn write_id_maps_against_real_child() {}
}
