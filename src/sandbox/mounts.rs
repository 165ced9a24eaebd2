// src/sandbox/mounts.rs
//
// Mount-namespace setup performed inside the child after the synchronization
// barrier. Grounded on `magicrune::sandbox`'s
// `nix::mount::{mount, MsFlags}` usage; generalized from its overlay+tmpfs
// build to a fixed private-root / proc-remount / bind-mount set.

use nix::mount::{mount, MsFlags};
use nix::unistd::sethostname;
use std::path::Path;

pub const DEFAULT_BIND_MOUNTS: &[&str] = &["/bin", "/usr/bin", "/lib", "/lib64", "/usr/lib"];
pub const SANDBOX_HOSTNAME: &str = "safebox";

/// `mount(NULL, "/", NULL, MS_REC|MS_PRIVATE, NULL)`.
/// Must run before any other mount change so nothing propagates back to the
/// host's mount namespace.
pub fn mount_root_private() -> nix::Result<()> {
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
}

/// Remounts `/proc` with `MS_NOSUID|MS_NOEXEC|MS_NODEV`.
pub fn remount_proc() -> nix::Result<()> {
    mount(
        Some("proc"),
        "/proc",
        Some("proc"),
        MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV,
        None::<&str>,
    )
}

/// Bind-mounts each path in `paths` read-only over itself. A bind mount
/// must be established first, then remounted `MS_BIND |
/// MS_RDONLY` in a second call; the kernel does not honor `MS_RDONLY` on the
/// initial bind.
pub fn bind_mount_ro(paths: &[impl AsRef<Path>]) -> nix::Result<()> {
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            continue;
        }
        mount(
            Some(path),
            path,
            None::<&str>,
            MsFlags::MS_BIND | MsFlags::MS_REC,
            None::<&str>,
        )?;
        mount(
            None::<&str>,
            path,
            None::<&str>,
            MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY | MsFlags::MS_REC,
            None::<&str>,
        )?;
    }
    Ok(())
}

/// Sets the UTS-namespace hostname to the fixed sandbox value.
pub fn set_sandbox_hostname() -> nix::Result<()> {
    sethostname(SANDBOX_HOSTNAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind_mounts_match_spec_set() {
        assert_eq!(
            DEFAULT_BIND_MOUNTS,
            &["/bin", "/usr/bin", "/lib", "/lib64", "/usr/lib"]
        );
    }

    #[test]
    #[ignore = "requires CAP_SYS_ADMIN inside a mount namespace"]
    fn mount_root_private_against_real_namespace() {}
}
