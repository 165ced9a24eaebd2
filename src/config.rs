// src/config.rs
//
// =============================================================================
// SAFEBOX: RUNTIME CONFIGURATION
// =============================================================================
//
// Environment-sourced configuration, read once at startup into a
// plain struct, the same probing style `unifiedlab::resources::ResourceLedger
// ::detect()` uses for its own environment/hardware discovery.

use std::path::PathBuf;

const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";
const DEFAULT_UNPRIV_UID: u32 = 65534; // nobody
const DEFAULT_UNPRIV_GID: u32 = 65534; // nogroup

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the cgroup-v2 unified hierarchy this host mounts SafeBox's
    /// scopes under. `SAFEBOX_CGROUP_ROOT`, default `/sys/fs/cgroup`.
    pub cgroup_root: PathBuf,
    /// uid the sandboxed child drops to after the user-namespace mapping is
    /// in place. `SAFEBOX_UNPRIV_UID`, default 65534.
    pub unpriv_uid: u32,
    /// gid the sandboxed child drops to. `SAFEBOX_UNPRIV_GID`, default
    /// 65534.
    pub unpriv_gid: u32,
    /// Whether `CLONE_NEWNET` is included in the clone flag set. Per spec
    /// §4.3 step 2, `NEW_NET` is mandatory unless the host cannot support it
    /// (WSL-style kernels); this defaults to `true` (isolated network
    /// namespace) and is only turned off via `SAFEBOX_ALLOW_NEWNET=0` or
    /// `--no-net`, never the other way around. `allow_sockets`-class
    /// syscalls in the seccomp filter (spec §4.4) are gated on this same
    /// flag: they are only permitted when the job runs inside its own
    /// isolated namespace, never when it shares the host's.
    pub allow_newnet: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            cgroup_root: std::env::var("SAFEBOX_CGROUP_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CGROUP_ROOT)),
            unpriv_uid: parse_env_u32("SAFEBOX_UNPRIV_UID", DEFAULT_UNPRIV_UID),
            unpriv_gid: parse_env_u32("SAFEBOX_UNPRIV_GID", DEFAULT_UNPRIV_GID),
            allow_newnet: std::env::var("SAFEBOX_ALLOW_NEWNET")
                .map(|v| v != "0")
                .unwrap_or(true),
        }
    }
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
