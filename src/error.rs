// src/error.rs
//
// =============================================================================
// SAFEBOX: ERROR TAXONOMY
// =============================================================================
//
// The kinds from spec section 7. Each enum is a closed, non-overlapping set
// of reasons a caller can match on. `anyhow::Result` is still used at the
// coordinator/CLI boundary for context-chaining; these are the typed leaves
// that end up wrapped in it.

use std::path::PathBuf;
use thiserror::Error;

/// Rejection reasons from the admission layer. Recoverable: no
/// side effects have escaped when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("safety engine has not been initialized")]
    Uninitialized,

    #[error("job {0} is not declared")]
    UnknownJob(u64),

    #[error("job {0} already declared")]
    AlreadyDeclared(u64),

    #[error("resource vector arity {given} does not match engine arity {expected}")]
    ArityMismatch { given: usize, expected: usize },

    #[error("{given} resource names given does not match totals arity {expected}")]
    ResourceNamesArityMismatch { given: usize, expected: usize },

    #[error("declared maximum exceeds totals")]
    MaxExceedsTotals,

    #[error("initial allocation exceeds declared maximum")]
    InitialExceedsMax,

    #[error("allocation for job {0} would exceed its declared maximum")]
    ExceedsMax(u64),

    #[error("requested vector exceeds currently available resources")]
    InsufficientAvailable,

    #[error("granting this request would leave no safe sequence")]
    UnsafeState,

    #[error("release of {0:?} exceeds job {1}'s current allocation")]
    NegativeRelease(Vec<u64>, u64),

    #[error("resource arity must be at least 1")]
    ZeroArity,
}

/// Errors from the cgroup-v2 enforcer.
#[derive(Debug, Error)]
pub enum CgroupError {
    #[error("cgroup v2 controllers unavailable at {0}")]
    ControllersUnavailable(PathBuf),

    #[error("path {0} escapes the configured cgroup root")]
    PathTraversal(PathBuf),

    #[error("write to {path} failed: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read from {path} failed: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cgroup {0} is not empty")]
    NotEmpty(PathBuf),

    #[error("cgroup {0} already exists and is occupied")]
    AlreadyExists(PathBuf),
}

/// Errors from the isolation launcher. All of these terminate the
/// job; the coordinator rolls back cgroup creation and the admission grant.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("preparing the clone stack failed: {0}")]
    StackAllocFailed(String),

    #[error("clone(2) failed: {0}")]
    CloneFailed(#[source] nix::errno::Errno),

    #[error("writing id map for pid {pid} failed: {source}")]
    IdMapFailed {
        pid: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("attaching child to cgroup failed: {0}")]
    AttachFailed(#[source] CgroupError),

    #[error("mount setup failed: {0}")]
    MountFailed(#[source] nix::errno::Errno),

    #[error("seccomp filter install failed: {0}")]
    SeccompInstallFailed(String),

    #[error("execve failed: {0}")]
    ExecFailed(#[source] nix::errno::Errno),

    #[error("synchronization pipe failed: {0}")]
    SyncPipeFailed(#[source] nix::errno::Errno),
}

/// Step index for `LaunchError`'s child-side setup-failure exit code
/// (`127 + step`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SetupStep {
    MountPrivate = 1,
    RemountProc = 2,
    BindMounts = 3,
    SetHostname = 4,
    NoNewPrivs = 5,
    DropPrivileges = 6,
    InstallSeccomp = 7,
    Exec = 8,
}

impl SetupStep {
    /// The child's exit code when this step fails, observable by the parent
    /// as `ReportedSetupFailure`.
    pub fn exit_code(self) -> i32 {
        127 + self as i32
    }
}

/// Runtime behaviors observed in the child after it has started running
/// (`ChildHandle::wait`'s possible outcomes).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("child was killed by the seccomp filter")]
    KilledBySeccomp,

    #[error("child was killed by the OOM killer")]
    OomKilled,

    #[error("child was terminated by signal {0}")]
    SignaledBy(i32),

    #[error("child exited with non-zero status {0}")]
    ExitedNonZero(i32),
}

/// Top-level error returned to external collaborators for a failed submit,
/// after any rollback has already completed.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Cgroup(#[from] CgroupError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
