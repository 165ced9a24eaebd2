// src/job.rs
//
// =============================================================================
// SAFEBOX: JOB RECORD & LIFECYCLE
// =============================================================================
//
// The five-state job lifecycle, owned exclusively by the
// coordinator. Where `guardian::NodeGuardian`
// keys its checkpoint/lifecycle state by a `Uuid`, jobs here are keyed by a
// coordinator-assigned sequential `u64` so the safety engine's ascending-id
// scan order is free (see vector.rs, safety.rs).

use crate::vector::ResourceVector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type JobId = u64;

/// The five states a job moves through, in strictly forward order except
/// for the two terminal branches (`Exited` can be reached without ever
/// running, if admission itself is rejected before a child is spawned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Admitted,
    Running,
    Exited,
    Released,
}

/// How a job's run concluded, once known. `None` while `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Normal(i32),
    Signaled(i32),
    KilledBySeccomp,
    OomKilled,
    SetupFailed(u8),
    AdmissionRejected(String),
}

/// A single job's full record, as tracked by `JobTable`. Carries both the
/// admission bookkeeping (`max`, `allocated`, `need`) and the runtime
/// bookkeeping (`cgroup_path`, `child_pid`, `exit_reason`) so a `state`
/// query can answer from one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub name: String,
    pub max: ResourceVector,
    pub allocated: ResourceVector,
    pub state: JobState,
    pub cgroup_path: Option<PathBuf>,
    pub child_pid: Option<i32>,
    pub exit_reason: Option<ExitReason>,
}

impl JobRecord {
    pub fn new(job_id: JobId, name: impl Into<String>, max: ResourceVector) -> Self {
        let arity = max.arity();
        Self {
            job_id,
            name: name.into(),
            max,
            allocated: ResourceVector::zeros(arity),
            state: JobState::Pending,
            cgroup_path: None,
            child_pid: None,
            exit_reason: None,
        }
    }

    pub fn need(&self) -> ResourceVector {
        (&self.max).saturating_sub(&self.allocated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Released)
    }
}

/// In-memory table of all jobs the coordinator has ever admitted this run.
/// `BTreeMap` for the same ascending-order reason as `SafetyEngine`; this is
/// a separate map rather than folding job metadata into the safety engine
/// itself, since `SafetyEngine` must stay ignorant of cgroups/pids/exit
/// status — it only ever reasons about resource vectors, performing no I/O
/// of its own.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: std::collections::BTreeMap<JobId, JobRecord>,
    next_id: JobId,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: std::collections::BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn allocate_id(&mut self) -> JobId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, record: JobRecord) {
        self.jobs.insert(record.job_id, record);
    }

    pub fn get(&self, job_id: JobId) -> Option<&JobRecord> {
        self.jobs.get(&job_id)
    }

    pub fn get_mut(&mut self, job_id: JobId) -> Option<&mut JobRecord> {
        self.jobs.get_mut(&job_id)
    }

    pub fn set_state(&mut self, job_id: JobId, state: JobState) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.state = state;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
