// src/safety.rs
//
// =============================================================================
// SAFEBOX: SAFETY ENGINE (ADMISSION / DEADLOCK AVOIDANCE)
// =============================================================================
//
// The Ledger, generalized into a full Banker's-algorithm admission
// controller. Where `unifiedlab::resources::ResourceLedger`
// tracks a bitmask of busy cores/GPUs and a boolean try_allocate/free pair,
// this ledger tracks a declared maximum and a live allocation per job and
// answers admission requests with a safety proof (or a typed rejection)
// instead of a bare bool.
//
// Pure and in-memory: no I/O, no child processes. The coordinator is the
// only caller and is responsible for serializing access.

use crate::error::AdmissionError;
use crate::vector::ResourceVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type JobId = u64;

/// Outcome of a `request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Granted { safe_sequence: Vec<JobId> },
    Rejected(AdmissionError),
}

#[derive(Debug, Clone)]
struct LiveJob {
    #[allow(dead_code)]
    name: String,
    max: ResourceVector,
    allocated: ResourceVector,
}

impl LiveJob {
    fn need(&self) -> ResourceVector {
        (&self.max).saturating_sub(&self.allocated)
    }
}

/// A read-only view of the engine's current state, for the `state`
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub resource_names: Vec<String>,
    pub totals: Vec<u64>,
    pub available: Vec<u64>,
    pub jobs: Vec<JobSnapshot>,
    pub is_safe: bool,
    pub safe_sequence: Vec<JobId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub name: String,
    pub max: Vec<u64>,
    pub allocated: Vec<u64>,
    pub need: Vec<u64>,
}

/// The admission controller. `BTreeMap` keeps jobs in ascending `JobId`
/// order for free, which is the deterministic ascending-id scan order the
/// for both the safety check and deadlock detection.
pub struct SafetyEngine {
    arity: usize,
    totals: Option<ResourceVector>,
    available: Option<ResourceVector>,
    resource_names: Vec<String>,
    jobs: BTreeMap<JobId, LiveJob>,
}

impl SafetyEngine {
    pub fn new() -> Self {
        Self {
            arity: 0,
            totals: None,
            available: None,
            resource_names: Vec::new(),
            jobs: BTreeMap::new(),
        }
    }

    /// Establishes arity, totals, and the per-slot resource names (spec
    /// §4.1: `init(totals: Vector, names: [String])`). Refuses zero arity,
    /// and arity may never change after this call; `names` must carry
    /// exactly one label per slot in `totals`.
    pub fn init(&mut self, totals: ResourceVector, names: Vec<String>) -> Result<(), AdmissionError> {
        if totals.arity() == 0 {
            return Err(AdmissionError::ZeroArity);
        }
        if names.len() != totals.arity() {
            return Err(AdmissionError::ResourceNamesArityMismatch {
                given: names.len(),
                expected: totals.arity(),
            });
        }
        self.arity = totals.arity();
        self.available = Some(totals.clone());
        self.totals = Some(totals);
        self.resource_names = names;
        self.jobs.clear();
        Ok(())
    }

    /// The per-slot resource labels given to `init`, in vector order.
    pub fn resource_names(&self) -> &[String] {
        &self.resource_names
    }

    fn check_arity(&self, v: &ResourceVector) -> Result<(), AdmissionError> {
        if v.arity() != self.arity {
            return Err(AdmissionError::ArityMismatch {
                given: v.arity(),
                expected: self.arity,
            });
        }
        Ok(())
    }

    /// Declares a new job with a declared maximum and an initial allocation.
    pub fn declare(
        &mut self,
        job_id: JobId,
        name: impl Into<String>,
        max: ResourceVector,
        initial_alloc: ResourceVector,
    ) -> Result<(), AdmissionError> {
        let totals = self.totals.clone().ok_or(AdmissionError::Uninitialized)?;
        self.check_arity(&max)?;
        self.check_arity(&initial_alloc)?;

        if self.jobs.contains_key(&job_id) {
            return Err(AdmissionError::AlreadyDeclared(job_id));
        }
        if !max.le(&totals) {
            return Err(AdmissionError::MaxExceedsTotals);
        }
        if !initial_alloc.le(&max) {
            return Err(AdmissionError::InitialExceedsMax);
        }
        let available = self.available.as_ref().expect("initialized");
        if !initial_alloc.le(available) {
            return Err(AdmissionError::InsufficientAvailable);
        }

        self.available = Some(available.saturating_sub(&initial_alloc));
        self.jobs.insert(
            job_id,
            LiveJob {
                name: name.into(),
                max,
                allocated: initial_alloc,
            },
        );
        Ok(())
    }

    /// Runs the safety algorithm against a tentative allocation
    /// where `job_id` additionally holds `req`. Does not mutate state;
    /// callers commit separately once they've decided to grant.
    fn find_safe_sequence(
        &self,
        tentative: &BTreeMap<JobId, LiveJob>,
        work0: ResourceVector,
    ) -> Option<Vec<JobId>> {
        let mut work = work0;
        let mut finished: BTreeMap<JobId, bool> = tentative.keys().map(|&id| (id, false)).collect();
        let mut sequence = Vec::with_capacity(tentative.len());

        loop {
            let mut progressed = false;
            for (&id, job) in tentative.iter() {
                if finished[&id] {
                    continue;
                }
                if job.need().le(&work) {
                    work = &work + &job.allocated;
                    finished.insert(id, true);
                    sequence.push(id);
                    progressed = true;
                    break; // restart the scan from ascending order
                }
            }
            if !progressed {
                break;
            }
        }

        if finished.values().all(|&done| done) {
            Some(sequence)
        } else {
            None
        }
    }

    /// Decides whether granting `req` to `job_id` preserves a safe state,
    /// and commits the allocation if so.
    pub fn request(&mut self, job_id: JobId, req: ResourceVector) -> Decision {
        if self.totals.is_none() {
            return Decision::Rejected(AdmissionError::Uninitialized);
        }
        if let Err(e) = self.check_arity(&req) {
            return Decision::Rejected(e);
        }
        if !self.jobs.contains_key(&job_id) {
            return Decision::Rejected(AdmissionError::UnknownJob(job_id));
        }

        let available = self.available.clone().expect("initialized");
        if !req.le(&available) {
            return Decision::Rejected(AdmissionError::InsufficientAvailable);
        }

        let job = &self.jobs[&job_id];
        let tentative_allocated = &job.allocated + &req;
        if !tentative_allocated.le(&job.max) {
            return Decision::Rejected(AdmissionError::ExceedsMax(job_id));
        }

        // Build the tentative world: available' and allocated'[job_id].
        let available_prime = available.saturating_sub(&req);
        let mut tentative = self.jobs.clone();
        tentative.get_mut(&job_id).unwrap().allocated = tentative_allocated.clone();

        match self.find_safe_sequence(&tentative, available_prime.clone()) {
            Some(safe_sequence) => {
                self.available = Some(available_prime);
                self.jobs.get_mut(&job_id).unwrap().allocated = tentative_allocated;
                Decision::Granted { safe_sequence }
            }
            None => Decision::Rejected(AdmissionError::UnsafeState),
        }
    }

    /// Releases `rel` from `job_id`'s current allocation back to available.
    pub fn release(&mut self, job_id: JobId, rel: ResourceVector) -> Result<(), AdmissionError> {
        self.totals.as_ref().ok_or(AdmissionError::Uninitialized)?;
        self.check_arity(&rel)?;
        let job = self
            .jobs
            .get(&job_id)
            .ok_or(AdmissionError::UnknownJob(job_id))?;
        if !rel.le(&job.allocated) {
            return Err(AdmissionError::NegativeRelease(
                rel.as_slice().to_vec(),
                job_id,
            ));
        }

        let job = self.jobs.get_mut(&job_id).unwrap();
        job.allocated = (&job.allocated).saturating_sub(&rel);
        let available = self.available.as_ref().unwrap();
        self.available = Some(available + &rel);
        Ok(())
    }

    /// Releases the job's full allocation and removes it from the live set.
    pub fn release_all(&mut self, job_id: JobId) -> Result<(), AdmissionError> {
        self.totals.as_ref().ok_or(AdmissionError::Uninitialized)?;
        let job = self
            .jobs
            .get(&job_id)
            .ok_or(AdmissionError::UnknownJob(job_id))?;
        let full = job.allocated.clone();
        let available = self.available.as_ref().unwrap();
        self.available = Some(available + &full);
        self.jobs.remove(&job_id);
        Ok(())
    }

    /// A read-only snapshot including a safety boolean and safe sequence, if
    /// one exists over the current live set.
    pub fn state(&self) -> StateSnapshot {
        let totals = self
            .totals
            .clone()
            .unwrap_or_else(|| ResourceVector::zeros(self.arity));
        let available = self
            .available
            .clone()
            .unwrap_or_else(|| ResourceVector::zeros(self.arity));

        let safe_sequence = self
            .find_safe_sequence(&self.jobs, available.clone())
            .unwrap_or_default();
        let is_safe = safe_sequence.len() == self.jobs.len();

        let jobs = self
            .jobs
            .iter()
            .map(|(&id, job)| JobSnapshot {
                job_id: id,
                name: job.name.clone(),
                max: job.max.as_slice().to_vec(),
                allocated: job.allocated.as_slice().to_vec(),
                need: job.need().as_slice().to_vec(),
            })
            .collect();

        StateSnapshot {
            resource_names: self.resource_names.clone(),
            totals: totals.as_slice().to_vec(),
            available: available.as_slice().to_vec(),
            jobs,
            is_safe,
            safe_sequence,
        }
    }

    /// Runs the deadlock-detection variant of the safety check: identical to
    /// `find_safe_sequence` but using `allocated` (not `max`) as the
    /// residual-need proxy, so jobs that could in principle finish with
    /// *no further* allocation are the ones marked finishable
    /// `detect_deadlock`).
    pub fn detect_deadlock(&self) -> (bool, Vec<JobId>) {
        let available = self
            .available
            .clone()
            .unwrap_or_else(|| ResourceVector::zeros(self.arity));

        let mut work = available;
        let mut finished: BTreeMap<JobId, bool> = self.jobs.keys().map(|&id| (id, false)).collect();

        loop {
            let mut progressed = false;
            for (&id, job) in self.jobs.iter() {
                if finished[&id] {
                    continue;
                }
                // Using zero as the "still needed" proxy: a job with no
                // outstanding request can always finish with what it already
                // holds, so every live job is trivially satisfiable here
                // unless the engine has been extended with per-job pending
                // requests. Kept narrow: this mirrors the detection variant's
                // "identical... but using allocated instead of max", i.e. a
                // job finishes once `allocated <= work`.
                if job.allocated.le(&work) {
                    work = &work + &job.allocated;
                    finished.insert(id, true);
                    progressed = true;
                    break;
                }
            }
            if !progressed {
                break;
            }
        }

        let stuck: Vec<JobId> = finished
            .into_iter()
            .filter(|&(_, done)| !done)
            .map(|(id, _)| id)
            .collect();
        (stuck.is_empty(), stuck)
    }
}

impl Default for SafetyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[u64]) -> ResourceVector {
        ResourceVector::new(values.to_vec())
    }

    /// Placeholder per-slot resource labels of the given arity, e.g.
    /// `["r0", "r1", "r2"]`.
    fn names(arity: usize) -> Vec<String> {
        (0..arity).map(|i| format!("r{i}")).collect()
    }

    /// The classical textbook safe-state scenario.
    fn classical_scenario() -> SafetyEngine {
        let mut e = SafetyEngine::new();
        e.init(v(&[10, 5, 7]), names(3)).unwrap();
        e.declare(0, "j0", v(&[7, 5, 3]), v(&[0, 1, 0])).unwrap();
        e.declare(1, "j1", v(&[3, 2, 2]), v(&[2, 0, 0])).unwrap();
        e.declare(2, "j2", v(&[9, 0, 2]), v(&[3, 0, 2])).unwrap();
        e
    }

    #[test]
    fn scenario_1_classical_safe_state() {
        let e = classical_scenario();
        let snap = e.state();
        assert_eq!(snap.available, vec![5, 4, 5]);
        assert!(snap.is_safe);
        assert_eq!(snap.safe_sequence, vec![1, 2, 0]);
    }

    #[test]
    fn scenario_2_unsafe_rejection() {
        let mut e = classical_scenario();
        let before = e.state().available;
        let decision = e.request(0, v(&[0, 2, 0]));
        assert_eq!(
            decision,
            Decision::Rejected(AdmissionError::UnsafeState)
        );
        assert_eq!(e.state().available, before);
    }

    #[test]
    fn scenario_3_granted_request() {
        let mut e = classical_scenario();
        let decision = e.request(1, v(&[1, 0, 2]));
        match decision {
            Decision::Granted { safe_sequence } => assert_eq!(safe_sequence, vec![1, 2, 0]),
            other => panic!("expected Granted, got {:?}", other),
        }
        assert_eq!(e.state().available, vec![4, 4, 3]);
    }

    #[test]
    fn zero_request_always_granted() {
        let mut e = classical_scenario();
        let before = e.state();
        let decision = e.request(0, v(&[0, 0, 0]));
        assert!(matches!(decision, Decision::Granted { .. }));
        assert_eq!(e.state().available, before.available);
    }

    #[test]
    fn request_exceeding_need_by_one_is_exceeds_max() {
        let mut e = classical_scenario();
        // job 0: max [7,5,3], allocated [0,1,0] -> need [7,4,3]; ask for one
        // past need in the first slot.
        let decision = e.request(0, v(&[8, 0, 0]));
        assert_eq!(decision, Decision::Rejected(AdmissionError::ExceedsMax(0)));
    }

    #[test]
    fn declare_release_all_round_trip() {
        let mut e = SafetyEngine::new();
        e.init(v(&[4, 4]), names(2)).unwrap();
        e.declare(0, "solo", v(&[4, 4]), v(&[2, 2])).unwrap();
        assert_eq!(e.state().available, vec![2, 2]);
        e.release_all(0).unwrap();
        assert_eq!(e.state().available, vec![4, 4]);
        assert!(e.state().jobs.is_empty());
    }

    #[test]
    fn request_then_release_restores_allocation() {
        let mut e = classical_scenario();
        let before = e.state().available;
        let decision = e.request(1, v(&[1, 0, 2]));
        assert!(matches!(decision, Decision::Granted { .. }));
        e.release(1, v(&[1, 0, 2])).unwrap();
        assert_eq!(e.state().available, before);
    }

    #[test]
    fn unknown_job_is_rejected() {
        let mut e = classical_scenario();
        let decision = e.request(99, v(&[1, 0, 0]));
        assert_eq!(decision, Decision::Rejected(AdmissionError::UnknownJob(99)));
    }

    #[test]
    fn uninitialized_engine_refuses_declare() {
        let mut e = SafetyEngine::new();
        let err = e.declare(0, "x", v(&[1]), v(&[0])).unwrap_err();
        assert_eq!(err, AdmissionError::Uninitialized);
    }

    #[test]
    fn zero_arity_init_refused() {
        let mut e = SafetyEngine::new();
        let err = e.init(ResourceVector::new(Vec::<u64>::new()), Vec::new()).unwrap_err();
        assert_eq!(err, AdmissionError::ZeroArity);
    }

    #[test]
    fn init_rejects_mismatched_names_length() {
        let mut e = SafetyEngine::new();
        let err = e.init(v(&[10, 10]), names(3)).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::ResourceNamesArityMismatch {
                given: 3,
                expected: 2
            }
        );
    }

    #[test]
    fn init_records_resource_names_in_state() {
        let mut e = SafetyEngine::new();
        e.init(v(&[10, 10]), vec!["cpu_percent".into(), "memory_mib".into()]).unwrap();
        assert_eq!(e.resource_names(), &["cpu_percent", "memory_mib"]);
        assert_eq!(e.state().resource_names, vec!["cpu_percent", "memory_mib"]);
    }

    #[test]
    fn arity_mismatch_is_hard_error() {
        let mut e = SafetyEngine::new();
        e.init(v(&[10, 10]), names(2)).unwrap();
        let err = e.declare(0, "x", v(&[1, 1, 1]), v(&[0, 0, 0])).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::ArityMismatch {
                given: 3,
                expected: 2
            }
        );
    }

    #[test]
    fn empty_live_set_is_vacuously_safe() {
        let mut e = SafetyEngine::new();
        e.init(v(&[10, 10]), names(2)).unwrap();
        let snap = e.state();
        assert!(snap.is_safe);
        assert!(snap.safe_sequence.is_empty());
    }
}
