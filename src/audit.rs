// src/audit.rs
//
// Optional append-only JSON-lines log of completed jobs. Generalized from
// `unifiedlab::eventlog`'s binary-framed, CRC-checked event log down to a
// single line-oriented append with the same integrity idea: a CRC32 of the
// serialized record travels alongside it so a truncated write at the tail
// (the host crashing mid-append) is detectable on the next read instead of
// silently parsed as valid.

use crate::coordinator::JobResult;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    job_id: u64,
    timestamp: String,
    result: &'a JobResult,
    checksum: u32,
}

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends one line. The checksum covers the serialized `result` field
    /// only, computed before the wrapping record (including the checksum
    /// field itself) is serialized, so a reader can recompute it the same
    /// way.
    pub fn append(&self, result: &JobResult) -> io::Result<()> {
        let result_json = serde_json::to_vec(result)?;
        let checksum = crc32fast::hash(&result_json);
        let record = AuditRecord {
            job_id: result.job_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            result,
            checksum,
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
