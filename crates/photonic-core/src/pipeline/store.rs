//! Optional persistence collaborator.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

use super::job::{Job, JobId, JobType, Meta};

/// Snapshot of a job as handed to the store on submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub job_type: JobType,
    pub status: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: Value,
    pub started: bool,
    pub meta: Meta,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn queued(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            job_type: job.job_type(),
            status: "queued".to_string(),
            input: job.input.clone(),
            output: job.output.clone(),
            options: job.options_json(),
            started: false,
            meta: Meta::new(),
            error: None,
        }
    }
}

/// Receives job lifecycle events. Failures are logged by the pipeline and
/// otherwise ignored.
pub trait JobStore: Send + Sync {
    fn record_job_queued(&self, record: &JobRecord) -> Result<()>;

    fn record_job_start(&self, id: &JobId) -> Result<()>;

    fn record_job_result(&self, id: &JobId, status: &str, meta: &Meta, error: Option<&str>) -> Result<()>;
}

/// In-memory [`JobStore`].
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    records: Mutex<BTreeMap<JobId, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.lock().get(id).cloned()
    }

    pub fn records(&self) -> Vec<JobRecord> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<JobId, JobRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JobStore for MemoryJobStore {
    fn record_job_queued(&self, record: &JobRecord) -> Result<()> {
        self.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn record_job_start(&self, id: &JobId) -> Result<()> {
        if let Some(record) = self.lock().get_mut(id) {
            record.status = "running".to_string();
            record.started = true;
        }
        Ok(())
    }

    fn record_job_result(&self, id: &JobId, status: &str, meta: &Meta, error: Option<&str>) -> Result<()> {
        if let Some(record) = self.lock().get_mut(id) {
            record.status = status.to_string();
            record.meta = meta.clone();
            record.error = error.map(str::to_string);
        }
        Ok(())
    }
}
