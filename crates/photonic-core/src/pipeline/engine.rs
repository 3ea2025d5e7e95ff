use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, info};

use crate::cancel::{CancelSource, CancelToken};
use crate::config::ProcessingConfig;
use crate::consts::QUEUE_SLOTS_PER_WORKER;
use crate::error::{PhotonicError, Result};

use super::broadcast::Subscribers;
use super::job::{Job, JobId, JobResult};
use super::store::{JobRecord, JobStore};

/// Turns one job into one result. Errors belong inside the result.
pub trait JobProcessor: Send + Sync {
    fn process(&self, cancel: &CancelToken, job: &Job) -> JobResult;
}

/// Receiving end of a subscription. Ends when the pipeline stops or the
/// subscription is cancelled.
pub struct ResultStream {
    receiver: Receiver<JobResult>,
}

impl ResultStream {
    /// Block for the next result; `None` once the stream is closed.
    pub fn recv(&self) -> Option<JobResult> {
        self.receiver.recv().ok()
    }

    pub fn try_recv(&self) -> Option<JobResult> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<JobResult, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// True once the stream is closed and drained.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.receiver.recv_timeout(Duration::ZERO),
            Err(RecvTimeoutError::Disconnected)
        ) && self.receiver.is_empty()
    }
}

impl Iterator for ResultStream {
    type Item = JobResult;

    fn next(&mut self) -> Option<JobResult> {
        self.recv()
    }
}

/// Handle that ends one subscription.
pub struct Unsubscribe {
    id: u64,
    subscribers: Arc<Subscribers>,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        self.subscribers.remove(self.id);
    }
}

/// Bounded job queue, fixed worker pool, result fan-out.
pub struct Pipeline {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    subscribers: Arc<Subscribers>,
    cancel: CancelSource,
    store: Option<Arc<dyn JobStore>>,
}

impl Pipeline {
    /// Start `config.parallel_jobs` workers (at least one). The queue holds two
    /// jobs per worker.
    pub fn new(
        config: &ProcessingConfig,
        processor: Arc<dyn JobProcessor>,
        store: Option<Arc<dyn JobStore>>,
    ) -> Result<Self> {
        let worker_count = config.parallel_jobs.max(1);
        let (job_tx, job_rx) = bounded::<Job>(worker_count * QUEUE_SLOTS_PER_WORKER);
        let subscribers = Arc::new(Subscribers::new(config.subscriber_buffer));
        let cancel = CancelSource::new();

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                jobs: job_rx.clone(),
                cancel: cancel.token(),
                processor: Arc::clone(&processor),
                subscribers: Arc::clone(&subscribers),
                store: store.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("photonic-worker-{worker_id}"))
                .spawn(move || worker.run())?;
            workers.push(handle);
        }

        info!(workers = worker_count, "pipeline started");

        Ok(Self {
            sender: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            subscribers,
            cancel,
            store,
        })
    }

    /// Enqueue without blocking. A full queue is `QueueFull`; a stopped
    /// pipeline is `PipelineStopped`.
    pub fn submit(&self, job: Job) -> Result<()> {
        let sender = lock(&self.sender);
        let tx = sender.as_ref().ok_or(PhotonicError::PipelineStopped)?;

        let id = job.id.clone();
        record(&self.store, "queued", |s| s.record_job_queued(&JobRecord::queued(&job)));

        match tx.try_send(job) {
            Ok(()) => {
                debug!(job_id = %id, "job queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                let err = PhotonicError::QueueFull;
                record(&self.store, "result", |s| {
                    s.record_job_result(&id, "rejected", &Default::default(), Some(&err.to_string()))
                });
                Err(err)
            }
            Err(TrySendError::Disconnected(_)) => Err(PhotonicError::PipelineStopped),
        }
    }

    /// Subscribe to every result produced from now on.
    pub fn subscribe(&self) -> (ResultStream, Unsubscribe) {
        let (id, receiver) = self.subscribers.add();
        (
            ResultStream { receiver },
            Unsubscribe {
                id,
                subscribers: Arc::clone(&self.subscribers),
            },
        )
    }

    /// Cancel, close the queue, wait for running jobs, close all streams.
    /// Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
        lock(&self.sender).take();

        let workers: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        if !workers.is_empty() {
            info!("stopping pipeline");
        }
        for (i, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                error!(worker = i, "worker thread panicked");
            }
        }

        self.subscribers.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wait on `stream` for the result of job `id`, skipping other jobs' results.
///
/// Subscribe before submitting, or the result may be missed.
pub fn wait_for_result(stream: &ResultStream, id: &JobId, timeout: Option<Duration>) -> Result<JobResult> {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        let next = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match stream.recv_timeout(remaining) {
                    Ok(result) => result,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(PhotonicError::Timeout(id.to_string()))
                    }
                    Err(RecvTimeoutError::Disconnected) => return Err(PhotonicError::PipelineStopped),
                }
            }
            None => stream.recv().ok_or(PhotonicError::PipelineStopped)?,
        };
        if &next.job.id == id {
            return Ok(next);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Run a store call if a store is configured; failures are only logged.
fn record<F>(store: &Option<Arc<dyn JobStore>>, event: &str, f: F)
where
    F: FnOnce(&dyn JobStore) -> Result<()>,
{
    if let Some(store) = store {
        if let Err(e) = f(store.as_ref()) {
            debug!(event, error = %e, "job store call failed");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct Worker {
    id: usize,
    jobs: Receiver<Job>,
    cancel: CancelToken,
    processor: Arc<dyn JobProcessor>,
    subscribers: Arc<Subscribers>,
    store: Option<Arc<dyn JobStore>>,
}

impl Worker {
    fn run(self) {
        debug!(worker = self.id, "worker started");

        loop {
            let job = select! {
                recv(self.cancel.receiver()) -> _ => break,
                recv(self.jobs) -> msg => match msg {
                    Ok(job) => job,
                    Err(_) => break,
                },
            };
            if self.cancel.is_cancelled() {
                debug!(worker = self.id, job_id = %job.id, "dropping job after cancellation");
                break;
            }
            self.process(job);
        }

        debug!(worker = self.id, "worker stopped");
    }

    fn process(&self, job: Job) {
        let start = Instant::now();
        info!(
            worker = self.id,
            job_id = %job.id,
            job_type = %job.job_type(),
            input = %job.input.display(),
            output = %job.output.display(),
            "job started"
        );
        record(&self.store, "start", |s| s.record_job_start(&job.id));

        let outcome = catch_unwind(AssertUnwindSafe(|| self.processor.process(&self.cancel, &job)));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(worker = self.id, job_id = %job.id, panic = %message, "job panicked");
                JobResult::failure(job.clone(), PhotonicError::JobPanicked(message))
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result.error {
            None => info!(job_id = %job.id, elapsed_ms, meta_keys = result.meta.len(), "job completed"),
            Some(e) => error!(job_id = %job.id, elapsed_ms, error = %e, "job failed"),
        }

        let error_text = result.error.as_ref().map(|e| e.to_string());
        record(&self.store, "result", |s| {
            s.record_job_result(&job.id, result.status(), &result.meta, error_text.as_deref())
        });

        self.subscribers.broadcast(&result);
    }
}
