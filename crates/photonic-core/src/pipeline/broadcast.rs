//! Result fan-out: one bounded queue per subscriber, never blocking the sender.

use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use super::job::JobResult;

pub(crate) struct Subscribers {
    inner: Mutex<SubscriberSet>,
    buffer: usize,
}

struct SubscriberSet {
    next_id: u64,
    closed: bool,
    senders: Vec<(u64, Sender<JobResult>)>,
}

impl Subscribers {
    pub(crate) fn new(buffer: usize) -> Self {
        Self {
            inner: Mutex::new(SubscriberSet {
                next_id: 0,
                closed: false,
                senders: Vec::new(),
            }),
            buffer: buffer.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SubscriberSet> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a subscriber. Once closed, the returned receiver is already
    /// disconnected.
    pub(crate) fn add(&self) -> (u64, Receiver<JobResult>) {
        let (tx, rx) = bounded(self.buffer);
        let mut set = self.lock();
        let id = set.next_id;
        set.next_id += 1;
        if !set.closed {
            set.senders.push((id, tx));
        }
        (id, rx)
    }

    pub(crate) fn remove(&self, id: u64) {
        self.lock().senders.retain(|(sid, _)| *sid != id);
    }

    /// Deliver to every subscriber with a free slot; drop for the rest.
    /// Subscribers whose stream was dropped are forgotten.
    pub(crate) fn broadcast(&self, result: &JobResult) {
        let mut set = self.lock();
        set.senders.retain(|(id, tx)| match tx.try_send(result.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = id, job_id = %result.job.id, "subscriber buffer full, dropping result");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(subscriber = id, "subscriber gone, removing");
                false
            }
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().senders.len()
    }

    /// Drop every sender, ending all streams, and refuse new subscribers.
    pub(crate) fn close(&self) {
        let mut set = self.lock();
        set.closed = true;
        set.senders.clear();
    }
}
