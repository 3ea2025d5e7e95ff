//! Pipeline-wide cancellation.
//!
//! A [`CancelSource`] owns the signal; any number of [`CancelToken`] clones
//! observe it. Cancelling sets a flag and drops the sender half of a channel,
//! so a `select!` on [`CancelToken::receiver`] wakes immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::{PhotonicError, Result};

#[derive(Debug)]
struct Shared {
    cancelled: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
}

/// Owner of the cancellation signal.
#[derive(Debug)]
pub struct CancelSource {
    shared: Arc<Shared>,
    receiver: Receiver<()>,
}

/// Cheap, clonable view of a [`CancelSource`].
#[derive(Clone, Debug)]
pub struct CancelToken {
    shared: Arc<Shared>,
    receiver: Receiver<()>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            shared: Arc::new(Shared {
                cancelled: AtomicBool::new(false),
                sender: Mutex::new(Some(tx)),
            }),
            receiver: rx,
        }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            shared: Arc::clone(&self.shared),
            receiver: self.receiver.clone(),
        }
    }

    /// Signal cancellation. Safe to call more than once.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        // A poisoned lock still holds a valid Option; take it either way.
        let mut sender = match self.shared.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sender.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A token that is never cancelled. Used for direct, pipeline-less calls.
    pub fn never() -> Self {
        CancelSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once the signal has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PhotonicError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Disconnects when cancelled. Nothing is ever sent on it.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}
