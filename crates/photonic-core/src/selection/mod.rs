//! Processor registries and the two selection strategies that pick from them.
//!
//! [`select_best`] scores every capable candidate and commits to the winner;
//! [`run_fallback_chain`] tries candidates in a fixed order until one works.

mod best;
mod fallback;

use std::sync::Arc;

use crate::error::{PhotonicError, Result};

pub use best::{select_best, Scored, Selection};
pub use fallback::{fallback_order, run_fallback_chain, FallbackChain, Outcome};

/// Common surface of every registered implementation.
pub trait Processor: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// Environment check, typically "is the binary installed and enabled".
    fn is_available(&self) -> bool;
}

/// Ordered, name-keyed collection of processors.
///
/// Iteration follows registration order, which is also the tie-break order for
/// [`select_best`].
pub struct Registry<P: ?Sized> {
    entries: Vec<Arc<P>>,
}

impl<P: Processor + ?Sized> Registry<P> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a processor. A second registration under the same name is rejected.
    pub fn register(&mut self, processor: Arc<P>) -> Result<()> {
        if self.get(processor.name()).is_some() {
            return Err(PhotonicError::DuplicateProcessor(
                processor.name().to_string(),
            ));
        }
        self.entries.push(processor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<P>> {
        self.entries.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|p| p.name().to_string()).collect()
    }

    /// Processors whose environment check passes, in registration order.
    pub fn available(&self) -> Vec<Arc<P>> {
        self.entries
            .iter()
            .filter(|p| p.is_available())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<P>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Processor + ?Sized> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}
