use tracing::{info, warn};

use crate::error::{PhotonicError, Result};

use super::{Processor, Registry};

/// Candidate order for [`run_fallback_chain`].
#[derive(Clone, Debug, Default)]
pub struct FallbackChain {
    pub explicit: Option<String>,
    pub default: Option<String>,
    pub priority: Vec<String>,
}

/// Explicit override, configured default, then the fixed priority list, each
/// name at most once.
pub fn fallback_order(chain: &FallbackChain) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let candidates = chain
        .explicit
        .iter()
        .chain(chain.default.iter())
        .chain(chain.priority.iter());
    for name in candidates {
        if !name.is_empty() && !order.contains(name) {
            order.push(name.clone());
        }
    }
    order
}

/// Per-invocation report a fallback candidate hands back.
pub trait Outcome {
    fn succeeded(&self) -> bool;

    /// Tool output worth surfacing when the attempt is deemed a failure.
    fn log(&self) -> &str {
        ""
    }
}

/// Try every candidate in [`fallback_order`] until one succeeds.
///
/// Unregistered and unavailable candidates are skipped; every skip and failure
/// leaves one diagnostic line. When nothing succeeds the error lists them all.
/// Cancellation stops the chain immediately.
pub fn run_fallback_chain<P, T, F>(
    registry: &Registry<P>,
    chain: &FallbackChain,
    task: &str,
    mut invoke: F,
) -> Result<T>
where
    P: Processor + ?Sized,
    T: Outcome,
    F: FnMut(&P) -> Result<T>,
{
    let mut attempts = Vec::new();

    for name in fallback_order(chain) {
        let processor = match registry.get(&name) {
            Some(p) if p.is_available() => p,
            _ => {
                attempts.push(format!("{name} not available or disabled"));
                continue;
            }
        };

        match invoke(&**processor) {
            Ok(outcome) if outcome.succeeded() => {
                info!(task, tool = %name, "processor succeeded");
                return Ok(outcome);
            }
            Ok(outcome) => {
                warn!(task, tool = %name, "processor reported failure");
                attempts.push(format!(
                    "{name} failed: reported failure (log: {})",
                    outcome.log().trim()
                ));
            }
            Err(PhotonicError::Cancelled) => return Err(PhotonicError::Cancelled),
            Err(e) => {
                warn!(task, tool = %name, error = %e, "processor failed, trying next");
                attempts.push(format!("{name} failed: {e}"));
            }
        }
    }

    Err(PhotonicError::AllProcessorsFailed {
        task: task.to_string(),
        attempts,
    })
}
