use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::{PhotonicError, Result};

use super::{Processor, Registry};

/// A processor that can score how well it would handle a set of inputs.
pub trait Scored: Processor {
    /// Higher is better. An error removes the processor from consideration.
    fn estimate_quality(&self, inputs: &[PathBuf]) -> Result<f64>;
}

/// Inputs to [`select_best`].
pub struct Selection<'a> {
    /// Registry kind for error messages, e.g. `"alignment"`.
    pub kind: &'static str,
    /// Task subtype for error messages, e.g. `"astro"`.
    pub task: String,
    /// Caller override.
    pub explicit: Option<&'a str>,
    /// Configured default.
    pub default: Option<&'a str>,
    pub inputs: &'a [PathBuf],
}

/// Resolve one processor: explicit override, then configured default, then
/// the strict maximum of `estimate_quality` among available, capable
/// processors. Ties keep the earliest registration.
pub fn select_best<P, F>(registry: &Registry<P>, selection: &Selection<'_>, capable: F) -> Result<Arc<P>>
where
    P: Scored + ?Sized,
    F: Fn(&P) -> bool,
{
    let usable = |p: &Arc<P>| p.is_available() && capable(&**p);
    let none = || PhotonicError::NoProcessor {
        kind: selection.kind,
        task: selection.task.clone(),
    };

    if let Some(name) = selection.explicit {
        return match registry.get(name) {
            Some(p) if usable(p) => Ok(Arc::clone(p)),
            _ => {
                debug!(processor = name, "explicit processor unusable");
                Err(none())
            }
        };
    }

    if let Some(name) = selection.default {
        if let Some(p) = registry.get(name).filter(|p| usable(*p)) {
            debug!(processor = name, "using configured default");
            return Ok(Arc::clone(p));
        }
    }

    let mut best: Option<(&Arc<P>, f64)> = None;
    for p in registry.iter().filter(|p| usable(*p)) {
        let score = match p.estimate_quality(selection.inputs) {
            Ok(s) => s,
            Err(e) => {
                debug!(processor = p.name(), error = %e, "quality estimate failed");
                continue;
            }
        };
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((p, score));
        }
    }

    match best {
        Some((p, score)) => {
            debug!(processor = p.name(), score, "selected best processor");
            Ok(Arc::clone(p))
        }
        None => Err(none()),
    }
}
