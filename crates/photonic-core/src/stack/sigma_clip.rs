use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_SIGMA_HIGH, DEFAULT_SIGMA_ITERATIONS, DEFAULT_SIGMA_LOW, KAPPA_HIGH_FACTOR,
    KAPPA_LOW_FACTOR,
};
use crate::error::Result;
use crate::frame::Frame;

use super::reduce::reduce_pixels;
use super::stats::{mean, sigma_clip_in_place};

/// Parameters for sigma-clipped mean stacking.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigmaClipParams {
    /// Lower threshold in standard deviations below the mean (default: 2.0).
    pub sigma_low: f32,
    /// Upper threshold in standard deviations above the mean (default: 2.0).
    pub sigma_high: f32,
    /// Maximum number of rejection passes (default: 3).
    pub iterations: usize,
}

impl Default for SigmaClipParams {
    fn default() -> Self {
        Self {
            sigma_low: DEFAULT_SIGMA_LOW,
            sigma_high: DEFAULT_SIGMA_HIGH,
            iterations: DEFAULT_SIGMA_ITERATIONS,
        }
    }
}

impl SigmaClipParams {
    /// Kappa-sigma parameterization: low = 1.5 kappa, high = 2.0 kappa.
    pub fn from_kappa(kappa: f32, iterations: usize) -> Self {
        Self {
            sigma_low: kappa * KAPPA_LOW_FACTOR,
            sigma_high: kappa * KAPPA_HIGH_FACTOR,
            iterations,
        }
    }
}

/// Result of a rejecting stack.
#[derive(Clone, Debug)]
pub struct ClippedStack {
    pub frame: Frame,
    /// Samples dropped across all pixels, channels and passes.
    pub rejected_pixels: u64,
}

/// Stack frames using iterative sigma-clipped mean.
///
/// Per pixel and channel: compute mean and sample stddev of the active values,
/// drop values outside the asymmetric band, repeat. The final value is the mean
/// of the survivors, or of all values if nothing survives.
pub fn sigma_clip_stack(frames: &[Frame], params: &SigmaClipParams) -> Result<ClippedStack> {
    let (frame, rejected_pixels) = reduce_pixels(frames, |values| {
        let full_mean = mean(values);
        let mut kept = Vec::with_capacity(values.len());
        let rejected = sigma_clip_in_place(
            values,
            &mut kept,
            params.sigma_low,
            params.sigma_high,
            params.iterations,
        );
        let value = if values.is_empty() {
            full_mean
        } else {
            mean(values)
        };
        (value, rejected)
    })?;

    Ok(ClippedStack {
        frame,
        rejected_pixels,
    })
}
