//! Statistical stacking engine.

pub mod extrema;
pub mod mean;
pub mod median;
pub mod method;
pub(crate) mod reduce;
pub mod sigma_clip;
pub mod stacker;
pub mod stats;

use crate::error::{PhotonicError, Result};
use crate::frame::Frame;

pub use extrema::{max_stack, min_stack};
pub use mean::mean_stack;
pub use median::{median_stack, percentile_stack};
pub use method::StackMethod;
pub use sigma_clip::{sigma_clip_stack, ClippedStack, SigmaClipParams};
pub use stacker::{fusion_weights, EnfuseStacker, NativeStacker, StackRequest, StackResult, Stacker};

/// A stacked frame and the number of samples rejected while producing it.
#[derive(Clone, Debug)]
pub struct StackOutcome {
    pub frame: Frame,
    pub rejected_pixels: u64,
}

/// Aggregate same-sized frames pixel by pixel.
///
/// One frame is returned unchanged. Inputs are never modified.
pub fn stack_frames(frames: &[Frame], method: &StackMethod) -> Result<StackOutcome> {
    match frames {
        [] => return Err(PhotonicError::EmptySequence),
        [only] => {
            return Ok(StackOutcome {
                frame: only.clone(),
                rejected_pixels: 0,
            })
        }
        _ => {}
    }

    let (frame, rejected_pixels) = match method {
        StackMethod::Mean => (mean_stack(frames)?, 0),
        StackMethod::Median => (median_stack(frames)?, 0),
        StackMethod::Percentile(p) => (percentile_stack(frames, *p)?, 0),
        StackMethod::Winsorized { percent } => (percentile_stack(frames, percent / 100.0)?, 0),
        StackMethod::SigmaClip(params) => {
            let clipped = sigma_clip_stack(frames, params)?;
            (clipped.frame, clipped.rejected_pixels)
        }
        StackMethod::KappaSigma { kappa, iterations } => {
            let params = SigmaClipParams::from_kappa(*kappa, *iterations);
            let clipped = sigma_clip_stack(frames, &params)?;
            (clipped.frame, clipped.rejected_pixels)
        }
        StackMethod::Max => (max_stack(frames)?, 0),
        StackMethod::Min => (min_stack(frames)?, 0),
        StackMethod::Exposure | StackMethod::StarTrails | StackMethod::Focus => {
            return Err(PhotonicError::InvalidOption {
                key: "method".into(),
                reason: format!("{method} fusion needs an external stacker"),
            })
        }
    };

    Ok(StackOutcome {
        frame,
        rejected_pixels,
    })
}
