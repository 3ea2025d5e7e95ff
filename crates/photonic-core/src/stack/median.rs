use crate::error::Result;
use crate::frame::Frame;

use super::reduce::reduce_pixels;
use super::stats::percentile_in_place;

/// Stack frames by taking the interpolated order statistic at fraction `p`.
pub fn percentile_stack(frames: &[Frame], p: f32) -> Result<Frame> {
    let (frame, _) = reduce_pixels(frames, |values| (percentile_in_place(values, p), 0))?;
    Ok(frame)
}

/// Stack frames by computing the median at each pixel position.
///
/// Robust to single extreme outliers (hot pixels, cosmic rays).
pub fn median_stack(frames: &[Frame]) -> Result<Frame> {
    percentile_stack(frames, 0.5)
}
