use ndarray::Zip;

use crate::error::Result;
use crate::frame::Frame;

use super::reduce::common_dim;

fn fold_frames(frames: &[Frame], pick: fn(f32, f32) -> f32) -> Result<Frame> {
    common_dim(frames)?;
    let mut acc = frames[0].data.clone();
    for frame in &frames[1..] {
        Zip::from(&mut acc)
            .and(&frame.data)
            .par_for_each(|a, &b| *a = pick(*a, b));
    }
    Ok(Frame::new(acc, frames[0].original_bit_depth))
}

/// Keep the brightest sample at each pixel. Star trails come out of this
/// when the inputs are unaligned.
pub fn max_stack(frames: &[Frame]) -> Result<Frame> {
    fold_frames(frames, f32::max)
}

/// Keep the darkest sample at each pixel.
pub fn min_stack(frames: &[Frame]) -> Result<Frame> {
    fold_frames(frames, f32::min)
}
