use ndarray::Array3;

use crate::error::Result;
use crate::frame::Frame;

use super::reduce::common_dim;

/// Stack frames by computing the mean at each pixel.
pub fn mean_stack(frames: &[Frame]) -> Result<Frame> {
    let (h, w, c) = common_dim(frames)?;
    let n = frames.len() as f32;

    let mut sum = Array3::<f32>::zeros((h, w, c));

    for frame in frames {
        sum += &frame.data;
    }

    sum /= n;

    Ok(Frame::new(sum, frames[0].original_bit_depth))
}
