use ndarray::Array3;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{PhotonicError, Result};
use crate::frame::Frame;

/// Verify all frames share one shape and return it.
pub(crate) fn common_dim(frames: &[Frame]) -> Result<(usize, usize, usize)> {
    let first = frames.first().ok_or(PhotonicError::EmptySequence)?;
    let expected = first.dim();
    for frame in &frames[1..] {
        let got = frame.dim();
        if got != expected {
            return Err(PhotonicError::DimensionMismatch { expected, got });
        }
    }
    Ok(expected)
}

/// Apply `reducer` to the N samples at every pixel/channel and build a new frame.
///
/// `reducer` receives a scratch slice it may reorder freely and returns the
/// output value plus the number of samples it rejected. Parallelizes at the row
/// level for images >= 256x256.
pub(crate) fn reduce_pixels<F>(frames: &[Frame], reducer: F) -> Result<(Frame, u64)>
where
    F: Fn(&mut Vec<f32>) -> (f32, u32) + Sync,
{
    let (h, w, c) = common_dim(frames)?;
    let n = frames.len();

    let reduce_row = |row: usize| -> (Vec<f32>, u64) {
        let mut values = Vec::with_capacity(n);
        let mut out = Vec::with_capacity(w * c);
        let mut rejected = 0u64;
        for col in 0..w {
            for ch in 0..c {
                values.clear();
                values.extend(frames.iter().map(|f| f.data[[row, col, ch]]));
                let (v, r) = reducer(&mut values);
                out.push(v);
                rejected += r as u64;
            }
        }
        (out, rejected)
    };

    let rows: Vec<(Vec<f32>, u64)> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(reduce_row).collect()
    } else {
        (0..h).map(reduce_row).collect()
    };

    let mut result = Array3::<f32>::zeros((h, w, c));
    let mut rejected_total = 0u64;
    for (row, (row_data, rejected)) in rows.into_iter().enumerate() {
        rejected_total += rejected;
        for (i, val) in row_data.into_iter().enumerate() {
            result[[row, i / c, i % c]] = val;
        }
    }

    Ok((
        Frame::new(result, frames[0].original_bit_depth),
        rejected_total,
    ))
}
