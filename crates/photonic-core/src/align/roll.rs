use ndarray::Array3;

use crate::frame::Frame;

/// Cyclic shift by `(dx, dy)` pixels, rounded to the nearest integer.
///
/// Content leaving one edge re-enters at the opposite edge; the pixel at
/// `(row, col)` moves to `(row + dy, col + dx)` modulo the image size. Always
/// allocates a new buffer.
pub fn roll(frame: &Frame, dx: f64, dy: f64) -> Frame {
    let (h, w, c) = frame.dim();
    if h == 0 || w == 0 {
        return frame.clone();
    }
    let sx = (dx.round() as i64).rem_euclid(w as i64) as usize;
    let sy = (dy.round() as i64).rem_euclid(h as i64) as usize;

    let mut out = Array3::<f32>::zeros((h, w, c));
    for row in 0..h {
        let dst_row = (row + sy) % h;
        for col in 0..w {
            let dst_col = (col + sx) % w;
            for ch in 0..c {
                out[[dst_row, dst_col, ch]] = frame.data[[row, col, ch]];
            }
        }
    }

    Frame::new(out, frame.original_bit_depth)
}
