use ndarray::Array2;

use crate::frame::StarPoint;

/// Extract connected components (4-connectivity) from `mask` and return the
/// intensity-weighted centroid of every component whose pixel count lies in
/// `[min_pixels, max_pixels]`.
///
/// The fill uses an explicit work stack, so large saturated regions cannot
/// exhaust the call stack. `intensity` of each star is the summed luminance of
/// its pixels; components with zero total luminance are dropped.
pub fn extract_blobs(
    mask: &Array2<bool>,
    luma: &Array2<f32>,
    min_pixels: usize,
    max_pixels: usize,
) -> Vec<StarPoint> {
    let (h, w) = mask.dim();
    let mut visited = Array2::from_elem((h, w), false);
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut pixels: Vec<(usize, usize)> = Vec::new();
    let mut stars = Vec::new();

    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] || visited[[row, col]] {
                continue;
            }

            pixels.clear();
            stack.push((row, col));
            visited[[row, col]] = true;

            while let Some((r, c)) = stack.pop() {
                pixels.push((r, c));
                let neighbours = [
                    (r.wrapping_sub(1), c),
                    (r + 1, c),
                    (r, c.wrapping_sub(1)),
                    (r, c + 1),
                ];
                for (nr, nc) in neighbours {
                    if nr < h && nc < w && mask[[nr, nc]] && !visited[[nr, nc]] {
                        visited[[nr, nc]] = true;
                        stack.push((nr, nc));
                    }
                }
            }

            if pixels.len() < min_pixels || pixels.len() > max_pixels {
                continue;
            }

            let mut sum_i = 0.0f64;
            let mut sum_x = 0.0f64;
            let mut sum_y = 0.0f64;
            for &(r, c) in &pixels {
                let v = luma[[r, c]] as f64;
                sum_i += v;
                sum_x += c as f64 * v;
                sum_y += r as f64 * v;
            }
            if sum_i > 0.0 {
                stars.push(StarPoint::new(sum_x / sum_i, sum_y / sum_i, sum_i));
            }
        }
    }

    stars
}
