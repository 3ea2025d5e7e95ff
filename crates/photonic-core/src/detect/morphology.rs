use ndarray::Array2;

/// 4-neighbourhood plus centre: the 3x3 cross structuring element.
const CROSS: [(i32, i32); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

/// Morphological opening (erosion followed by dilation) with a 3x3 cross.
///
/// Removes isolated pixels and one-pixel-wide spurs while keeping compact
/// blobs such as stars. Always returns a new mask.
pub fn open_cross(mask: &Array2<bool>) -> Array2<bool> {
    let eroded = erode(mask);
    dilate(&eroded)
}

fn neighbour(mask: &Array2<bool>, row: usize, col: usize, dr: i32, dc: i32) -> Option<bool> {
    let (h, w) = mask.dim();
    let nr = row as i32 + dr;
    let nc = col as i32 + dc;
    if nr < 0 || nr >= h as i32 || nc < 0 || nc >= w as i32 {
        return None;
    }
    Some(mask[[nr as usize, nc as usize]])
}

/// A pixel stays set only if every cross neighbour is set (out-of-bounds is unset).
fn erode(mask: &Array2<bool>) -> Array2<bool> {
    let (h, w) = mask.dim();
    let mut result = Array2::from_elem((h, w), false);

    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }
            result[[row, col]] = CROSS
                .iter()
                .all(|&(dr, dc)| neighbour(mask, row, col, dr, dc).unwrap_or(false));
        }
    }

    result
}

/// A pixel becomes set if any cross neighbour is set.
fn dilate(mask: &Array2<bool>) -> Array2<bool> {
    let (h, w) = mask.dim();
    let mut result = Array2::from_elem((h, w), false);

    for row in 0..h {
        for col in 0..w {
            result[[row, col]] = CROSS
                .iter()
                .any(|&(dr, dc)| neighbour(mask, row, col, dr, dc).unwrap_or(false));
        }
    }

    result
}
