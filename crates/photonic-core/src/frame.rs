use ndarray::{Array2, Array3, Axis};
use std::path::PathBuf;

use crate::consts::{COLOR_CHANNEL_COUNT, LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};

/// A decoded image.
/// Pixel values are f32 in [0.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width, channels)
    pub data: Array3<f32>,
    /// Original bit depth before conversion (8 or 16)
    pub original_bit_depth: u8,
}

impl Frame {
    pub fn new(data: Array3<f32>, bit_depth: u8) -> Self {
        Self {
            data,
            original_bit_depth: bit_depth,
        }
    }

    /// Wrap a single-channel plane as a one-channel frame.
    pub fn from_gray(plane: Array2<f32>, bit_depth: u8) -> Self {
        Self::new(plane.insert_axis(Axis(2)), bit_depth)
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// (height, width, channels)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Single-channel luminance plane.
    ///
    /// RGB frames use BT.601 weights; any other channel count is averaged.
    pub fn luminance(&self) -> Array2<f32> {
        let (h, w, c) = self.data.dim();
        if c == 1 {
            return self.data.index_axis(Axis(2), 0).to_owned();
        }
        let mut out = Array2::<f32>::zeros((h, w));
        for row in 0..h {
            for col in 0..w {
                out[[row, col]] = if c == COLOR_CHANNEL_COUNT {
                    self.data[[row, col, 0]] * LUMINANCE_R
                        + self.data[[row, col, 1]] * LUMINANCE_G
                        + self.data[[row, col, 2]] * LUMINANCE_B
                } else {
                    (0..c).map(|ch| self.data[[row, col, ch]]).sum::<f32>() / c as f32
                };
            }
        }
        out
    }
}

/// A detected star: intensity-weighted blob centroid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarPoint {
    pub x: f64,
    pub y: f64,
    /// Summed luminance of the blob.
    pub intensity: f64,
}

impl StarPoint {
    pub fn new(x: f64, y: f64, intensity: f64) -> Self {
        Self { x, y, intensity }
    }
}

/// Correspondence between a reference star and its nearest target star.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarMatch {
    pub reference: StarPoint,
    pub target: StarPoint,
    pub distance: f64,
}

/// Translation of a target relative to a reference.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AlignmentOffset {
    pub dx: f64,
    pub dy: f64,
}

/// Per-image transform recorded by an alignment run.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct TransformRecord {
    pub image: PathBuf,
    pub dx: f64,
    pub dy: f64,
}
