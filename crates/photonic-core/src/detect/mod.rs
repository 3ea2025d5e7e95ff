//! Star detection: global threshold, cross opening, blob extraction.

pub mod blobs;
pub mod config;
pub mod morphology;
pub mod threshold;

use ndarray::Array2;
use tracing::debug;

use crate::frame::StarPoint;

pub use blobs::extract_blobs;
pub use config::StarDetectionConfig;
pub use morphology::open_cross;
pub use threshold::star_threshold;

/// Detect stars in a luminance plane.
///
/// Returns at most `config.max_stars` points, brightest first.
pub fn detect_stars(luma: &Array2<f32>, config: &StarDetectionConfig) -> Vec<StarPoint> {
    let threshold = star_threshold(luma, config.sensitivity);
    let mask = open_cross(&threshold::binarize(luma, threshold));
    let mut stars = extract_blobs(&mask, luma, config.min_pixels, config.max_pixels);

    stars.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    stars.truncate(config.max_stars);

    debug!(threshold, stars = stars.len(), "star detection");
    stars
}
