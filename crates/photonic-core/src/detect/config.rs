use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_MATCH_DISTANCE, DEFAULT_MAX_STARS, DEFAULT_MAX_STAR_PIXELS, DEFAULT_MIN_STAR_PIXELS,
    DEFAULT_STAR_SENSITIVITY, MIN_STAR_MATCHES,
};

/// Star detection and matching parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarDetectionConfig {
    /// Threshold = mean + sensitivity * stddev of the luminance.
    pub sensitivity: f32,
    /// Smallest blob (pixels) accepted as a star.
    pub min_pixels: usize,
    /// Largest blob (pixels) accepted as a star.
    pub max_pixels: usize,
    /// Brightest stars kept per image.
    pub max_stars: usize,
    /// Nearest-neighbour distance ceiling for matching, in pixels.
    pub match_distance: f64,
    /// Fewest matches needed to align a target.
    pub min_matches: usize,
}

impl Default for StarDetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_STAR_SENSITIVITY,
            min_pixels: DEFAULT_MIN_STAR_PIXELS,
            max_pixels: DEFAULT_MAX_STAR_PIXELS,
            max_stars: DEFAULT_MAX_STARS,
            match_distance: DEFAULT_MATCH_DISTANCE,
            min_matches: MIN_STAR_MATCHES,
        }
    }
}
