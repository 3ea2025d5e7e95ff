//! Alignment processors and their shared request/result types.

pub mod hugin;
pub mod phase_correlation;
pub mod roll;
pub mod star;
pub mod star_match;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::consts::TIMELAPSE_IMAGE_COUNT;
use crate::detect::StarDetectionConfig;
use crate::error::{PhotonicError, Result};
use crate::frame::TransformRecord;
use crate::selection::Scored;

pub use hugin::HuginAligner;
pub use phase_correlation::PhaseCorrelationAligner;
pub use roll::roll;
pub use star::StarAligner;
pub use star_match::{estimate_translation, match_stars};

/// What kind of sequence is being aligned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentType {
    General,
    Panoramic,
    Timelapse,
    Astro,
}

impl AlignmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Panoramic => "panoramic",
            Self::Timelapse => "timelapse",
            Self::Astro => "astro",
        }
    }
}

impl fmt::Display for AlignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentType {
    type Err = PhotonicError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "general" => Ok(Self::General),
            "panoramic" => Ok(Self::Panoramic),
            "timelapse" => Ok(Self::Timelapse),
            "astro" | "star" => Ok(Self::Astro),
            other => Err(PhotonicError::UnknownMethod(other.to_string())),
        }
    }
}

/// Guess the alignment type from the sequence alone.
pub fn detect_alignment_type(images: &[PathBuf]) -> AlignmentType {
    if images.is_empty() {
        AlignmentType::General
    } else if images.len() > TIMELAPSE_IMAGE_COUNT {
        AlignmentType::Timelapse
    } else {
        AlignmentType::Panoramic
    }
}

#[derive(Clone, Debug)]
pub struct AlignmentRequest {
    /// The first image is the reference.
    pub images: Vec<PathBuf>,
    pub alignment_type: AlignmentType,
    pub output_dir: PathBuf,
    /// `fast`, `normal`, `high` or `ultra`.
    pub quality: String,
    pub star: StarDetectionConfig,
}

#[derive(Clone, Debug, Default)]
pub struct AlignmentResult {
    pub success: bool,
    pub tool: String,
    pub aligned_images: Vec<PathBuf>,
    pub reference_image: Option<PathBuf>,
    pub transforms: Vec<TransformRecord>,
    pub warnings: Vec<String>,
    /// Stars detected in the reference image.
    pub star_count: usize,
    /// Star correspondences used across all aligned targets.
    pub match_count: usize,
    pub processing_time: Duration,
}

impl AlignmentResult {
    pub(crate) fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            ..Default::default()
        }
    }

    /// Stamp timing and fail when fewer than two images made it through.
    pub(crate) fn finish(&mut self, start: Instant) -> Result<()> {
        self.processing_time = start.elapsed();
        if self.aligned_images.len() < 2 {
            return Err(PhotonicError::InsufficientImages {
                needed: 2,
                got: self.aligned_images.len(),
            });
        }
        self.success = true;
        Ok(())
    }
}

/// A registered alignment strategy.
pub trait Aligner: Scored {
    fn supports(&self, alignment_type: AlignmentType) -> bool;

    fn align(&self, cancel: &CancelToken, request: &AlignmentRequest) -> Result<AlignmentResult>;
}

/// `<dir>/aligned_NNN_<stem>.tif`
pub fn aligned_output_path(dir: &Path, index: usize, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    dir.join(format!("aligned_{index:03}_{stem}.tif"))
}
