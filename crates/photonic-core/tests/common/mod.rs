#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array3;

use photonic_core::align::{Aligner, AlignmentRequest, AlignmentResult, AlignmentType};
use photonic_core::cancel::CancelToken;
use photonic_core::error::{PhotonicError, Result};
use photonic_core::frame::Frame;
use photonic_core::io::save_image;
use photonic_core::raw::{RawConvertRequest, RawConvertResult, RawConverter};
use photonic_core::selection::{Processor, Scored};

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// RGB frame filled with one value.
pub fn make_frame(h: usize, w: usize, fill: f32) -> Frame {
    Frame::new(Array3::from_elem((h, w, 3), fill), 16)
}

/// RGB frame whose value depends on position, so shifts are observable.
pub fn gradient_frame(h: usize, w: usize) -> Frame {
    let data = Array3::from_shape_fn((h, w, 3), |(r, c, ch)| {
        ((r * 7 + c * 3 + ch) % 64) as f32 / 64.0
    });
    Frame::new(data, 16)
}

/// Dark background with 3x3 square stars centred on `(x, y)`.
///
/// A 3x3 square survives the cross opening as a 5-pixel plus shape with the
/// same centroid.
pub fn star_field(h: usize, w: usize, stars: &[(usize, usize, f32)]) -> Frame {
    let mut data = Array3::from_elem((h, w, 3), 0.05f32);
    for &(x, y, brightness) in stars {
        for r in y - 1..=y + 1 {
            for c in x - 1..=x + 1 {
                for ch in 0..3 {
                    data[[r, c, ch]] = brightness;
                }
            }
        }
    }
    Frame::new(data, 16)
}

pub const FIELD_STARS: [(usize, usize, f32); 6] = [
    (10, 12, 0.95),
    (40, 8, 0.9),
    (25, 30, 0.85),
    (50, 45, 0.8),
    (12, 50, 0.9),
    (33, 20, 0.75),
];

/// Save `frames` as `<dir>/<prefix>NN.tif` and return the paths.
pub fn write_frames(dir: &Path, prefix: &str, frames: &[Frame]) -> Vec<PathBuf> {
    frames
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let path = dir.join(format!("{prefix}{i:02}.tif"));
            save_image(f, &path).unwrap();
            path
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fake processors
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Behaviour {
    Succeed,
    /// Return `Err(ToolFailed)`.
    Fail,
    /// Return a result whose success flag is false.
    ReportFailure,
}

/// RAW converter that writes a small TIFF instead of running a tool.
pub struct FakeConverter {
    pub name: String,
    pub available: bool,
    pub behaviour: Behaviour,
    pub calls: AtomicUsize,
}

impl FakeConverter {
    pub fn new(name: &str, available: bool, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            available,
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Processor for FakeConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

impl RawConverter for FakeConverter {
    fn convert(&self, _cancel: &CancelToken, request: &RawConvertRequest) -> Result<RawConvertResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Succeed => {
                save_image(&make_frame(4, 4, 0.5), &request.output)?;
                Ok(RawConvertResult {
                    input: request.input.clone(),
                    output: request.output.clone(),
                    tool: self.name.clone(),
                    log: String::new(),
                    success: true,
                })
            }
            Behaviour::Fail => Err(PhotonicError::ToolFailed {
                tool: self.name.clone(),
                message: "exit code 1: boom".to_string(),
            }),
            Behaviour::ReportFailure => Ok(RawConvertResult {
                tool: self.name.clone(),
                log: "unsupported camera".to_string(),
                success: false,
                ..Default::default()
            }),
        }
    }
}

/// Aligner with a fixed quality score that copies nothing.
pub struct FakeAligner {
    pub name: String,
    pub available: bool,
    pub quality: Option<f64>,
    pub types: Vec<AlignmentType>,
}

impl FakeAligner {
    pub fn new(name: &str, quality: f64) -> Self {
        Self {
            name: name.to_string(),
            available: true,
            quality: Some(quality),
            types: vec![
                AlignmentType::General,
                AlignmentType::Panoramic,
                AlignmentType::Timelapse,
                AlignmentType::Astro,
            ],
        }
    }
}

impl Processor for FakeAligner {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

impl Scored for FakeAligner {
    fn estimate_quality(&self, _inputs: &[PathBuf]) -> Result<f64> {
        self.quality.ok_or(PhotonicError::EmptySequence)
    }
}

impl Aligner for FakeAligner {
    fn supports(&self, alignment_type: AlignmentType) -> bool {
        self.types.contains(&alignment_type)
    }

    fn align(&self, _cancel: &CancelToken, request: &AlignmentRequest) -> Result<AlignmentResult> {
        Ok(AlignmentResult {
            success: true,
            tool: self.name.clone(),
            aligned_images: request.images.clone(),
            ..Default::default()
        })
    }
}
