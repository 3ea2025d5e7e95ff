use std::path::PathBuf;
use std::time::Instant;

use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{PhotonicError, Result};
use crate::frame::{AlignmentOffset, TransformRecord};
use crate::io::{load_image, save_image};
use crate::selection::{Processor, Scored};

use super::roll::roll;
use super::{aligned_output_path, Aligner, AlignmentRequest, AlignmentResult, AlignmentType};

/// Whole-image translation via FFT phase correlation.
pub struct PhaseCorrelationAligner {
    enabled: bool,
}

impl PhaseCorrelationAligner {
    pub const NAME: &'static str = "phase-correlation";

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Processor for PhaseCorrelationAligner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.enabled
    }
}

impl Scored for PhaseCorrelationAligner {
    fn estimate_quality(&self, images: &[PathBuf]) -> Result<f64> {
        if images.is_empty() {
            return Err(PhotonicError::EmptySequence);
        }
        Ok(0.7)
    }
}

impl Aligner for PhaseCorrelationAligner {
    fn supports(&self, alignment_type: AlignmentType) -> bool {
        matches!(
            alignment_type,
            AlignmentType::General | AlignmentType::Timelapse | AlignmentType::Astro
        )
    }

    fn align(&self, cancel: &CancelToken, request: &AlignmentRequest) -> Result<AlignmentResult> {
        let start = Instant::now();
        let images = &request.images;
        if images.len() < 2 {
            return Err(PhotonicError::InsufficientImages {
                needed: 2,
                got: images.len(),
            });
        }
        std::fs::create_dir_all(&request.output_dir)?;

        let reference = load_image(&images[0])?;
        let reference_luma = reference.luminance();
        let reference_out = aligned_output_path(&request.output_dir, 0, &images[0]);
        save_image(&reference, &reference_out)?;

        let outcomes: Vec<Result<(PathBuf, TransformRecord)>> = images
            .par_iter()
            .enumerate()
            .skip(1)
            .map(|(i, path)| -> Result<(PathBuf, TransformRecord)> {
                cancel.check()?;
                let target = load_image(path)?;
                let offset = compute_offset_array(&reference_luma, &target.luminance())?;
                let out = aligned_output_path(&request.output_dir, i, path);
                save_image(&roll(&target, -offset.dx, -offset.dy), &out)?;
                Ok((
                    out,
                    TransformRecord {
                        image: path.clone(),
                        dx: offset.dx,
                        dy: offset.dy,
                    },
                ))
            })
            .collect();

        let mut result = AlignmentResult::new(Self::NAME);
        result.reference_image = Some(reference_out.clone());
        result.aligned_images.push(reference_out);
        result.transforms.push(TransformRecord {
            image: images[0].clone(),
            ..Default::default()
        });

        for (path, outcome) in images.iter().skip(1).zip(outcomes) {
            match outcome {
                Ok((out, transform)) => {
                    result.aligned_images.push(out);
                    result.transforms.push(transform);
                }
                Err(PhotonicError::Cancelled) => return Err(PhotonicError::Cancelled),
                Err(e) => {
                    warn!(image = %path.display(), error = %e, "skipping image");
                    result
                        .warnings
                        .push(format!("failed to align {}: {e}", path.display()));
                }
            }
        }

        result.finish(start)?;
        info!(
            aligned = result.aligned_images.len(),
            elapsed_ms = result.processing_time.as_millis() as u64,
            "phase correlation alignment complete"
        );
        Ok(result)
    }
}

/// Displacement of `target` relative to `reference`, to the nearest pixel.
///
/// If `target` is `reference` shifted by `(+dx, +dy)` the result is
/// `(dx, dy)`.
pub fn compute_offset_array(
    reference: &Array2<f32>,
    target: &Array2<f32>,
) -> Result<AlignmentOffset> {
    let (h, w) = reference.dim();
    let (th, tw) = target.dim();
    if h != th || w != tw {
        return Err(PhotonicError::DimensionMismatch {
            expected: (h, w, 1),
            got: (th, tw, 1),
        });
    }

    // Hann window to reduce spectral leakage
    let ref_fft = fft2d(&apply_hann(reference));
    let tgt_fft = fft2d(&apply_hann(target));

    let correlation = ifft2d(&normalized_cross_power(&tgt_fft, &ref_fft));
    let (peak_row, peak_col) = find_peak(&correlation);

    // Wrap-around to signed offsets
    let dy = if peak_row > h / 2 {
        peak_row as f64 - h as f64
    } else {
        peak_row as f64
    };
    let dx = if peak_col > w / 2 {
        peak_col as f64 - w as f64
    } else {
        peak_col as f64
    };

    Ok(AlignmentOffset { dx, dy })
}

fn apply_hann(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut result = Array2::<f32>::zeros((h, w));

    for row in 0..h {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        for col in 0..w {
            let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
            result[[row, col]] = data[[row, col]] * (wy * wx) as f32;
        }
    }

    result
}

/// 2D FFT: row-wise, then column-wise.
fn fft2d(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v as f64, 0.0));

    for mut row in result.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        fft_row.process(&mut buf);
        row.assign(&ndarray::ArrayView1::from(&buf[..]));
    }
    for mut col in result.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        fft_col.process(&mut buf);
        col.assign(&ndarray::ArrayView1::from(&buf[..]));
    }

    result
}

/// Inverse 2D FFT, real part, normalized.
fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    for mut col in work.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        ifft_col.process(&mut buf);
        col.assign(&ndarray::ArrayView1::from(&buf[..]));
    }
    for mut row in work.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        ifft_row.process(&mut buf);
        row.assign(&ndarray::ArrayView1::from(&buf[..]));
    }

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

/// `a * conj(b) / |a * conj(b)|`; peaks at the displacement of `a` from `b`.
fn normalized_cross_power(
    a: &Array2<Complex<f64>>,
    b: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = Array2::<Complex<f64>>::zeros(a.dim());
    ndarray::Zip::from(&mut result)
        .and(a)
        .and(b)
        .for_each(|out, &x, &y| {
            let cross = x * y.conj();
            let mag = cross.norm();
            *out = if mag > 1e-12 {
                cross / mag
            } else {
                Complex::new(0.0, 0.0)
            };
        });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &v) in data.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (row, col);
        }
    }
    best
}
