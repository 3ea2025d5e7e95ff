use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::detect::{detect_stars, StarDetectionConfig};
use crate::error::{PhotonicError, Result};
use crate::frame::{StarPoint, TransformRecord};
use crate::io::{load_image, save_image};
use crate::selection::{Processor, Scored};

use super::roll::roll;
use super::star_match::{estimate_translation, match_stars};
use super::{aligned_output_path, Aligner, AlignmentRequest, AlignmentResult, AlignmentType};

/// Star-field alignment: detect point sources, match them against the first
/// image, and undo the median translation with a cyclic roll.
pub struct StarAligner {
    enabled: bool,
}

impl StarAligner {
    pub const NAME: &'static str = "star-alignment";

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Processor for StarAligner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.enabled
    }
}

impl Scored for StarAligner {
    fn estimate_quality(&self, _images: &[PathBuf]) -> Result<f64> {
        Ok(0.9)
    }
}

/// What happened to one target image.
enum TargetOutcome {
    Aligned {
        output: PathBuf,
        transform: TransformRecord,
        matches: usize,
    },
    Skipped(String),
}

fn align_target(
    cancel: &CancelToken,
    config: &StarDetectionConfig,
    reference_stars: &[StarPoint],
    output_dir: &Path,
    index: usize,
    path: &Path,
) -> Result<TargetOutcome> {
    cancel.check()?;
    let target = match load_image(path) {
        Ok(frame) => frame,
        Err(e) => {
            return Ok(TargetOutcome::Skipped(format!(
                "failed to load {}: {e}",
                path.display()
            )))
        }
    };

    let stars = detect_stars(&target.luminance(), config);
    let matches = match_stars(reference_stars, &stars, config.match_distance);
    if matches.len() < config.min_matches {
        return Ok(TargetOutcome::Skipped(format!(
            "insufficient star matches in {}: {} matches",
            path.display(),
            matches.len()
        )));
    }

    let offset = estimate_translation(&matches)?;
    debug!(image = %path.display(), dx = offset.dx, dy = offset.dy, matches = matches.len(), "star transform");

    let output = aligned_output_path(output_dir, index, path);
    save_image(&roll(&target, -offset.dx, -offset.dy), &output)?;

    Ok(TargetOutcome::Aligned {
        output,
        transform: TransformRecord {
            image: path.to_path_buf(),
            dx: offset.dx,
            dy: offset.dy,
        },
        matches: matches.len(),
    })
}

impl Aligner for StarAligner {
    fn supports(&self, alignment_type: AlignmentType) -> bool {
        alignment_type == AlignmentType::Astro
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
        let config = &request.star;

        let reference = load_image(&images[0])?;
        let reference_stars = detect_stars(&reference.luminance(), config);
        if reference_stars.is_empty() {
            return Err(PhotonicError::InsufficientStars { found: 0 });
        }
        info!(
            reference = %images[0].display(),
            stars = reference_stars.len(),
            "detected reference stars"
        );

        let reference_out = aligned_output_path(&request.output_dir, 0, &images[0]);
        save_image(&reference, &reference_out)?;

        let mut result = AlignmentResult::new(Self::NAME);
        result.star_count = reference_stars.len();
        result.reference_image = Some(reference_out.clone());
        result.aligned_images.push(reference_out);
        result.transforms.push(TransformRecord {
            image: images[0].clone(),
            ..Default::default()
        });

        let outcomes: Vec<Result<TargetOutcome>> = images
            .par_iter()
            .enumerate()
            .skip(1)
            .map(|(i, path)| {
                match align_target(cancel, config, &reference_stars, &request.output_dir, i, path) {
                    Err(PhotonicError::Cancelled) => Err(PhotonicError::Cancelled),
                    Err(e) => Ok(TargetOutcome::Skipped(format!(
                        "failed to align {}: {e}",
                        path.display()
                    ))),
                    ok => ok,
                }
            })
            .collect();

        // Only cancellation reaches here as an error.
        for outcome in outcomes {
            match outcome? {
                TargetOutcome::Aligned {
                    output,
                    transform,
                    matches,
                } => {
                    result.aligned_images.push(output);
                    result.transforms.push(transform);
                    result.match_count += matches;
                }
                TargetOutcome::Skipped(reason) => {
                    warn!("{reason}");
                    result.warnings.push(reason);
                }
            }
        }

        result.finish(start)?;
        info!(
            aligned = result.aligned_images.len(),
            total = images.len(),
            elapsed_ms = result.processing_time.as_millis() as u64,
            "star alignment complete"
        );
        Ok(result)
    }
}
