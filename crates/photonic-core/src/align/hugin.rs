use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::cancel::CancelToken;
use crate::error::{PhotonicError, Result};
use crate::io::is_image_file;
use crate::selection::{Processor, Scored};
use crate::tools::{run_tool, tool_available};

use super::{Aligner, AlignmentRequest, AlignmentResult, AlignmentType};

const ALIGN_IMAGE_STACK: &str = "align_image_stack";

/// Hugin's `align_image_stack` (control-point based, handles rotation).
pub struct HuginAligner {
    enabled: bool,
}

impl HuginAligner {
    pub const NAME: &'static str = "hugin";

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

fn quality_args(quality: &str) -> &'static [&'static str] {
    match quality {
        "ultra" => &["-g", "10", "-s", "2"],
        "high" => &["-g", "8", "-s", "1"],
        "fast" => &["-g", "4"],
        _ => &[],
    }
}

impl Processor for HuginAligner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.enabled && tool_available(ALIGN_IMAGE_STACK)
    }
}

impl Scored for HuginAligner {
    fn estimate_quality(&self, images: &[PathBuf]) -> Result<f64> {
        if images.is_empty() {
            return Err(PhotonicError::EmptySequence);
        }
        Ok(0.8)
    }
}

impl Aligner for HuginAligner {
    fn supports(&self, alignment_type: AlignmentType) -> bool {
        matches!(alignment_type, AlignmentType::Panoramic | AlignmentType::General)
    }

    fn align(&self, cancel: &CancelToken, request: &AlignmentRequest) -> Result<AlignmentResult> {
        let start = Instant::now();
        if request.images.len() < 2 {
            return Err(PhotonicError::InsufficientImages {
                needed: 2,
                got: request.images.len(),
            });
        }
        std::fs::create_dir_all(&request.output_dir)?;

        let prefix = request.output_dir.join("aligned_");
        let mut args: Vec<String> = vec!["-a".into(), prefix.to_string_lossy().into_owned()];
        args.extend(quality_args(&request.quality).iter().map(|s| s.to_string()));
        args.extend(
            request
                .images
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );

        let output = run_tool(cancel, ALIGN_IMAGE_STACK, &args, None)?;

        let mut result = AlignmentResult::new(Self::NAME);
        let mut aligned: Vec<PathBuf> = std::fs::read_dir(&request.output_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                is_image_file(p)
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("aligned_"))
            })
            .collect();
        aligned.sort();
        result.reference_image = aligned.first().cloned();
        result.aligned_images = aligned;
        let log = output.stderr.trim();
        if !log.is_empty() {
            result.warnings.push(log.to_string());
        }

        result.finish(start)?;
        info!(aligned = result.aligned_images.len(), "hugin alignment complete");
        Ok(result)
    }
}
