use std::path::PathBuf;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::info;

use crate::cancel::CancelToken;
use crate::error::{PhotonicError, Result};
use crate::frame::Frame;
use crate::io::{load_image, save_image};
use crate::selection::{Processor, Scored};
use crate::tools::{run_tool, tool_available};

use super::{stack_frames, StackMethod};

#[derive(Clone, Debug)]
pub struct StackRequest {
    /// Aligned, same-sized inputs.
    pub images: Vec<PathBuf>,
    pub output: PathBuf,
    pub method: StackMethod,
}

#[derive(Clone, Debug, Default)]
pub struct StackResult {
    pub success: bool,
    pub tool: String,
    pub output: PathBuf,
    pub method: String,
    pub image_count: usize,
    pub rejected_pixels: u64,
    pub processing_time: Duration,
    pub warnings: Vec<String>,
}

/// A registered stacking implementation.
pub trait Stacker: Scored {
    fn supports(&self, method: &StackMethod) -> bool;

    fn stack(&self, cancel: &CancelToken, request: &StackRequest) -> Result<StackResult>;
}

fn require_two(images: &[PathBuf]) -> Result<()> {
    if images.len() < 2 {
        return Err(PhotonicError::InsufficientImages {
            needed: 2,
            got: images.len(),
        });
    }
    Ok(())
}

/// In-process statistical stacker.
#[derive(Default)]
pub struct NativeStacker;

impl NativeStacker {
    pub const NAME: &'static str = "native";
}

impl Processor for NativeStacker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        true
    }
}

impl Scored for NativeStacker {
    fn estimate_quality(&self, images: &[PathBuf]) -> Result<f64> {
        require_two(images)?;
        Ok(0.9)
    }
}

impl Stacker for NativeStacker {
    fn supports(&self, method: &StackMethod) -> bool {
        method.is_statistical()
    }

    fn stack(&self, cancel: &CancelToken, request: &StackRequest) -> Result<StackResult> {
        let start = Instant::now();
        require_two(&request.images)?;
        cancel.check()?;

        let frames: Vec<Frame> = request
            .images
            .par_iter()
            .map(|p| load_image(p))
            .collect::<Result<_>>()?;
        cancel.check()?;

        let outcome = stack_frames(&frames, &request.method)?;
        save_image(&outcome.frame, &request.output)?;

        let processing_time = start.elapsed();
        info!(
            method = %request.method,
            images = frames.len(),
            rejected = outcome.rejected_pixels,
            elapsed_ms = processing_time.as_millis() as u64,
            "native stack complete"
        );

        Ok(StackResult {
            success: true,
            tool: Self::NAME.to_string(),
            output: request.output.clone(),
            method: request.method.name().to_string(),
            image_count: frames.len(),
            rejected_pixels: outcome.rejected_pixels,
            processing_time,
            warnings: Vec::new(),
        })
    }
}

const ENFUSE: &str = "enfuse";

/// `enfuse` weighting for each fusion mode.
pub fn fusion_weights(method: &StackMethod) -> &'static [&'static str] {
    match method {
        StackMethod::StarTrails => &[
            "--exposure-weight=1",
            "--saturation-weight=0.2",
            "--contrast-weight=0",
            "--entropy-weight=0",
            "--soft-mask",
        ],
        StackMethod::Focus => &[
            "--exposure-weight=0.8",
            "--saturation-weight=0.3",
            "--contrast-weight=0.5",
            "--entropy-weight=0.2",
            "--hard-mask",
            "--levels=7",
        ],
        _ => &[
            "--exposure-weight=1",
            "--saturation-weight=0.2",
            "--contrast-weight=1",
        ],
    }
}

/// Exposure fusion through Hugin's `enfuse`.
pub struct EnfuseStacker {
    enabled: bool,
}

impl EnfuseStacker {
    pub const NAME: &'static str = "enfuse";

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Processor for EnfuseStacker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.enabled && tool_available(ENFUSE)
    }
}

impl Scored for EnfuseStacker {
    fn estimate_quality(&self, images: &[PathBuf]) -> Result<f64> {
        require_two(images)?;
        Ok(0.6)
    }
}

impl Stacker for EnfuseStacker {
    fn supports(&self, method: &StackMethod) -> bool {
        !method.is_statistical()
    }

    fn stack(&self, cancel: &CancelToken, request: &StackRequest) -> Result<StackResult> {
        let start = Instant::now();
        require_two(&request.images)?;
        if let Some(parent) = request.output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut args: Vec<String> = fusion_weights(&request.method)
            .iter()
            .map(|a| a.to_string())
            .collect();
        args.push("--depth=16".into());
        args.push(format!("--output={}", request.output.display()));
        args.extend(
            request
                .images
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );
        run_tool(cancel, ENFUSE, &args, None)?;

        if !request.output.exists() {
            return Err(PhotonicError::ToolFailed {
                tool: ENFUSE.to_string(),
                message: format!("output {} was not created", request.output.display()),
            });
        }

        Ok(StackResult {
            success: true,
            tool: Self::NAME.to_string(),
            output: request.output.clone(),
            method: request.method.name().to_string(),
            image_count: request.images.len(),
            rejected_pixels: 0,
            processing_time: start.elapsed(),
            warnings: Vec::new(),
        })
    }
}
