use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::JobType;

use super::{run_job, Options};

#[derive(Args)]
pub struct AlignArgs {
    /// Directory of images; the first one is the reference
    pub input: PathBuf,

    /// Directory for aligned images
    #[arg(short, long, default_value = "aligned")]
    pub output: PathBuf,

    /// Alignment type: general, panoramic, timelapse, astro (default: auto)
    #[arg(long = "type")]
    pub alignment_type: Option<String>,

    /// Use a specific aligner
    #[arg(long)]
    pub processor: Option<String>,

    /// fast, normal, high or ultra
    #[arg(long, default_value = "normal")]
    pub quality: String,

    /// Star threshold in standard deviations above the mean
    #[arg(long, alias = "star-threshold")]
    pub star_sensitivity: Option<f64>,

    /// Explicit images instead of listing the input directory
    #[arg(long, num_args = 1..)]
    pub images: Vec<String>,
}

pub fn run(config: &PhotonicConfig, args: &AlignArgs) -> Result<()> {
    let mut options = Options::default();
    options
        .text("type", args.alignment_type.as_deref())
        .text("processor", args.processor.as_deref())
        .text("quality", Some(args.quality.as_str()))
        .number("starSensitivity", args.star_sensitivity)
        .list("images", &args.images);

    run_job(config, JobType::Align, &options, &args.input, &args.output)?;
    Ok(())
}
