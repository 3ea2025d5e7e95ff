use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::JobType;

use super::{run_job, Options};

#[derive(Args)]
pub struct PanoramicArgs {
    /// Directory of overlapping images
    pub input: PathBuf,

    /// Output image
    #[arg(short, long, default_value = "panorama.tif")]
    pub output: PathBuf,

    /// cylindrical, spherical, planar, fisheye, stereographic, mercator
    #[arg(long, default_value = "cylindrical")]
    pub projection: String,

    /// multiband, feather or none
    #[arg(long, default_value = "multiband")]
    pub blending: String,

    /// fast, normal, high or ultra
    #[arg(long, default_value = "normal")]
    pub quality: String,

    /// Control point cleaning: low, moderate or high
    #[arg(long, default_value = "moderate")]
    pub aggression: String,

    /// Preferred RAW converter
    #[arg(long)]
    pub raw_tool: Option<String>,

    /// Reconvert RAW files even when cached
    #[arg(long)]
    pub no_cache: bool,

    /// Remove converted RAW files afterwards
    #[arg(long)]
    pub no_preserve: bool,
}

pub fn run(config: &PhotonicConfig, args: &PanoramicArgs) -> Result<()> {
    let mut options = Options::default();
    options
        .text("projection", Some(args.projection.as_str()))
        .text("blending", Some(args.blending.as_str()))
        .text("quality", Some(args.quality.as_str()))
        .text("aggression", Some(args.aggression.as_str()))
        .text("rawTool", args.raw_tool.as_deref())
        .flag("noCache", args.no_cache)
        .flag("noPreserve", args.no_preserve);

    run_job(config, JobType::Panoramic, &options, &args.input, &args.output)?;
    Ok(())
}
