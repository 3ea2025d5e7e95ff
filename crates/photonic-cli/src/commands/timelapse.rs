use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::JobType;

use super::{run_job, Options};

#[derive(Args)]
pub struct TimelapseArgs {
    /// Directory of frames
    pub input: PathBuf,

    /// Output file; its extension is replaced per format
    #[arg(short, long, default_value = "timelapse.mp4")]
    pub output: PathBuf,

    /// Write every format into this directory instead
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Output formats: mp4, mp4-h265, gif
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<String>,

    /// 1080p, 720p, 480p or 240p
    #[arg(long)]
    pub resolution: Option<String>,

    /// Align frames before encoding
    #[arg(long)]
    pub stabilize: bool,

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

pub fn run(config: &PhotonicConfig, args: &TimelapseArgs) -> Result<()> {
    let output_dir = args.output_dir.as_ref().map(|p| p.display().to_string());
    let mut options = Options::default();
    options
        .number("fps", args.fps.map(f64::from))
        .list("formats", &args.formats)
        .text("resolution", args.resolution.as_deref())
        .text("outputDir", output_dir.as_deref())
        .flag("stabilize", args.stabilize)
        .text("rawTool", args.raw_tool.as_deref())
        .flag("noCache", args.no_cache)
        .flag("noPreserve", args.no_preserve);

    run_job(config, JobType::Timelapse, &options, &args.input, &args.output)?;
    Ok(())
}
