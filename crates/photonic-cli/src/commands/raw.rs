use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::JobType;

use super::{run_job, Options};

#[derive(Args)]
pub struct RawArgs {
    /// RAW file, or a directory whose RAW files are converted into its cache
    pub input: PathBuf,

    /// Output directory for a single file
    #[arg(short, long, default_value = "converted")]
    pub output: PathBuf,

    /// darktable, rawtherapee, imagemagick or dcraw
    #[arg(long)]
    pub tool: Option<String>,

    /// Reconvert even when cached
    #[arg(long)]
    pub no_cache: bool,
}

pub fn run(config: &PhotonicConfig, args: &RawArgs) -> Result<()> {
    let mut options = Options::default();
    options
        .text("tool", args.tool.as_deref())
        .flag("noCache", args.no_cache);

    run_job(config, JobType::RawConvert, &options, &args.input, &args.output)?;
    Ok(())
}
