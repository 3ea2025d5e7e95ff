use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::JobType;

use super::{run_job, Options};

#[derive(Args)]
pub struct ScanArgs {
    /// Directory to scan
    pub input: PathBuf,
}

pub fn run(config: &PhotonicConfig, args: &ScanArgs) -> Result<()> {
    run_job(config, JobType::Scan, &Options::default(), &args.input, &args.input)?;
    Ok(())
}
