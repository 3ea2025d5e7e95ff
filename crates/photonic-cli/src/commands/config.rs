use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use photonic_core::config::PhotonicConfig;

use super::load_config;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the configuration after merging `--config` over the defaults
    #[arg(long)]
    pub effective: bool,
}

/// Print or save the configuration as TOML.
pub fn run(config_path: Option<&Path>, args: &ConfigArgs) -> Result<()> {
    let config = if args.effective {
        load_config(config_path)?
    } else {
        PhotonicConfig::default()
    };
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            println!("Config saved to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
