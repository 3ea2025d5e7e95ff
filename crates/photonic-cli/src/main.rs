mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photonic", about = "Photo processing pipeline: stacking, alignment, timelapses and panoramas")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List images under a directory and detect groups
    Scan(commands::scan::ScanArgs),
    /// Stack a set of images into one
    Stack(commands::stack::StackArgs),
    /// Align a sequence of images
    Align(commands::align::AlignArgs),
    /// Convert RAW files
    Raw(commands::raw::RawArgs),
    /// Encode a timelapse video
    Timelapse(commands::timelapse::TimelapseArgs),
    /// Stitch a panorama
    Panoramic(commands::panoramic::PanoramicArgs),
    /// Show which processors and external tools are available
    Tools,
    /// Print the default (or effective) configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Config(args) = &cli.command {
        return commands::config::run(cli.config.as_deref(), args);
    }

    let config = commands::load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Scan(args) => commands::scan::run(&config, args),
        Commands::Stack(args) => commands::stack::run(&config, args),
        Commands::Align(args) => commands::align::run(&config, args),
        Commands::Raw(args) => commands::raw::run(&config, args),
        Commands::Timelapse(args) => commands::timelapse::run(&config, args),
        Commands::Panoramic(args) => commands::panoramic::run(&config, args),
        Commands::Tools => commands::tools::run(&config),
        Commands::Config(_) => Ok(()),
    }
}
