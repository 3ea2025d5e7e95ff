use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::JobType;

use super::{run_job, Options};

#[derive(Clone, Copy, ValueEnum)]
pub enum StackMethodArg {
    Average,
    Median,
    Percentile,
    SigmaClip,
    KappaSigma,
    Winsorized,
    Max,
    Min,
    Hdr,
    StarTrails,
    Focus,
}

impl StackMethodArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Median => "median",
            Self::Percentile => "percentile",
            Self::SigmaClip => "sigma-clip",
            Self::KappaSigma => "kappa-sigma",
            Self::Winsorized => "winsorized",
            Self::Max => "max",
            Self::Min => "min",
            Self::Hdr => "hdr",
            Self::StarTrails => "star-trails",
            Self::Focus => "focus",
        }
    }
}

#[derive(Args)]
pub struct StackArgs {
    /// Directory of images to stack
    pub input: PathBuf,

    /// Output image (.tif or .png)
    #[arg(short, long, default_value = "stacked.tif")]
    pub output: PathBuf,

    /// Stacking method
    #[arg(long, value_enum, default_value = "average")]
    pub method: StackMethodArg,

    /// Lower rejection threshold in standard deviations
    #[arg(long)]
    pub sigma_low: Option<f64>,

    /// Upper rejection threshold in standard deviations
    #[arg(long)]
    pub sigma_high: Option<f64>,

    /// Rejection passes
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Kappa for kappa-sigma rejection
    #[arg(long)]
    pub kappa: Option<f64>,

    /// Order statistic for the percentile method (0-1)
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Percentile (0-100) used by the winsorized method
    #[arg(long)]
    pub winsor_percent: Option<f64>,

    /// Align before stacking: general, panoramic, timelapse, astro
    #[arg(long)]
    pub alignment: Option<String>,

    /// Use a specific stacker
    #[arg(long)]
    pub stacker: Option<String>,

    /// Astro mode: keep rejection methods on the native stacker
    #[arg(long)]
    pub astro: bool,

    /// Preferred RAW converter
    #[arg(long)]
    pub raw_tool: Option<String>,

    /// Reconvert RAW files even when cached
    #[arg(long)]
    pub no_cache: bool,
}

pub fn run(config: &PhotonicConfig, args: &StackArgs) -> Result<()> {
    let mut options = Options::default();
    options
        .text("method", Some(args.method.as_str()))
        .number("sigmaLow", args.sigma_low)
        .number("sigmaHigh", args.sigma_high)
        .number("iterations", args.iterations.map(f64::from))
        .number("kappa", args.kappa)
        .number("percentile", args.percentile)
        .number("winsorPercent", args.winsor_percent)
        .text("alignment", args.alignment.as_deref())
        .text("stacker", args.stacker.as_deref())
        .flag("astroMode", args.astro)
        .text("rawTool", args.raw_tool.as_deref())
        .flag("noCache", args.no_cache);

    run_job(config, JobType::Stack, &options, &args.input, &args.output)?;
    Ok(())
}
