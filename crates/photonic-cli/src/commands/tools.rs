use anyhow::{Context, Result};
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::Router;
use photonic_core::selection::Processor;
use photonic_core::tools::tool_available;

use crate::summary::{print_availability, Availability};

/// Binaries the timelapse and panorama jobs call directly.
const EXTERNAL_TOOLS: [&str; 9] = [
    "ffmpeg",
    "pto_gen",
    "cpfind",
    "cpclean",
    "autooptimiser",
    "pano_modify",
    "hugin_executor",
    "nona",
    "enblend",
];

pub fn run(config: &PhotonicConfig) -> Result<()> {
    let router = Router::new(config.clone()).context("Failed to set up processors")?;

    let aligners: Vec<Availability> = router
        .aligners()
        .iter()
        .map(|p| Availability::new(p.name(), p.is_available()))
        .collect();
    let stackers: Vec<Availability> = router
        .stackers()
        .iter()
        .map(|p| Availability::new(p.name(), p.is_available()))
        .collect();
    let converters: Vec<Availability> = router
        .raw()
        .registry()
        .iter()
        .map(|p| Availability::new(p.name(), p.is_available()))
        .collect();
    let tools: Vec<Availability> = EXTERNAL_TOOLS
        .iter()
        .map(|t| Availability::new(t, tool_available(t)))
        .collect();

    print_availability(&[
        ("Aligners", aligners),
        ("Stackers", stackers),
        ("RAW converters", converters),
        ("External tools", tools),
    ]);
    Ok(())
}
