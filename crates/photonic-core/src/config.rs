use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_KAPPA, DEFAULT_PARALLEL_JOBS, DEFAULT_SUBSCRIBER_BUFFER, DEFAULT_WINSOR_PERCENT,
};
use crate::detect::StarDetectionConfig;
use crate::pipeline::job::StackOptions;
use crate::stack::SigmaClipParams;

/// Top-level configuration, usually read from a TOML file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotonicConfig {
    pub processing: ProcessingConfig,
    pub alignment: AlignmentConfig,
    pub raw: RawConfig,
    pub stacking: StackingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Worker thread count.
    pub parallel_jobs: usize,
    /// Results buffered per subscriber before new ones are dropped.
    pub subscriber_buffer: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_jobs: DEFAULT_PARALLEL_JOBS,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub default_processor: Option<String>,
    pub star: StarDetectionConfig,
    pub astro_enabled: bool,
    pub phase_correlation_enabled: bool,
    pub hugin_enabled: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            default_processor: None,
            star: StarDetectionConfig::default(),
            astro_enabled: true,
            phase_correlation_enabled: true,
            hugin_enabled: true,
        }
    }
}

/// Per-tool switches for external RAW converters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub enabled: bool,
    /// Binary name or path, overriding the tool's usual executable.
    pub binary: Option<String>,
    /// Appended to the tool's arguments before the input file.
    pub extra_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: None,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub default_tool: Option<String>,
    /// Extension of converted files (`tiff`, `png` or `jpg`).
    pub output_format: String,
    pub darktable: ToolConfig,
    pub rawtherapee: ToolConfig,
    pub imagemagick: ToolConfig,
    pub dcraw: ToolConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            default_tool: None,
            output_format: "tiff".to_string(),
            darktable: ToolConfig::default(),
            rawtherapee: ToolConfig::default(),
            imagemagick: ToolConfig::default(),
            dcraw: ToolConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingConfig {
    pub default_stacker: Option<String>,
    pub sigma: SigmaClipParams,
    pub kappa: f32,
    pub winsor_percent: f32,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            default_stacker: None,
            sigma: SigmaClipParams::default(),
            kappa: DEFAULT_KAPPA,
            winsor_percent: DEFAULT_WINSOR_PERCENT,
        }
    }
}

impl StackingConfig {
    /// Fill unset numeric parameters in `options` from these defaults.
    pub fn fill(&self, options: &mut StackOptions) {
        options.sigma_low.get_or_insert(self.sigma.sigma_low);
        options.sigma_high.get_or_insert(self.sigma.sigma_high);
        options.iterations.get_or_insert(self.sigma.iterations);
        options.kappa.get_or_insert(self.kappa);
        options.winsor_percent.get_or_insert(self.winsor_percent);
    }
}
