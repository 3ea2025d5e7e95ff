use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_KAPPA, DEFAULT_SIGMA_ITERATIONS, DEFAULT_WINSOR_PERCENT};
use crate::error::{PhotonicError, Result};
use crate::pipeline::job::StackOptions;

use super::sigma_clip::SigmaClipParams;

/// Per-pixel aggregation method.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StackMethod {
    Mean,
    Median,
    /// Order statistic at fraction `p` in [0, 1].
    Percentile(f32),
    SigmaClip(SigmaClipParams),
    /// Sigma clip with thresholds `1.5 * kappa` (low) and `2.0 * kappa` (high).
    KappaSigma { kappa: f32, iterations: usize },
    /// Percentile at `percent / 100`.
    Winsorized { percent: f32 },
    /// Brightest sample per pixel.
    Max,
    /// Darkest sample per pixel.
    Min,
    /// Exposure fusion (HDR). Only external stackers implement it.
    Exposure,
    /// Soft-masked fusion that keeps star trails.
    StarTrails,
    /// Contrast-weighted fusion favouring fine detail.
    Focus,
}

impl StackMethod {
    /// Resolve a method name plus its options.
    ///
    /// Unset parameters take the built-in defaults; callers that want
    /// configured defaults fill `options` first.
    pub fn parse(name: &str, options: &StackOptions) -> Result<Self> {
        let method = match name.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" | "astro" => Self::Mean,
            "median" => Self::Median,
            "percentile" => {
                let p = options.percentile.unwrap_or(0.5);
                if !(0.0..=1.0).contains(&p) {
                    return Err(PhotonicError::InvalidOption {
                        key: "percentile".into(),
                        reason: format!("{p} is outside [0, 1]"),
                    });
                }
                Self::Percentile(p)
            }
            "sigma-clip" | "sigma" => {
                let d = SigmaClipParams::default();
                Self::SigmaClip(SigmaClipParams {
                    sigma_low: options.sigma_low.unwrap_or(d.sigma_low),
                    sigma_high: options.sigma_high.unwrap_or(d.sigma_high),
                    iterations: options.iterations.unwrap_or(d.iterations),
                })
            }
            "kappa-sigma" => Self::KappaSigma {
                kappa: options.kappa.unwrap_or(DEFAULT_KAPPA),
                iterations: options.iterations.unwrap_or(DEFAULT_SIGMA_ITERATIONS),
            },
            "winsorized" => {
                let percent = options.winsor_percent.unwrap_or(DEFAULT_WINSOR_PERCENT);
                if !(0.0..=100.0).contains(&percent) {
                    return Err(PhotonicError::InvalidOption {
                        key: "winsorPercent".into(),
                        reason: format!("{percent} is outside [0, 100]"),
                    });
                }
                Self::Winsorized { percent }
            }
            "max" | "maximum" => Self::Max,
            "min" | "minimum" => Self::Min,
            "hdr" | "enfuse" | "exposure" => Self::Exposure,
            "star-trails" | "startrails" => Self::StarTrails,
            "focus" | "detail-enhancement" => Self::Focus,
            other => return Err(PhotonicError::UnknownMethod(other.to_string())),
        };
        Ok(method)
    }

    /// Whether the native statistical engine can compute this method.
    pub fn is_statistical(&self) -> bool {
        !matches!(self, Self::Exposure | Self::StarTrails | Self::Focus)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Percentile(_) => "percentile",
            Self::SigmaClip(_) => "sigma-clip",
            Self::KappaSigma { .. } => "kappa-sigma",
            Self::Winsorized { .. } => "winsorized",
            Self::Max => "max",
            Self::Min => "min",
            Self::Exposure => "exposure",
            Self::StarTrails => "star-trails",
            Self::Focus => "focus",
        }
    }
}

impl fmt::Display for StackMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
