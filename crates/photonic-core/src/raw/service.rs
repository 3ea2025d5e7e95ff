use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::RawConfig;
use crate::consts::RAW_CACHE_DIR;
use crate::error::{PhotonicError, Result};
use crate::io::{is_raw_file, list_images};
use crate::selection::{run_fallback_chain, FallbackChain, Registry};

use super::{CommandConverter, ConverterKind, RawConvertRequest, RawConvertResult, RawConverter};

/// Order tried after the explicit and configured tools.
pub const RAW_TOOL_PRIORITY: [&str; 4] = ["imagemagick", "darktable", "dcraw", "rawtherapee"];

/// Outcome of converting one directory's RAW files.
#[derive(Clone, Debug, Default)]
pub struct PreprocessReport {
    /// Directory holding the converted images.
    pub dir: PathBuf,
    pub converted: usize,
    /// RAW files whose cached conversion was reused.
    pub cached: usize,
    /// One line per file that could not be converted.
    pub failures: Vec<String>,
}

/// A cache entry is valid when it exists and is not older than its RAW file.
/// Equal mtimes count as fresh; coarse filesystem clocks often produce them.
pub fn cache_is_valid(raw: &Path, cached: &Path) -> bool {
    let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(raw), modified(cached)) {
        (Some(raw_time), Some(cached_time)) => cached_time >= raw_time,
        _ => false,
    }
}

/// RAW converter registry plus the policy for picking among converters.
pub struct RawConversionService {
    registry: Registry<dyn RawConverter>,
    config: RawConfig,
}

impl RawConversionService {
    /// Register the command-line converters in priority order.
    pub fn new(config: RawConfig) -> Result<Self> {
        let mut registry: Registry<dyn RawConverter> = Registry::new();
        let tools = [
            (ConverterKind::Darktable, &config.darktable),
            (ConverterKind::RawTherapee, &config.rawtherapee),
            (ConverterKind::ImageMagick, &config.imagemagick),
            (ConverterKind::Dcraw, &config.dcraw),
        ];
        for (kind, tool) in tools {
            registry.register(Arc::new(CommandConverter::new(kind, tool.clone())))?;
        }
        Ok(Self { registry, config })
    }

    pub fn with_registry(registry: Registry<dyn RawConverter>, config: RawConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Registry<dyn RawConverter> {
        &self.registry
    }

    /// `<output_dir>/<stem>.<output_format>`
    pub fn output_path(&self, input: &Path, output_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "converted".to_string());
        output_dir.join(format!("{stem}.{}", self.config.output_format))
    }

    /// Convert one file, trying `preferred`, the configured default, then
    /// [`RAW_TOOL_PRIORITY`].
    pub fn convert_with_fallback(
        &self,
        cancel: &CancelToken,
        input: &Path,
        output_dir: &Path,
        preferred: Option<&str>,
    ) -> Result<RawConvertResult> {
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(PhotonicError::InvalidOption {
                key: "output".into(),
                reason: format!("{} exists and is not a directory", output_dir.display()),
            });
        }
        std::fs::create_dir_all(output_dir)?;

        let request = RawConvertRequest {
            input: input.to_path_buf(),
            output: self.output_path(input, output_dir),
        };
        let chain = FallbackChain {
            explicit: preferred.map(str::to_string),
            default: self.config.default_tool.clone(),
            priority: RAW_TOOL_PRIORITY.iter().map(|s| s.to_string()).collect(),
        };

        run_fallback_chain(&self.registry, &chain, "raw", |converter| {
            converter.convert(cancel, &request)
        })
    }

    /// Convert every RAW file found under `input` into the `processed` cache
    /// next to it.
    ///
    /// Returns `None` when there are no RAW files. Cached conversions newer than
    /// their RAW file are reused unless `ignore_cache` is set. Individual
    /// failures are reported; the call fails only when nothing usable remains.
    pub fn preprocess_directory(
        &self,
        cancel: &CancelToken,
        input: &Path,
        preferred: Option<&str>,
        ignore_cache: bool,
    ) -> Result<Option<PreprocessReport>> {
        let raw_files: Vec<PathBuf> = list_images(input)?
            .into_iter()
            .filter(|p| is_raw_file(p))
            .collect();
        if raw_files.is_empty() {
            return Ok(None);
        }

        let base = if input.is_dir() {
            input
        } else {
            input.parent().unwrap_or(Path::new("."))
        };
        let mut report = PreprocessReport {
            dir: base.join(RAW_CACHE_DIR),
            ..Default::default()
        };
        std::fs::create_dir_all(&report.dir)?;

        info!(
            input = %input.display(),
            raw_files = raw_files.len(),
            cache = %report.dir.display(),
            "preprocessing RAW files"
        );

        for (i, raw) in raw_files.iter().enumerate() {
            cancel.check()?;
            let cached = self.output_path(raw, &report.dir);
            if !ignore_cache && cache_is_valid(raw, &cached) {
                report.cached += 1;
                continue;
            }

            info!(file = %raw.display(), progress = %format!("{}/{}", i + 1, raw_files.len()), "converting RAW file");
            match self.convert_with_fallback(cancel, raw, &report.dir, preferred) {
                Ok(_) => report.converted += 1,
                Err(PhotonicError::Cancelled) => return Err(PhotonicError::Cancelled),
                Err(e) => {
                    warn!(file = %raw.display(), error = %e, "RAW conversion failed");
                    report.failures.push(format!("{}: {e}", raw.display()));
                }
            }
        }

        if report.converted + report.cached == 0 {
            return Err(PhotonicError::AllProcessorsFailed {
                task: "raw".to_string(),
                attempts: report.failures,
            });
        }

        info!(
            converted = report.converted,
            cached = report.cached,
            failed = report.failures.len(),
            "RAW preprocessing complete"
        );
        Ok(Some(report))
    }
}
