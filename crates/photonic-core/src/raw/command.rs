use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::ToolConfig;
use crate::error::{PhotonicError, Result};
use crate::selection::Processor;
use crate::tools::{run_tool, tool_available};

use super::{RawConvertRequest, RawConvertResult, RawConverter};

const MAGICK: &str = "magick";

/// Which command-line converter a [`CommandConverter`] drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConverterKind {
    Darktable,
    RawTherapee,
    ImageMagick,
    /// `dcraw -c` piped into `magick`.
    Dcraw,
}

impl ConverterKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Darktable => "darktable",
            Self::RawTherapee => "rawtherapee",
            Self::ImageMagick => "imagemagick",
            Self::Dcraw => "dcraw",
        }
    }

    fn default_binary(&self) -> &'static str {
        match self {
            Self::Darktable => "darktable-cli",
            Self::RawTherapee => "rawtherapee-cli",
            Self::ImageMagick => MAGICK,
            Self::Dcraw => "dcraw",
        }
    }
}

/// RAW converter backed by an external executable.
pub struct CommandConverter {
    kind: ConverterKind,
    config: ToolConfig,
}

impl CommandConverter {
    pub fn new(kind: ConverterKind, config: ToolConfig) -> Self {
        Self { kind, config }
    }

    pub fn kind(&self) -> ConverterKind {
        self.kind
    }

    fn binary(&self) -> &str {
        self.config
            .binary
            .as_deref()
            .unwrap_or(self.kind.default_binary())
    }
}

/// Sidecar next to a RAW file: `IMG.CR2.xmp`, then `IMG.xmp`.
fn find_xmp(input: &Path) -> Option<PathBuf> {
    let mut appended = input.as_os_str().to_owned();
    appended.push(".xmp");
    let appended = PathBuf::from(appended);
    if appended.is_file() {
        return Some(appended);
    }
    let replaced = input.with_extension("xmp");
    replaced.is_file().then_some(replaced)
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Processor for CommandConverter {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn is_available(&self) -> bool {
        if !self.config.enabled || !tool_available(self.binary()) {
            return false;
        }
        self.kind != ConverterKind::Dcraw || tool_available(MAGICK)
    }
}

impl RawConverter for CommandConverter {
    fn convert(&self, cancel: &CancelToken, request: &RawConvertRequest) -> Result<RawConvertResult> {
        if !request.input.is_file() {
            return Err(PhotonicError::ToolFailed {
                tool: self.name().to_string(),
                message: format!("input file does not exist: {}", request.input.display()),
            });
        }
        if let Some(parent) = request.output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let input = lossy(&request.input);
        let output = lossy(&request.output);
        let extra = self.config.extra_args.iter().cloned();

        let log = match self.kind {
            ConverterKind::Darktable => {
                let mut args = vec![input];
                if let Some(xmp) = find_xmp(&request.input) {
                    debug!(xmp = %xmp.display(), "using sidecar");
                    args.push(lossy(&xmp));
                }
                args.push(output);
                args.extend(extra);
                run_tool(cancel, self.binary(), &args, None)?.stderr
            }
            ConverterKind::RawTherapee => {
                let mut args = vec!["-o".to_string(), output, "-Y".to_string()];
                match request.output.extension().and_then(|e| e.to_str()) {
                    Some("tif" | "tiff") => args.extend(["-t".to_string(), "-b16".to_string()]),
                    Some("png") => args.push("-n".to_string()),
                    _ => {}
                }
                args.extend(extra);
                args.extend(["-c".to_string(), input]);
                run_tool(cancel, self.binary(), &args, None)?.stderr
            }
            ConverterKind::ImageMagick => {
                let mut args: Vec<String> = extra.collect();
                args.extend([input, output]);
                run_tool(cancel, self.binary(), &args, None)?.stderr
            }
            ConverterKind::Dcraw => {
                let mut args = vec!["-c".to_string(), "-w".to_string()];
                args.extend(extra);
                args.push(input);
                let decoded = run_tool(cancel, self.binary(), &args, None)?;
                run_tool(cancel, MAGICK, &["-", output.as_str()], Some(decoded.stdout))?;
                decoded.stderr
            }
        };

        if !request.output.exists() {
            return Err(PhotonicError::ToolFailed {
                tool: self.name().to_string(),
                message: format!("completed but {} was not created", request.output.display()),
            });
        }

        Ok(RawConvertResult {
            input: request.input.clone(),
            output: request.output.clone(),
            tool: self.name().to_string(),
            log,
            success: true,
        })
    }
}
