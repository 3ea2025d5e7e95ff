//! RAW pre-conversion through external converters.

mod command;
mod service;

use std::path::PathBuf;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::selection::{Outcome, Processor};

pub use command::{CommandConverter, ConverterKind};
pub use service::{cache_is_valid, PreprocessReport, RawConversionService, RAW_TOOL_PRIORITY};

#[derive(Clone, Debug)]
pub struct RawConvertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Clone, Debug, Default)]
pub struct RawConvertResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tool: String,
    /// Captured tool output.
    pub log: String,
    pub success: bool,
}

impl Outcome for RawConvertResult {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn log(&self) -> &str {
        &self.log
    }
}

/// A registered RAW converter.
pub trait RawConverter: Processor {
    fn convert(&self, cancel: &CancelToken, request: &RawConvertRequest) -> Result<RawConvertResult>;
}
