//! Jobs and results.
//!
//! Callers at the CLI/API edge describe a job as a [`JobType`] plus a loose
//! [`OptionMap`]; [`JobKind::from_options`] turns that into typed options once,
//! and everything past the pipeline boundary only sees the typed form.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::align::AlignmentType;
use crate::consts::DEFAULT_TIMELAPSE_FPS;
use crate::error::{PhotonicError, Result};

/// Unique job identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random v4 UUID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    Scan,
    Timelapse,
    Panoramic,
    Stack,
    Align,
    RawConvert,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Timelapse => "timelapse",
            Self::Panoramic => "panoramic",
            Self::Stack => "stack",
            Self::Align => "align",
            Self::RawConvert => "raw-convert",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = PhotonicError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scan" => Ok(Self::Scan),
            "timelapse" => Ok(Self::Timelapse),
            "panoramic" => Ok(Self::Panoramic),
            "stack" => Ok(Self::Stack),
            "align" => Ok(Self::Align),
            "raw-convert" | "raw" => Ok(Self::RawConvert),
            other => Err(PhotonicError::InvalidOption {
                key: "type".into(),
                reason: format!("unknown job type '{other}'"),
            }),
        }
    }
}

/// A loosely typed option value, as produced by flag parsers and HTTP bodies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

pub type OptionMap = BTreeMap<String, OptionValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelapseOptions {
    pub fps: u32,
    pub stabilize: bool,
    /// Output formats: `mp4`, `mp4-h265`, `gif`.
    pub formats: Vec<String>,
    /// `1080p`, `720p`, `480p` or `240p`.
    pub resolution: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub raw_tool: Option<String>,
    pub ignore_cache: bool,
    pub preserve_cache: bool,
}

impl Default for TimelapseOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_TIMELAPSE_FPS,
            stabilize: false,
            formats: vec!["mp4".to_string()],
            resolution: None,
            output_dir: None,
            raw_tool: None,
            ignore_cache: false,
            preserve_cache: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanoramicOptions {
    pub projection: String,
    pub blending: String,
    pub quality: String,
    pub aggression: String,
    pub raw_tool: Option<String>,
    pub ignore_cache: bool,
    pub preserve_cache: bool,
}

impl Default for PanoramicOptions {
    fn default() -> Self {
        Self {
            projection: "cylindrical".to_string(),
            blending: "multiband".to_string(),
            quality: "normal".to_string(),
            aggression: "moderate".to_string(),
            raw_tool: None,
            ignore_cache: false,
            preserve_cache: true,
        }
    }
}

/// Stacking options. Unset numeric parameters fall back to the configured
/// stacking defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackOptions {
    pub method: String,
    pub sigma_low: Option<f32>,
    pub sigma_high: Option<f32>,
    pub iterations: Option<usize>,
    pub kappa: Option<f32>,
    /// Order statistic for the `percentile` method, as a fraction in [0, 1].
    pub percentile: Option<f32>,
    pub winsor_percent: Option<f32>,
    /// Alignment type to run before stacking; `None` skips alignment.
    pub alignment: Option<AlignmentType>,
    /// Explicit stacker name.
    pub stacker: Option<String>,
    pub astro_mode: bool,
    pub raw_tool: Option<String>,
    pub ignore_cache: bool,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            method: "average".to_string(),
            sigma_low: None,
            sigma_high: None,
            iterations: None,
            kappa: None,
            percentile: None,
            winsor_percent: None,
            alignment: None,
            stacker: None,
            astro_mode: false,
            raw_tool: None,
            ignore_cache: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignOptions {
    /// Explicit image list; empty means "list the input directory".
    pub images: Vec<PathBuf>,
    /// `None` means auto-detect.
    pub alignment_type: Option<AlignmentType>,
    /// Explicit aligner name.
    pub processor: Option<String>,
    pub quality: String,
    /// Star threshold sensitivity (standard deviations above the mean).
    /// Read from `starSensitivity`, or its alias `starThreshold`; values
    /// that are not positive mean "use the configured default".
    pub star_sensitivity: Option<f32>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            alignment_type: None,
            processor: None,
            quality: "normal".to_string(),
            star_sensitivity: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConvertOptions {
    pub tool: Option<String>,
    pub ignore_cache: bool,
}

/// Job type together with its typed options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "kebab-case")]
pub enum JobKind {
    Scan,
    Timelapse(TimelapseOptions),
    Panoramic(PanoramicOptions),
    Stack(StackOptions),
    Align(AlignOptions),
    RawConvert(RawConvertOptions),
}

impl JobKind {
    pub fn job_type(&self) -> JobType {
        match self {
            Self::Scan => JobType::Scan,
            Self::Timelapse(_) => JobType::Timelapse,
            Self::Panoramic(_) => JobType::Panoramic,
            Self::Stack(_) => JobType::Stack,
            Self::Align(_) => JobType::Align,
            Self::RawConvert(_) => JobType::RawConvert,
        }
    }

    /// Translate a loose option map into typed options.
    ///
    /// Missing keys take their defaults. A present key with the wrong value
    /// type is an `InvalidOption` error. Keys the job type does not use are
    /// ignored.
    pub fn from_options(job_type: JobType, options: &OptionMap) -> Result<Self> {
        let mut reader = OptionReader::new(options);
        let kind = match job_type {
            JobType::Scan => Self::Scan,
            JobType::Timelapse => {
                let d = TimelapseOptions::default();
                Self::Timelapse(TimelapseOptions {
                    fps: match reader.integer("fps")? {
                        Some(0) | None => d.fps,
                        Some(v) => u32::try_from(v).map_err(|_| invalid("fps", "too large"))?,
                    },
                    stabilize: reader.flag("stabilize")?.unwrap_or(d.stabilize),
                    formats: reader
                        .list("formats")?
                        .filter(|f| !f.is_empty())
                        .unwrap_or(d.formats),
                    resolution: reader.text("resolution")?,
                    output_dir: reader.text("outputDir")?.map(PathBuf::from),
                    raw_tool: reader.text("rawTool")?,
                    ignore_cache: reader.flag("noCache")?.unwrap_or(false),
                    preserve_cache: !reader.flag("noPreserve")?.unwrap_or(false),
                })
            }
            JobType::Panoramic => {
                let d = PanoramicOptions::default();
                Self::Panoramic(PanoramicOptions {
                    projection: reader.text("projection")?.unwrap_or(d.projection),
                    blending: reader.text("blending")?.unwrap_or(d.blending),
                    quality: reader.text("quality")?.unwrap_or(d.quality),
                    aggression: reader.text("aggression")?.unwrap_or(d.aggression),
                    raw_tool: reader.text("rawTool")?,
                    ignore_cache: reader.flag("noCache")?.unwrap_or(false),
                    preserve_cache: !reader.flag("noPreserve")?.unwrap_or(false),
                })
            }
            JobType::Stack => {
                let d = StackOptions::default();
                Self::Stack(StackOptions {
                    method: reader.text("method")?.unwrap_or(d.method),
                    sigma_low: reader.number("sigmaLow")?.map(|v| v as f32),
                    sigma_high: reader.number("sigmaHigh")?.map(|v| v as f32),
                    iterations: reader.integer("iterations")?.map(|v| v as usize),
                    kappa: reader.number("kappa")?.map(|v| v as f32),
                    percentile: reader.number("percentile")?.map(|v| v as f32),
                    winsor_percent: reader.number("winsorPercent")?.map(|v| v as f32),
                    alignment: reader.alignment_type("alignment")?,
                    stacker: reader.text("stacker")?,
                    astro_mode: reader.flag("astroMode")?.unwrap_or(false),
                    raw_tool: reader.text("rawTool")?,
                    ignore_cache: reader.flag("noCache")?.unwrap_or(false),
                })
            }
            JobType::Align => {
                let d = AlignOptions::default();
                Self::Align(AlignOptions {
                    images: reader
                        .list("images")?
                        .map(|l| l.into_iter().map(PathBuf::from).collect())
                        .unwrap_or_default(),
                    alignment_type: match reader.alignment_type("type")? {
                        Some(t) => Some(t),
                        None => reader.alignment_type("atype")?,
                    },
                    processor: reader.text("processor")?,
                    quality: reader.text("quality")?.unwrap_or(d.quality),
                    star_sensitivity: match reader.number("starSensitivity")? {
                        Some(v) => Some(v),
                        None => reader.number("starThreshold")?,
                    }
                    .filter(|v| *v > 0.0)
                    .map(|v| v as f32),
                })
            }
            JobType::RawConvert => Self::RawConvert(RawConvertOptions {
                tool: reader.text("tool")?.or(reader.text("rawTool")?),
                ignore_cache: reader.flag("noCache")?.unwrap_or(false),
            }),
        };
        reader.log_unused(job_type);
        Ok(kind)
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> PhotonicError {
    PhotonicError::InvalidOption {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Typed accessors over an [`OptionMap`] that remember which keys were read.
struct OptionReader<'a> {
    options: &'a OptionMap,
    used: Vec<&'static str>,
}

impl<'a> OptionReader<'a> {
    fn new(options: &'a OptionMap) -> Self {
        Self {
            options,
            used: Vec::new(),
        }
    }

    fn get(&mut self, key: &'static str) -> Option<&'a OptionValue> {
        self.used.push(key);
        self.options.get(key)
    }

    fn flag(&mut self, key: &'static str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(invalid(key, format!("expected a boolean, got {other:?}"))),
        }
    }

    fn number(&mut self, key: &'static str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Number(n)) if n.is_finite() => Ok(Some(*n)),
            Some(other) => Err(invalid(key, format!("expected a number, got {other:?}"))),
        }
    }

    fn integer(&mut self, key: &'static str) -> Result<Option<u64>> {
        match self.number(key)? {
            None => Ok(None),
            Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(Some(n as u64)),
            Some(n) => Err(invalid(key, format!("expected a non-negative integer, got {n}"))),
        }
    }

    fn text(&mut self, key: &'static str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Text(s)) if s.is_empty() => Ok(None),
            Some(OptionValue::Text(s)) => Ok(Some(s.clone())),
            Some(other) => Err(invalid(key, format!("expected a string, got {other:?}"))),
        }
    }

    fn list(&mut self, key: &'static str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::List(items)) => Ok(Some(items.clone())),
            Some(OptionValue::Text(s)) => Ok(Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            Some(other) => Err(invalid(key, format!("expected a list, got {other:?}"))),
        }
    }

    /// `auto`, `none` and the empty string all mean "not set".
    fn alignment_type(&mut self, key: &'static str) -> Result<Option<AlignmentType>> {
        match self.text(key)?.as_deref() {
            None | Some("auto") | Some("none") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(|_| invalid(key, format!("unknown alignment type '{s}'"))),
        }
    }

    fn log_unused(&self, job_type: JobType) {
        for key in self.options.keys() {
            if !self.used.contains(&key.as_str()) {
                debug!(job_type = %job_type, key = %key, "ignoring unused job option");
            }
        }
    }
}

/// A unit of pipeline work. Immutable once submitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Job {
    pub fn new(id: JobId, kind: JobKind, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            id,
            kind,
            input: input.into(),
            output: output.into(),
        }
    }

    pub fn job_type(&self) -> JobType {
        self.kind.job_type()
    }

    /// The typed options as JSON, for the persistence collaborator.
    pub fn options_json(&self) -> Value {
        let value = match &self.kind {
            JobKind::Scan => Ok(Value::Object(Default::default())),
            JobKind::Timelapse(o) => serde_json::to_value(o),
            JobKind::Panoramic(o) => serde_json::to_value(o),
            JobKind::Stack(o) => serde_json::to_value(o),
            JobKind::Align(o) => serde_json::to_value(o),
            JobKind::RawConvert(o) => serde_json::to_value(o),
        };
        value.unwrap_or(Value::Null)
    }
}

/// Free-form, handler-specific result metadata.
pub type Meta = BTreeMap<String, Value>;

/// Outcome of one job.
#[derive(Clone, Debug)]
pub struct JobResult {
    pub job: Job,
    pub error: Option<Arc<PhotonicError>>,
    pub meta: Meta,
}

impl JobResult {
    pub fn success(job: Job, meta: Meta) -> Self {
        Self {
            job,
            error: None,
            meta,
        }
    }

    pub fn failure(job: Job, error: PhotonicError) -> Self {
        Self {
            job,
            error: Some(Arc::new(error)),
            meta: Meta::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Status string recorded by the job store.
    pub fn status(&self) -> &'static str {
        if self.is_success() {
            "completed"
        } else {
            "failed"
        }
    }
}
