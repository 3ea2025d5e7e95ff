use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotonicError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("job queue is full")]
    QueueFull,

    #[error("pipeline is stopped")]
    PipelineStopped,

    #[error("no {kind} processor available for type {task}")]
    NoProcessor { kind: &'static str, task: String },

    #[error("processor '{0}' is already registered")]
    DuplicateProcessor(String),

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("all {task} processors failed:\n  {}", attempts.join("\n  "))]
    AllProcessorsFailed { task: String, attempts: Vec<String> },

    #[error("operation cancelled")]
    Cancelled,

    #[error("need at least {needed} images, got {got}")]
    InsufficientImages { needed: usize, got: usize },

    #[error("insufficient stars: {found} usable")]
    InsufficientStars { found: usize },

    #[error("Image size mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("job panicked: {0}")]
    JobPanicked(String),

    #[error("timed out waiting for job {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, PhotonicError>;
