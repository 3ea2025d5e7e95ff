/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Job queue capacity per worker thread.
pub const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Default number of pipeline worker threads.
pub const DEFAULT_PARALLEL_JOBS: usize = 2;

/// Default per-subscriber result buffer.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 8;

/// Number of channels in a decoded frame (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Default sigma-clip thresholds and iteration cap.
pub const DEFAULT_SIGMA_LOW: f32 = 2.0;
pub const DEFAULT_SIGMA_HIGH: f32 = 2.0;
pub const DEFAULT_SIGMA_ITERATIONS: usize = 3;

/// Default kappa for kappa-sigma rejection.
pub const DEFAULT_KAPPA: f32 = 1.5;

/// Kappa-sigma derives its thresholds as `kappa * factor`.
pub const KAPPA_LOW_FACTOR: f32 = 1.5;
pub const KAPPA_HIGH_FACTOR: f32 = 2.0;

/// Default winsorized percentile (in percent).
pub const DEFAULT_WINSOR_PERCENT: f32 = 5.0;

/// Standard deviations above the mean for the star threshold.
pub const DEFAULT_STAR_SENSITIVITY: f32 = 3.0;

/// Accepted blob size band (pixels, inclusive).
pub const DEFAULT_MIN_STAR_PIXELS: usize = 2;
pub const DEFAULT_MAX_STAR_PIXELS: usize = 1000;

/// Brightest stars kept per image.
pub const DEFAULT_MAX_STARS: usize = 100;

/// Nearest-neighbour ceiling (pixels) for star correspondences.
pub const DEFAULT_MATCH_DISTANCE: f64 = 50.0;

/// Fewest star matches that still yield a usable translation.
pub const MIN_STAR_MATCHES: usize = 3;

/// Above this many images an undeclared alignment is treated as a timelapse.
pub const TIMELAPSE_IMAGE_COUNT: usize = 20;

/// Default frame rate for timelapse encoding.
pub const DEFAULT_TIMELAPSE_FPS: u32 = 10;

/// Poll interval while waiting on an external tool.
pub const TOOL_POLL_INTERVAL_MS: u64 = 50;

/// How long an availability check may take before the tool counts as unusable.
pub const TOOL_CHECK_TIMEOUT_MS: u64 = 5_000;

/// Directory (inside the input) holding cached RAW conversions.
pub const RAW_CACHE_DIR: &str = "processed";
