//! Per-pixel statistical kernels.
//!
//! Every function takes the N samples observed at one pixel/channel position
//! across the input frames. The public functions never reorder their input;
//! the `_in_place` variants used by the frame reducer do.

/// Arithmetic mean. Empty input yields 0.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64) as f32
}

/// Sample standard deviation (N-1 denominator). Fewer than two values yield 0.
pub fn sample_stddev(values: &[f32], mean: f32) -> f32 {
    if values.len() <= 1 {
        return 0.0;
    }
    let m = mean as f64;
    let sum_sq: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum();
    (sum_sq / (values.len() - 1) as f64).sqrt() as f32
}

/// Linear-interpolated order statistic at fraction `p` (0.0..=1.0).
///
/// The index into the sorted values is `p * (n - 1)`; `p` is clamped.
pub fn percentile(values: &[f32], p: f32) -> f32 {
    let mut sorted = values.to_vec();
    percentile_in_place(&mut sorted, p)
}

/// Same as [`percentile`] but sorts `scratch` in place.
pub(crate) fn percentile_in_place(scratch: &mut [f32], p: f32) -> f32 {
    match scratch.len() {
        0 => return 0.0,
        1 => return scratch[0],
        _ => {}
    }
    scratch.sort_unstable_by(|a, b| a.total_cmp(b));

    let index = p.clamp(0.0, 1.0) as f64 * (scratch.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = lower + 1;
    if upper >= scratch.len() {
        return scratch[scratch.len() - 1];
    }
    let weight = index - lower as f64;
    (scratch[lower] as f64 * (1.0 - weight) + scratch[upper] as f64 * weight) as f32
}

/// 50th percentile.
pub fn median(values: &[f32]) -> f32 {
    percentile(values, 0.5)
}

/// Iterative sigma clipping.
///
/// Each pass computes the mean and sample stddev of the surviving values and
/// keeps those inside `[mean - low*stddev, mean + high*stddev]` (inclusive).
/// Stops after `iterations` passes, when stddev is zero, or when a pass rejects
/// nothing. Returns the mean of the survivors and the number rejected. If every
/// value is clipped the mean of the full input is returned instead.
pub fn sigma_clip(values: &[f32], sigma_low: f32, sigma_high: f32, iterations: usize) -> (f32, u32) {
    let mut active = values.to_vec();
    let mut kept = Vec::with_capacity(values.len());
    let rejected = sigma_clip_in_place(&mut active, &mut kept, sigma_low, sigma_high, iterations);
    if active.is_empty() {
        (mean(values), rejected)
    } else {
        (mean(&active), rejected)
    }
}

/// Clipping loop shared with the frame-level reducer. On return `active` holds
/// the survivors.
pub(crate) fn sigma_clip_in_place(
    active: &mut Vec<f32>,
    kept: &mut Vec<f32>,
    sigma_low: f32,
    sigma_high: f32,
    iterations: usize,
) -> u32 {
    let mut rejected_total = 0u32;

    for _ in 0..iterations {
        if active.len() <= 1 {
            break;
        }
        let m = mean(active);
        let stddev = sample_stddev(active, m);
        if stddev == 0.0 {
            break;
        }

        let low = m - sigma_low * stddev;
        let high = m + sigma_high * stddev;

        kept.clear();
        kept.extend(active.iter().copied().filter(|&v| v >= low && v <= high));
        let rejected = (active.len() - kept.len()) as u32;
        if rejected == 0 {
            break;
        }
        rejected_total += rejected;
        std::mem::swap(active, kept);
    }

    rejected_total
}
