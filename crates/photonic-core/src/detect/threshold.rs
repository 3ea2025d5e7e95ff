use ndarray::Array2;

/// Compute mean and (population) standard deviation of pixel values.
pub fn compute_mean_stddev(data: &Array2<f32>) -> (f64, f64) {
    let n = data.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let sum: f64 = data.iter().map(|&v| v as f64).sum();
    let mean = sum / n;
    let var: f64 = data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Global star threshold: `mean + k * stddev`, clamped to [0, 1].
pub fn star_threshold(luma: &Array2<f32>, k: f32) -> f32 {
    let (mean, std) = compute_mean_stddev(luma);
    ((mean + k as f64 * std) as f32).clamp(0.0, 1.0)
}

/// Binarize: pixels strictly above `threshold` are set.
pub fn binarize(luma: &Array2<f32>, threshold: f32) -> Array2<bool> {
    luma.mapv(|v| v > threshold)
}
