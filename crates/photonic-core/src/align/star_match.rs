use crate::error::{PhotonicError, Result};
use crate::frame::{AlignmentOffset, StarMatch, StarPoint};

/// Pair every reference star with its nearest target star.
///
/// Only target stars strictly closer than `max_distance` qualify; reference
/// stars without a candidate are dropped. Greedy: each reference star is
/// matched independently, so one target star may serve several references.
pub fn match_stars(reference: &[StarPoint], target: &[StarPoint], max_distance: f64) -> Vec<StarMatch> {
    let mut matches = Vec::new();

    for r in reference {
        let mut best: Option<(&StarPoint, f64)> = None;
        for t in target {
            let dx = t.x - r.x;
            let dy = t.y - r.y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance < max_distance && best.map_or(true, |(_, d)| distance < d) {
                best = Some((t, distance));
            }
        }
        if let Some((t, distance)) = best {
            matches.push(StarMatch {
                reference: *r,
                target: *t,
                distance,
            });
        }
    }

    matches
}

/// Translation of the target relative to the reference: the per-axis median
/// of `target - reference` over all matches.
pub fn estimate_translation(matches: &[StarMatch]) -> Result<AlignmentOffset> {
    if matches.is_empty() {
        return Err(PhotonicError::InsufficientStars { found: 0 });
    }
    let mut dxs: Vec<f64> = matches.iter().map(|m| m.target.x - m.reference.x).collect();
    let mut dys: Vec<f64> = matches.iter().map(|m| m.target.y - m.reference.y).collect();

    Ok(AlignmentOffset {
        dx: median_f64(&mut dxs),
        dy: median_f64(&mut dys),
    })
}

/// Interpolated median; sorts `values`. Caller guarantees non-empty input.
fn median_f64(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
