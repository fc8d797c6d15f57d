//! Sigma-clipped statistics for condensing walker chains into point
//! estimates, robust to outlier walker excursions.

/// Iteratively sigma-clipped `(mean, median, stddev)`.
///
/// Each round discards samples farther than `sigma` standard deviations from
/// the current median, then recomputes; iteration stops when the retained
/// set is stable or after `max_iters` rounds. The standard deviation is the
/// population stddev of the retained samples.
pub fn sigma_clipped_stats(values: &[f64], sigma: f64, max_iters: usize) -> (f64, f64, f64) {
    assert!(sigma > 0.0, "clip threshold must be positive");
    let mut kept: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if kept.is_empty() {
        return (f64::NAN, f64::NAN, f64::NAN);
    }

    for _ in 0..max_iters {
        let center = median(&mut kept);
        let std = stddev(&kept);
        if std == 0.0 {
            break;
        }
        let before = kept.len();
        kept.retain(|v| (v - center).abs() <= sigma * std);
        if kept.len() == before {
            break;
        }
    }

    let mean = kept.iter().sum::<f64>() / kept.len() as f64;
    let med = median(&mut kept);
    (mean, med, stddev(&kept))
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn stddev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
