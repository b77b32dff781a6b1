//! Signal Statistics
//!
//! Window-level helpers used by the processors: AC/DC decomposition, autocorrelation
//! based period estimation and light smoothing.

use log::trace;

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

/// Splits a window into its pulsatile and baseline components.
///
/// # Returns
/// `(ac, dc)` where `ac` is the population standard deviation and `dc` the mean,
/// or `None` for an empty window.
pub fn ac_dc(data: &[f64]) -> Option<(f64, f64)> {
    let dc = mean(data)?;
    let variance = data.iter().map(|v| (v - dc).powi(2)).sum::<f64>() / data.len() as f64;
    Some((variance.sqrt(), dc))
}

/// Median of a slice. Non-finite values are ordered with `total_cmp`.
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Centered moving average. `width` is rounded down to an odd number; edges use the
/// samples available, so the output has the same length as the input.
pub fn moving_average(data: &[f64], width: usize) -> Vec<f64> {
    let half = width / 2;
    if half == 0 || data.is_empty() {
        return data.to_vec();
    }
    let mut prefix = Vec::with_capacity(data.len() + 1);
    prefix.push(0.0);
    for value in data {
        prefix.push(prefix[prefix.len() - 1] + value);
    }
    (0..data.len())
        .map(|idx| {
            let lo = idx.saturating_sub(half);
            let hi = (idx + half + 1).min(data.len());
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

/// Least-squares line through `data` over its sample indices, as `(intercept, slope)`.
fn linear_fit(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = data.iter().sum::<f64>() / n;
    let (num, den) = data
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (idx, y)| {
            let dx = idx as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    let slope = if den > 0.0 { num / den } else { 0.0 };
    (y_mean - slope * x_mean, slope)
}

/// `detrend` function.
///
/// Removes the slow baseline (respiration, sensor drift) by subtracting a centered moving
/// average of `width` samples. The first and last half windows follow the least-squares
/// line of the outermost full window, so the ends are not pulled towards the interior.
/// Inputs shorter than one window only lose their mean.
pub fn detrend(data: &[f64], width: usize) -> Vec<f64> {
    let half = width / 2;
    if half == 0 || data.is_empty() {
        return data.to_vec();
    }
    let n = data.len();
    let full = 2 * half + 1;
    if n < full {
        let dc = data.iter().sum::<f64>() / n as f64;
        return data.iter().map(|v| v - dc).collect();
    }

    let baseline = moving_average(data, width);
    let (head_intercept, head_slope) = linear_fit(&data[..full]);
    let (tail_intercept, tail_slope) = linear_fit(&data[n - full..]);
    (0..n)
        .map(|idx| {
            let base = if idx < half {
                head_intercept + head_slope * idx as f64
            } else if idx >= n - half {
                tail_intercept + tail_slope * (idx - (n - full)) as f64
            } else {
                baseline[idx]
            };
            data[idx] - base
        })
        .collect()
}

/// Linearly interpolated quantile, `q` in `[0, 1]`.
pub fn quantile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Spread between the 5th and 95th percentile. Isolated spikes do not move it.
pub fn robust_range(data: &[f64]) -> Option<f64> {
    Some(quantile(data, 0.95)? - quantile(data, 0.05)?)
}

/// Normalized, unbiased autocorrelation of a mean-removed window at lag `lag`.
fn autocorrelation(centered: &[f64], energy: f64, lag: usize) -> f64 {
    let n = centered.len() - lag;
    let sum: f64 = centered[..n]
        .iter()
        .zip(&centered[lag..])
        .map(|(a, b)| a * b)
        .sum();
    (sum / n as f64) / energy
}

/// `dominant_period` function.
///
/// Estimates the fundamental period of `data` in samples by autocorrelation.
///
/// The first local maximum of the autocorrelation in `[min_lag, max_lag]` that reaches
/// `min_correlation` and 80 % of the band maximum is taken, which favours the fundamental
/// over its multiples. The lag is refined by parabolic interpolation.
///
/// # Returns
/// The period in (fractional) samples, or `None` for flat, too short or aperiodic windows.
pub fn dominant_period(
    data: &[f64],
    min_lag: usize,
    max_lag: usize,
    min_correlation: f64,
) -> Option<f64> {
    if data.len() < 4 || min_lag > max_lag {
        return None;
    }
    let dc = mean(data)?;
    let centered: Vec<f64> = data.iter().map(|v| v - dc).collect();
    let energy = centered.iter().map(|v| v * v).sum::<f64>() / centered.len() as f64;
    if !energy.is_finite() || energy <= f64::EPSILON * dc.abs().max(1.0) {
        return None;
    }

    // one extra lag on each side for the local maximum test
    let lo = min_lag.saturating_sub(1).max(1);
    let hi = max_lag.saturating_add(1).min(centered.len() - 2);
    if hi < lo + 2 {
        return None;
    }
    let corr: Vec<f64> = (lo..=hi)
        .map(|lag| autocorrelation(&centered, energy, lag))
        .collect();
    let at = |lag: usize| corr[lag - lo];

    let first = min_lag.max(lo + 1);
    let last = max_lag.min(hi - 1);
    if first > last {
        return None;
    }
    let band_max = (first..=last).map(at).fold(f64::NEG_INFINITY, f64::max);
    let threshold = min_correlation.max(0.8 * band_max);

    let lag = (first..=last).find(|&lag| {
        let r = at(lag);
        r >= threshold && r >= at(lag - 1) && r >= at(lag + 1)
    })?;

    let (left, centre, right) = (at(lag - 1), at(lag), at(lag + 1));
    let denom = left - 2.0 * centre + right;
    let offset = if denom.abs() > f64::EPSILON {
        (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    trace!(
        "autocorrelation peak at lag {} (r = {:.3}, offset {:.3})",
        lag,
        centre,
        offset
    );
    Some(lag as f64 + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 1000.0 + 50.0 * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_ac_dc() {
        let (ac, dc) = ac_dc(&[1.0, 3.0, 1.0, 3.0]).unwrap();
        assert_eq!(dc, 2.0);
        assert_eq!(ac, 1.0);
        assert!(ac_dc(&[]).is_none());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_moving_average_keeps_length() {
        let smoothed = moving_average(&[0.0, 3.0, 0.0, 3.0, 0.0], 3);
        assert_eq!(smoothed.len(), 5);
        assert_eq!(smoothed[0], 1.5);
        assert_eq!(smoothed[2], 2.0);
        assert_eq!(moving_average(&[1.0, 2.0], 1), vec![1.0, 2.0]);
    }

    #[test]
    fn test_moving_average_edges() {
        let smoothed = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 5);
        assert_eq!(smoothed[0], 2.0);
        assert_eq!(smoothed[2], 3.0);
        assert_eq!(smoothed[5], 5.0);
    }

    #[test]
    fn test_detrend_removes_ramp() {
        let ramp: Vec<f64> = (0..200).map(|i| 1000.0 + 3.0 * i as f64).collect();
        let flat = detrend(&ramp, 51);
        assert_eq!(flat.len(), ramp.len());
        assert!(flat.iter().all(|v| v.abs() < 1e-6), "residual {:?}", flat);
    }

    #[test]
    fn test_detrend_removes_slow_wander() {
        let wandering: Vec<f64> = (0..400)
            .map(|i| {
                let t = i as f64 / 50.0;
                (2.0 * PI * 1.2 * t).sin() + 6.0 * (2.0 * PI * 0.25 * t).sin()
            })
            .collect();
        let raw_spread = robust_range(&wandering).unwrap();
        let detrended = detrend(&wandering, 51);
        let spread = robust_range(&detrended).unwrap();
        // the pulse alone spans about 2.3 after detrending
        assert!(spread < 5.0 && spread < raw_spread / 2.0, "spread {}", spread);
        assert!(spread > 1.5, "spread {}", spread);
    }

    #[test]
    fn test_detrend_short_input_loses_mean() {
        assert_eq!(detrend(&[1.0, 2.0, 3.0], 51), vec![-1.0, 0.0, 1.0]);
        assert_eq!(detrend(&[1.0, 2.0], 1), vec![1.0, 2.0]);
    }

    #[test]
    fn test_quantile_and_robust_range() {
        let data: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        assert_eq!(quantile(&data, 0.5), Some(50.0));
        assert_eq!(quantile(&data, 0.05), Some(5.0));
        assert_eq!(robust_range(&data), Some(90.0));
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&data, 1.5), None);

        let mut spiked = vec![0.0; 100];
        spiked[50] = 1000.0;
        assert_eq!(robust_range(&spiked), Some(0.0));
    }

    #[test]
    fn test_dominant_period_sine() {
        let period = dominant_period(&sine(1.2, 50.0, 150), 16, 75, 0.3).unwrap();
        assert!((period - 50.0 / 1.2).abs() < 1.0, "got {}", period);
    }

    #[test]
    fn test_dominant_period_fast_sine() {
        let period = dominant_period(&sine(2.5, 50.0, 150), 16, 75, 0.3).unwrap();
        assert!((period - 20.0).abs() < 1.0, "got {}", period);
    }

    #[test]
    fn test_dominant_period_flat() {
        assert!(dominant_period(&[5.0; 150], 16, 75, 0.3).is_none());
    }

    #[test]
    fn test_dominant_period_huge_lag_band() {
        let period = dominant_period(&sine(1.2, 50.0, 150), 16, usize::MAX, 0.3).unwrap();
        assert!((period - 50.0 / 1.2).abs() < 1.0, "got {}", period);
    }

    #[test]
    fn test_dominant_period_short_window() {
        assert!(dominant_period(&[1.0, 2.0, 3.0], 1, 2, 0.3).is_none());
    }
}
