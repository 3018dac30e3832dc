//! NaN-aware statistics helpers shared by the filter and fusion engines.
//!
//! All functions treat `NaN` as "sample present, value missing": missing
//! entries occupy positions in the series but contribute nothing to sums.

/// Mean of the finite entries; `NaN` when none are finite.
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation of the finite entries; `NaN` when fewer
/// than two are finite.
pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum_sq += (v - mean) * (v - mean);
            count += 1;
        }
    }
    if count < 2 {
        f64::NAN
    } else {
        (sum_sq / count as f64).sqrt()
    }
}

/// Cumulative sum where `NaN` entries contribute zero but still occupy a
/// position.
pub fn nan_cumsum(values: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                total += v;
            }
            total
        })
        .collect()
}

/// Minimum number of finite values that must survive trimming for the
/// window statistic to be defined.
const MIN_TRIMMED_SAMPLES: usize = 3;

/// Trimmed-window standard deviation, the statistical basis for the `Auto`
/// filter thresholds.
///
/// For each target index, `half_width` samples before and after the target
/// (excluding the target itself) are selected; near the series edges the
/// window shrinks asymmetrically. The single highest and lowest finite
/// values are discarded and the population standard deviation of the rest
/// is returned. `NaN` entries count toward the window but contribute no
/// value. Series shorter than 20 samples use half the series length as the
/// half-width. Windows with fewer than three finite survivors yield `NaN`.
pub fn run_std_trim(half_width: usize, data: &[f64]) -> Vec<f64> {
    let n = data.len();
    let half = if n < 20 { n / 2 } else { half_width };

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + 1 + half).min(n);

        let mut finite: Vec<f64> = data[lo..i]
            .iter()
            .chain(data[i + 1..hi].iter())
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        finite.sort_by(|a, b| a.total_cmp(b));

        if finite.len() < 2 {
            out.push(f64::NAN);
            continue;
        }
        let trimmed = &finite[1..finite.len() - 1];
        if trimmed.len() < MIN_TRIMMED_SAMPLES {
            out.push(f64::NAN);
            continue;
        }
        out.push(nan_std(trimmed));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_mean_skips_missing_entries() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
    }

    #[test]
    fn nan_std_matches_population_deviation() {
        let std = nan_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((std - 2.0).abs() < 1e-12);
        assert!(nan_std(&[1.0]).is_nan());
    }

    #[test]
    fn nan_cumsum_carries_through_missing() {
        let out = nan_cumsum(&[1.0, f64::NAN, 2.0]);
        assert_eq!(out, vec![1.0, 1.0, 3.0]);
    }

    #[test]
    fn run_std_trim_excludes_window_extremes() {
        // Constant series with one high and one low outlier: any window that
        // contains both outliers trims exactly those two values, leaving a
        // zero deviation.
        let mut data = vec![1.0; 30];
        data[14] = 50.0;
        data[15] = -50.0;
        let out = run_std_trim(5, &data);
        assert_eq!(out.len(), 30);
        // Target 10 selects samples 5..10 and 11..16, which includes both
        // outliers; the trimmed remainder is all ones.
        assert!(out[10].abs() < 1e-12);
        // Target 0 selects samples 1..6, all ones, trimmed to three ones.
        assert!(out[0].abs() < 1e-12);
        // A window holding only the high outlier trims it together with one
        // low value, again leaving ones.
        assert!(out[9].abs() < 1e-12);
    }

    #[test]
    fn run_std_trim_halves_width_for_short_series() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        // n < 20, so the effective half-width is 5 regardless of the input.
        let wide = run_std_trim(50, &data);
        let narrow = run_std_trim(5, &data);
        assert_eq!(wide, narrow);
    }

    #[test]
    fn run_std_trim_degenerate_window_yields_nan() {
        let out = run_std_trim(2, &[1.0, 2.0, 3.0]);
        // n = 3 gives half-width 1: one-sample windows trim to nothing.
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn run_std_trim_counts_nan_as_present() {
        let mut data = vec![2.0; 25];
        for i in 0..25 {
            if i % 3 == 1 {
                data[i] = f64::NAN;
            }
        }
        let out = run_std_trim(5, &data);
        // Windows keep enough finite constant values for a zero deviation.
        assert!(out[12].abs() < 1e-12);
    }
}
