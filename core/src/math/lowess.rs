//! Robust locally weighted regression (lowess).
//!
//! Used by the smoothing filter and the smoothed interpolation strategy.
//! Tricube distance weights with a local linear fit, robustified by
//! bisquare-weighted iterations on the residuals. Inputs may contain `NaN`;
//! only finite (x, y) pairs participate in the fit, and fitted values are
//! produced for every position with a finite x.

const ROBUST_ITERATIONS: usize = 2;

/// Fit a lowess curve through `(x, y)` with the given span fraction and
/// return the fitted value at every position of `x`.
///
/// Fewer than two finite points, or a non-positive span, yields all-`NaN`.
pub fn lowess(x: &[f64], y: &[f64], frac: f64) -> Vec<f64> {
    let n = x.len().min(y.len());
    let mut out = vec![f64::NAN; x.len()];

    let valid: Vec<usize> = (0..n)
        .filter(|&i| x[i].is_finite() && y[i].is_finite())
        .collect();
    if valid.len() < 2 || !(frac > 0.0) {
        return out;
    }

    let k = ((frac * valid.len() as f64).ceil() as usize).clamp(2, valid.len());
    let mut robustness = vec![1.0; valid.len()];
    let mut fitted = vec![f64::NAN; valid.len()];

    for iteration in 0..=ROBUST_ITERATIONS {
        for (j, &idx) in valid.iter().enumerate() {
            fitted[j] = fit_at(x[idx], x, y, &valid, &robustness, k);
        }
        if iteration == ROBUST_ITERATIONS {
            break;
        }

        // Bisquare reweighting against the residual spread.
        let mut abs_resid: Vec<f64> = valid
            .iter()
            .enumerate()
            .map(|(j, &idx)| (y[idx] - fitted[j]).abs())
            .collect();
        abs_resid.sort_by(|a, b| a.total_cmp(b));
        let median = abs_resid[abs_resid.len() / 2];
        if !(median > 0.0) {
            break;
        }
        for (j, &idx) in valid.iter().enumerate() {
            let u = (y[idx] - fitted[j]) / (6.0 * median);
            robustness[j] = if u.abs() < 1.0 {
                (1.0 - u * u) * (1.0 - u * u)
            } else {
                0.0
            };
        }
    }

    for (j, &idx) in valid.iter().enumerate() {
        out[idx] = fitted[j];
    }
    // Positions with missing y still receive a fitted value when their
    // abscissa is known, which is what the interpolation strategy consumes.
    for i in 0..n {
        if out[i].is_nan() && x[i].is_finite() {
            out[i] = fit_at(x[i], x, y, &valid, &robustness, k);
        }
    }
    out
}

/// Weighted local linear fit evaluated at `x0` over the `k` nearest valid
/// points. Falls back to the weighted mean when the window is degenerate.
fn fit_at(x0: f64, x: &[f64], y: &[f64], valid: &[usize], robustness: &[f64], k: usize) -> f64 {
    let mut order: Vec<usize> = (0..valid.len()).collect();
    order.sort_by(|&a, &b| {
        (x[valid[a]] - x0)
            .abs()
            .total_cmp(&(x[valid[b]] - x0).abs())
    });
    let near = &order[..k];
    let dmax = (x[valid[near[k - 1]]] - x0).abs();

    let mut sw = 0.0;
    let mut swx = 0.0;
    let mut swy = 0.0;
    let mut swxx = 0.0;
    let mut swxy = 0.0;
    for &j in near {
        let xi = x[valid[j]];
        let yi = y[valid[j]];
        let tricube = if dmax > 0.0 {
            let d = ((xi - x0) / dmax).abs().min(1.0);
            let t = 1.0 - d * d * d;
            t * t * t
        } else {
            1.0
        };
        let w = tricube * robustness[j];
        sw += w;
        swx += w * xi;
        swy += w * yi;
        swxx += w * xi * xi;
        swxy += w * xi * yi;
    }
    if sw <= 0.0 {
        return f64::NAN;
    }

    let denom = sw * swxx - swx * swx;
    if denom.abs() < 1e-12 {
        return swy / sw;
    }
    let slope = (sw * swxy - swx * swy) / denom;
    let intercept = (swy - slope * swx) / sw;
    intercept + slope * x0
}
