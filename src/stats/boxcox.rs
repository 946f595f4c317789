//! Box-Cox power transformation.
//!
//! For lambda != 0: y = (x^lambda - 1) / lambda
//! For lambda == 0: y = ln(x)

const LAMBDA_EPS: f64 = 1e-10;

/// Box-Cox transform of one value. Non-positive inputs give NaN.
pub fn boxcox(x: f64, lambda: f64) -> f64 {
    if x <= 0.0 || x.is_nan() {
        f64::NAN
    } else if lambda.abs() < LAMBDA_EPS {
        x.ln()
    } else {
        (x.powf(lambda) - 1.0) / lambda
    }
}

/// Inverse Box-Cox transform of one value.
///
/// For lambda != 0: x = (lambda * y + 1)^(1/lambda)
/// For lambda == 0: x = exp(y)
pub fn inv_boxcox(y: f64, lambda: f64) -> f64 {
    if lambda.abs() < LAMBDA_EPS {
        y.exp()
    } else {
        let val = lambda * y + 1.0;
        if val <= 0.0 {
            f64::NAN
        } else {
            val.powf(1.0 / lambda)
        }
    }
}

/// Find the Box-Cox lambda in `[lower, upper]` maximizing the profile
/// log-likelihood.
///
/// Only strictly positive values take part. A coarse grid over the bounds is
/// refined around the best point. Returns `1.0` clamped to the bounds when
/// fewer than two positive values are available.
pub fn boxcox_lambda(series: &[f64], lower: f64, upper: f64) -> f64 {
    let positive: Vec<f64> = series.iter().copied().filter(|&x| x > 0.0).collect();
    let fallback = 1.0_f64.clamp(lower, upper);

    if positive.len() < 2 || lower >= upper {
        return fallback;
    }

    let log_sum: f64 = positive.iter().map(|x| x.ln()).sum();
    let mut best_lambda = fallback;
    let mut best_llf = f64::NEG_INFINITY;

    let coarse_steps = 200;
    for i in 0..=coarse_steps {
        let lambda = lower + (upper - lower) * i as f64 / coarse_steps as f64;
        let llf = boxcox_llf(&positive, log_sum, lambda);
        if llf > best_llf {
            best_llf = llf;
            best_lambda = lambda;
        }
    }

    let step = (upper - lower) / coarse_steps as f64;
    let start = (best_lambda - step).max(lower);
    let end = (best_lambda + step).min(upper);
    for i in 0..=100 {
        let lambda = start + (end - start) * i as f64 / 100.0;
        let llf = boxcox_llf(&positive, log_sum, lambda);
        if llf > best_llf {
            best_llf = llf;
            best_lambda = lambda;
        }
    }

    best_lambda
}

/// Profile log-likelihood of normally distributed transformed data, up to a
/// constant.
fn boxcox_llf(positive: &[f64], log_sum: f64, lambda: f64) -> f64 {
    let n = positive.len() as f64;
    let transformed: Vec<f64> = positive.iter().map(|&x| boxcox(x, lambda)).collect();
    if transformed.iter().any(|x| !x.is_finite()) {
        return f64::NEG_INFINITY;
    }

    let mean = transformed.iter().sum::<f64>() / n;
    let variance = transformed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    if variance <= 0.0 {
        return f64::NEG_INFINITY;
    }

    -0.5 * n * variance.ln() + (lambda - 1.0) * log_sum
}
