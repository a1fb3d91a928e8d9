//! Descriptive statistics shared across modules
//!
//! Used by the post-hoc comparisons and the grouped comparison summaries.

/// Arithmetic mean; NaN for an empty slice
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sum of squared deviations from the mean
pub fn sum_sq_dev(x: &[f64]) -> f64 {
    let m = mean(x);
    x.iter().map(|&v| (v - m).powi(2)).sum()
}

/// Sample variance with n - 1 denominator; NaN for fewer than two values
pub fn sample_variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    sum_sq_dev(x) / (x.len() - 1) as f64
}

/// Sample standard deviation
pub fn std_dev(x: &[f64]) -> f64 {
    sample_variance(x).sqrt()
}

/// Pooled within-group variance and its degrees of freedom (N - k)
pub fn pooled_variance(groups: &[Vec<f64>]) -> (f64, usize) {
    let n: usize = groups.iter().map(|g| g.len()).sum();
    let k = groups.len();
    if n <= k {
        return (f64::NAN, 0);
    }
    let ss: f64 = groups.iter().map(|g| sum_sq_dev(g)).sum();
    let df = n - k;
    (ss / df as f64, df)
}
