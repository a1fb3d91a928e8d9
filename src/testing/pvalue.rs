//! P-values and critical values from reference distributions

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Upper-tail p-value of an F statistic
///
/// Infinite statistics (zero residual variance with a non-zero effect) give
/// 0; NaN statistics and non-positive degrees of freedom give NaN.
pub fn f_pvalue(f: f64, df1: f64, df2: f64) -> f64 {
    if f.is_nan() || df1 <= 0.0 || df2 <= 0.0 {
        return f64::NAN;
    }
    if f == f64::INFINITY {
        return 0.0;
    }
    if f <= 0.0 {
        return 1.0;
    }

    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided critical value of the t distribution, e.g. 2.262 for
/// `confidence = 0.95, df = 9`
pub fn t_critical(confidence: f64, df: f64) -> f64 {
    if df <= 0.0 || !(0.0..1.0).contains(&confidence) {
        return f64::NAN;
    }

    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => dist.inverse_cdf(0.5 + confidence / 2.0),
        Err(_) => f64::NAN,
    }
}
