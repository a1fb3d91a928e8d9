//! Tukey's honestly significant difference test
//!
//! All pairwise differences between level means of one factor, with
//! family-wise error controlled through the studentized range distribution.
//! Pairs are ordered by sorted level (group1 < group2) and the reported
//! difference is mean(group2) - mean(group1).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::studentized_range::{ptukey, qtukey};
use crate::data::Factor;
use crate::error::{AnovaError, Result};
use crate::stats::{mean, pooled_variance};

/// One pairwise comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub group1: String,
    pub group2: String,
    /// mean(group2) - mean(group1)
    pub mean_diff: f64,
    /// Adjusted p-value
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// Result of Tukey HSD on one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TukeyHsdResult {
    pub factor: String,
    /// Family-wise error rate
    pub alpha: f64,
    pub levels: Vec<String>,
    pub group_sizes: Vec<usize>,
    pub group_means: Vec<f64>,
    /// Pooled within-group variance
    pub pooled_variance: f64,
    pub df_resid: usize,
    /// Critical value of the studentized range at 1 - alpha
    pub q_critical: f64,
    pub comparisons: Vec<PairwiseComparison>,
}

impl TukeyHsdResult {
    /// Look up a pair regardless of order
    pub fn comparison(&self, a: &str, b: &str) -> Option<&PairwiseComparison> {
        self.comparisons
            .iter()
            .find(|c| (c.group1 == a && c.group2 == b) || (c.group1 == b && c.group2 == a))
    }

    /// Pairs whose difference is significant
    pub fn rejected(&self) -> Vec<&PairwiseComparison> {
        self.comparisons.iter().filter(|c| c.reject).collect()
    }
}

impl fmt::Display for TukeyHsdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .levels
            .iter()
            .map(|l| l.len())
            .chain(std::iter::once("group1".len()))
            .max()
            .unwrap_or(6);
        let header = format!(
            "{:<w$} {:<w$} {:>10} {:>7} {:>10} {:>10} {:>6}",
            "group1",
            "group2",
            "meandiff",
            "p-adj",
            "lower",
            "upper",
            "reject",
            w = width
        );

        writeln!(
            f,
            "Multiple Comparison of Means - Tukey HSD, FWER={:.2} ({})",
            self.alpha, self.factor
        )?;
        writeln!(f, "{}", "=".repeat(header.len()))?;
        writeln!(f, "{}", header)?;
        writeln!(f, "{}", "-".repeat(header.len()))?;
        for c in &self.comparisons {
            writeln!(
                f,
                "{:<w$} {:<w$} {:>10.4} {:>7.4} {:>10.4} {:>10.4} {:>6}",
                c.group1,
                c.group2,
                c.mean_diff,
                c.p_adj,
                c.lower,
                c.upper,
                if c.reject { "True" } else { "False" },
                w = width
            )?;
        }
        write!(f, "{}", "-".repeat(header.len()))
    }
}

/// Run Tukey HSD for `values` (one per record) grouped by `factor`
///
/// Requires at least two levels, two observations per level and a
/// non-zero pooled variance.
pub fn tukey_hsd(factor: &Factor, values: &[f64], alpha: f64) -> Result<TukeyHsdResult> {
    let fail = |reason: String| AnovaError::PostHocFailure {
        factor: factor.name().to_string(),
        reason,
    };

    if values.len() != factor.len() {
        return Err(fail(format!(
            "{} values for {} records",
            values.len(),
            factor.len()
        )));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(fail(format!("alpha {} outside (0, 1)", alpha)));
    }

    let k = factor.n_levels();
    if k < 2 {
        return Err(fail(format!("{} level(s), at least 2 required", k)));
    }

    let groups = factor.group_values(values);
    if let Some((level, group)) = factor
        .levels()
        .iter()
        .zip(groups.iter())
        .find(|(_, g)| g.len() < 2)
    {
        return Err(fail(format!(
            "level '{}' has {} observation(s), at least 2 required",
            level,
            group.len()
        )));
    }

    let (msw, df) = pooled_variance(&groups);
    if df < 2 {
        return Err(fail(format!("{} residual degrees of freedom", df)));
    }
    if !(msw > 0.0) || !msw.is_finite() {
        return Err(fail("zero within-group variance".to_string()));
    }

    let q_critical = qtukey(1.0 - alpha, k as f64, df as f64);
    if !q_critical.is_finite() {
        return Err(AnovaError::NumericalInstability {
            operation: "qtukey".to_string(),
            details: format!("k={}, df={}", k, df),
        });
    }

    let group_sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    let group_means: Vec<f64> = groups.iter().map(|g| mean(g)).collect();

    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let mean_diff = group_means[j] - group_means[i];
            let se = (msw / 2.0 * (1.0 / group_sizes[i] as f64 + 1.0 / group_sizes[j] as f64))
                .sqrt();
            let q = mean_diff.abs() / se;
            let p_adj = (1.0 - ptukey(q, k as f64, df as f64)).clamp(0.0, 1.0);
            let margin = q_critical * se;

            comparisons.push(PairwiseComparison {
                group1: factor.levels()[i].clone(),
                group2: factor.levels()[j].clone(),
                mean_diff,
                p_adj,
                lower: mean_diff - margin,
                upper: mean_diff + margin,
                reject: p_adj < alpha,
            });
        }
    }

    log::debug!(
        "Tukey HSD on '{}': {} levels, {} pairs, q_crit={:.4}",
        factor.name(),
        k,
        comparisons.len(),
        q_critical
    );

    Ok(TukeyHsdResult {
        factor: factor.name().to_string(),
        alpha,
        levels: factor.levels().to_vec(),
        group_sizes,
        group_means,
        pooled_variance: msw,
        df_resid: df,
        q_critical,
        comparisons,
    })
}
