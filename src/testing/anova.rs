//! Analysis of variance for one or more categorical factors
//!
//! One factor: classical between/within decomposition.
//! Several factors: full-interaction linear model with Type II sums of
//! squares, where each term is tested after every term that does not
//! contain it and before the terms that do.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::pvalue::f_pvalue;
use crate::data::{Dataset, Factor};
use crate::error::{AnovaError, Result};
use crate::model::{
    build_terms, check_cells, create_design_matrix, fit_least_squares, formula_string, Term,
};

/// Significance level used for every decision in the pipeline
pub const ALPHA: f64 = 0.05;

/// Which decomposition an analysis request needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisRequest {
    /// A single grouping factor
    OneWay { factor: String },
    /// Two or more grouping factors with all interactions
    MultiWay { factors: Vec<String> },
}

impl AnalysisRequest {
    /// Classify a factor list
    pub fn new<S: AsRef<str>>(factors: &[S]) -> Result<Self> {
        if factors.is_empty() {
            return Err(AnovaError::EmptyFactorSet);
        }

        let mut seen = HashSet::new();
        for f in factors {
            if !seen.insert(f.as_ref()) {
                return Err(AnovaError::DuplicateFactor {
                    factor: f.as_ref().to_string(),
                });
            }
        }

        if factors.len() == 1 {
            Ok(AnalysisRequest::OneWay {
                factor: factors[0].as_ref().to_string(),
            })
        } else {
            Ok(AnalysisRequest::MultiWay {
                factors: factors.iter().map(|f| f.as_ref().to_string()).collect(),
            })
        }
    }

    /// Factor names in request order
    pub fn factors(&self) -> Vec<&str> {
        match self {
            AnalysisRequest::OneWay { factor } => vec![factor.as_str()],
            AnalysisRequest::MultiWay { factors } => factors.iter().map(|f| f.as_str()).collect(),
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisRequest::OneWay { .. } => AnalysisKind::OneWay,
            AnalysisRequest::MultiWay { .. } => AnalysisKind::MultiWay,
        }
    }
}

/// Kind of decomposition that produced a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisKind {
    OneWay,
    MultiWay,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::OneWay => write!(f, "One-Way ANOVA"),
            AnalysisKind::MultiWay => write!(f, "Multi-Way ANOVA"),
        }
    }
}

/// One row of the significance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectResult {
    pub term: Term,
    pub sum_sq: f64,
    pub df: usize,
    pub f_statistic: f64,
    pub p_value: f64,
}

impl EffectResult {
    pub fn name(&self) -> String {
        self.term.name()
    }

    /// p < ALPHA; NaN p-values are never significant
    pub fn is_significant(&self) -> bool {
        self.p_value < ALPHA
    }

    pub fn is_main_effect(&self) -> bool {
        self.term.is_main_effect()
    }

    pub fn mean_sq(&self) -> f64 {
        if self.df == 0 {
            f64::NAN
        } else {
            self.sum_sq / self.df as f64
        }
    }
}

/// Residual (within-group) row of the significance table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRow {
    pub sum_sq: f64,
    pub df: usize,
}

/// Variance decomposition of a target over a set of factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaTable {
    pub kind: AnalysisKind,
    /// Field the decomposition was computed on
    pub target: String,
    /// Model formula, e.g. `elecCostRpd ~ a + b + a:b`
    pub formula: String,
    pub effects: Vec<EffectResult>,
    pub residual: ResidualRow,
    pub n_obs: usize,
}

impl AnovaTable {
    /// Look up a row by term name
    pub fn effect(&self, name: &str) -> Option<&EffectResult> {
        self.effects.iter().find(|e| e.name() == name)
    }

    /// Rows with p < ALPHA
    pub fn significant_effects(&self) -> Vec<&EffectResult> {
        self.effects.iter().filter(|e| e.is_significant()).collect()
    }
}

impl fmt::Display for AnovaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .effects
            .iter()
            .map(|e| e.name().len())
            .chain(std::iter::once("Residual".len()))
            .max()
            .unwrap_or(8);

        writeln!(
            f,
            "{:<width$} {:>14} {:>6} {:>12} {:>12}",
            "",
            "sum_sq",
            "df",
            "F",
            "PR(>F)",
            width = width
        )?;
        for e in &self.effects {
            writeln!(
                f,
                "{:<width$} {:>14.6} {:>6} {:>12.6} {:>12.6e}",
                e.name(),
                e.sum_sq,
                e.df,
                e.f_statistic,
                e.p_value,
                width = width
            )?;
        }
        writeln!(
            f,
            "{:<width$} {:>14.6} {:>6} {:>12} {:>12}",
            "Residual",
            self.residual.sum_sq,
            self.residual.df,
            "NaN",
            "NaN",
            width = width
        )
    }
}

/// Decompose the variance of `target_field` over `factors`
pub fn analyze<S: AsRef<str>>(
    dataset: &Dataset,
    target_field: &str,
    factors: &[S],
) -> Result<AnovaTable> {
    let request = AnalysisRequest::new(factors)?;
    analyze_request(dataset, target_field, &request)
}

/// Run the decomposition strategy matching the request
pub fn analyze_request(
    dataset: &Dataset,
    target_field: &str,
    request: &AnalysisRequest,
) -> Result<AnovaTable> {
    let mut fields = vec![target_field];
    fields.extend(request.factors());
    dataset.require_fields(&fields)?;

    if dataset.is_empty() {
        return Err(AnovaError::EmptyData {
            reason: "dataset has no records".to_string(),
        });
    }

    match request {
        AnalysisRequest::OneWay { factor } => one_way_anova(dataset, target_field, factor),
        AnalysisRequest::MultiWay { factors } => type_ii_anova(dataset, target_field, factors),
    }
}

/// Classical one-way ANOVA
///
/// df between = groups - 1, df within = N - groups.
pub fn one_way_anova(dataset: &Dataset, target_field: &str, factor_name: &str) -> Result<AnovaTable> {
    let values = dataset.numeric_column(target_field)?;
    let factor = Factor::from_dataset(dataset, factor_name)?;
    factor.ensure_testable()?;

    let groups = factor.group_values(&values);
    for (level, group) in factor.levels().iter().zip(groups.iter()) {
        log::info!("{}: n={}", level, group.len());
    }

    let n = values.len();
    let grand_mean = values.iter().sum::<f64>() / n as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in &groups {
        let mean = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += group.iter().map(|&x| (x - mean).powi(2)).sum::<f64>();
    }

    let df_between = groups.len() - 1;
    let df_within = (n - 1) - df_between;
    if df_within == 0 {
        return Err(AnovaError::NoResidualDegreesOfFreedom {
            observations: n,
            parameters: groups.len(),
        });
    }

    let (f_statistic, p_value) = f_test(ss_between, df_between, ss_within, df_within);
    log::info!(
        "F-statistic: {:.4}, p-value: {:.4}, df: between={}, within={}",
        f_statistic,
        p_value,
        df_between,
        df_within
    );

    let term = Term::new(&[factor_name]);
    Ok(AnovaTable {
        kind: AnalysisKind::OneWay,
        target: target_field.to_string(),
        formula: formula_string(target_field, std::slice::from_ref(&term)),
        effects: vec![EffectResult {
            term,
            sum_sq: ss_between,
            df: df_between,
            f_statistic,
            p_value,
        }],
        residual: ResidualRow {
            sum_sq: ss_within,
            df: df_within,
        },
        n_obs: n,
    })
}

/// Multi-factor ANOVA with all interactions and Type II sums of squares
///
/// SS(T) = RSS(terms not containing T) - RSS(terms not containing T, plus T)
pub fn type_ii_anova<S: AsRef<str>>(
    dataset: &Dataset,
    target_field: &str,
    factor_names: &[S],
) -> Result<AnovaTable> {
    let y = dataset.numeric_column(target_field)?;
    let factors = factor_names
        .iter()
        .map(|name| {
            let factor = Factor::from_dataset(dataset, name.as_ref())?;
            factor.ensure_testable()?;
            Ok(factor)
        })
        .collect::<Result<Vec<Factor>>>()?;

    let terms = build_terms(factor_names)?;
    let formula = formula_string(target_field, &terms);
    log::info!("Model formula: {}", formula);

    check_cells(&factors, &terms)?;
    let design = create_design_matrix(&factors, &terms)?;

    let full = fit_least_squares(&design.matrix, &y)?;
    let df_resid = full.residual_df();
    if df_resid == 0 {
        return Err(AnovaError::NoResidualDegreesOfFreedom {
            observations: full.n_obs,
            parameters: full.rank,
        });
    }
    log::debug!(
        "Full model: {} columns, rank {}, RSS {:.6}",
        design.coef_names.len(),
        full.rank,
        full.rss
    );

    let mut effects = Vec::with_capacity(terms.len());
    for term in &terms {
        let base: Vec<&Term> = terms.iter().filter(|t| !t.contains(term)).collect();
        let mut with_term = base.clone();
        with_term.push(term);

        let reduced = fit_least_squares(&design.select_terms(&base), &y)?;
        let augmented = fit_least_squares(&design.select_terms(&with_term), &y)?;

        let sum_sq = (reduced.rss - augmented.rss).max(0.0);
        let df = augmented.rank.saturating_sub(reduced.rank);
        let (f_statistic, p_value) = f_test(sum_sq, df, full.rss, df_resid);
        log::debug!(
            "Term {}: SS={:.6}, df={}, F={:.4}, p={:.4e}",
            term,
            sum_sq,
            df,
            f_statistic,
            p_value
        );

        effects.push(EffectResult {
            term: term.clone(),
            sum_sq,
            df,
            f_statistic,
            p_value,
        });
    }

    Ok(AnovaTable {
        kind: AnalysisKind::MultiWay,
        target: target_field.to_string(),
        formula,
        effects,
        residual: ResidualRow {
            sum_sq: full.rss,
            df: df_resid,
        },
        n_obs: y.len(),
    })
}

/// F statistic and p-value of an effect against the residual
fn f_test(sum_sq: f64, df: usize, rss: f64, df_resid: usize) -> (f64, f64) {
    if df == 0 || df_resid == 0 {
        return (f64::NAN, f64::NAN);
    }

    let mean_sq = sum_sq / df as f64;
    let mse = rss / df_resid as f64;
    let f = if mse > 0.0 {
        mean_sq / mse
    } else if mean_sq > 0.0 {
        f64::INFINITY
    } else {
        f64::NAN
    };

    (f, f_pvalue(f, df as f64, df_resid as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, Value};

    fn record(fields: &[(&str, Value)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// 30 runs, three strategies; C is offset by +50
    fn strategy_dataset() -> Dataset {
        let offsets = [-4.0, -3.0, -2.0, -1.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0];
        let mut records = Vec::new();
        for (strategy, base, shift) in [("A", 100.0, 0.0), ("B", 100.0, 0.5), ("C", 150.0, 0.0)] {
            for (i, off) in offsets.iter().enumerate() {
                // rotate offsets for B so groups are not identical copies
                let off = if strategy == "B" { offsets[(i + 3) % 10] } else { *off };
                records.push(record(&[
                    ("strategy", Value::from(strategy)),
                    ("elecCost", Value::from(base + shift + off)),
                ]));
            }
        }
        records.into()
    }

    /// 2x2 design, 5 replicates, pure interaction
    fn interaction_dataset() -> Dataset {
        let noise = [-1.0, -0.5, 0.0, 0.5, 1.0];
        let mut records = Vec::new();
        for (a, b, mean) in [("a1", "b1", 10.0), ("a1", "b2", 20.0), ("a2", "b1", 20.0), ("a2", "b2", 10.0)] {
            for e in noise {
                records.push(record(&[
                    ("a", Value::from(a)),
                    ("b", Value::from(b)),
                    ("y", Value::from(mean + e)),
                ]));
            }
        }
        records.into()
    }

    #[test]
    fn test_one_way_degrees_of_freedom() {
        let ds = strategy_dataset();
        let table = analyze(&ds, "elecCost", &["strategy"]).unwrap();
        assert_eq!(table.kind, AnalysisKind::OneWay);
        assert_eq!(table.effects.len(), 1);
        assert_eq!(table.effects[0].df, 2); // g - 1
        assert_eq!(table.residual.df, 27); // N - g
        assert_eq!(table.n_obs, 30);
    }

    #[test]
    fn test_one_way_offset_group_is_significant() {
        let ds = strategy_dataset();
        let table = analyze(&ds, "elecCost", &["strategy"]).unwrap();
        let effect = &table.effects[0];
        // F(2, 27) critical value at 0.05 is about 3.35
        assert!(effect.f_statistic > 100.0, "F = {}", effect.f_statistic);
        assert!(effect.p_value < ALPHA);
        assert!(effect.is_significant());
    }

    #[test]
    fn test_one_way_known_values() {
        // groups {1,2,3} and {4,5,6}: SSB = 13.5, SSW = 4, F = 13.5
        let mut records = Vec::new();
        for (g, v) in [("x", 1.0), ("x", 2.0), ("x", 3.0), ("y", 4.0), ("y", 5.0), ("y", 6.0)] {
            records.push(record(&[("g", Value::from(g)), ("v", Value::from(v))]));
        }
        let ds: Dataset = records.into();
        let table = analyze(&ds, "v", &["g"]).unwrap();
        let e = &table.effects[0];
        assert!((e.sum_sq - 13.5).abs() < 1e-10);
        assert!((table.residual.sum_sq - 4.0).abs() < 1e-10);
        assert!((e.f_statistic - 13.5).abs() < 1e-10);
        // two-group ANOVA equals the pooled t-test: t^2 = 13.5, p ~ 0.0213
        assert!((e.p_value - 0.02131).abs() < 1e-3, "p = {}", e.p_value);
    }

    #[test]
    fn test_multi_way_shape() {
        let ds = interaction_dataset();
        let table = analyze(&ds, "y", &["a", "b"]).unwrap();
        assert_eq!(table.kind, AnalysisKind::MultiWay);
        assert_eq!(table.effects.len(), 3);
        assert_eq!(table.residual.df, 16);
        assert_eq!(table.formula, "y ~ a + b + a:b");
    }

    #[test]
    fn test_pure_interaction_design() {
        let ds = interaction_dataset();
        let table = analyze(&ds, "y", &["a", "b"]).unwrap();

        let a = table.effect("a").unwrap();
        let b = table.effect("b").unwrap();
        let ab = table.effect("a:b").unwrap();

        assert!(a.sum_sq < 1e-8, "SS(a) = {}", a.sum_sq);
        assert!(b.sum_sq < 1e-8, "SS(b) = {}", b.sum_sq);
        assert!(!a.is_significant());
        assert!(!b.is_significant());

        // cell means differ by 10 with 5 replicates each: SS(a:b) = 20 * 25
        assert!((ab.sum_sq - 500.0).abs() < 1e-8, "SS(a:b) = {}", ab.sum_sq);
        assert_eq!(ab.df, 1);
        assert!(ab.is_significant());

        // residual: 4 cells * (1 + 0.25 + 0 + 0.25 + 1)
        assert!((table.residual.sum_sq - 10.0).abs() < 1e-8);
    }

    #[test]
    fn test_type_ii_unbalanced_main_effect() {
        // Unbalanced 2x2 with an additive effect of a only
        let mut records = Vec::new();
        let cells = [("a1", "b1", 3), ("a1", "b2", 2), ("a2", "b1", 2), ("a2", "b2", 4)];
        for (a, b, n) in cells {
            for i in 0..n {
                let base = if a == "a2" { 20.0 } else { 10.0 };
                records.push(record(&[
                    ("a", Value::from(a)),
                    ("b", Value::from(b)),
                    ("y", Value::from(base + i as f64 * 0.5)),
                ]));
            }
        }
        let ds: Dataset = records.into();
        let table = analyze(&ds, "y", &["a", "b"]).unwrap();
        assert!(table.effect("a").unwrap().is_significant());
        assert_eq!(table.effect("a").unwrap().df, 1);
        assert_eq!(table.residual.df, 11 - 4);
    }

    #[test]
    fn test_three_factor_term_count() {
        let mut records = Vec::new();
        for a in ["x", "y"] {
            for b in ["p", "q"] {
                for c in ["u", "v"] {
                    for rep in 0..2 {
                        let shift = if a == "y" { 5.0 } else { 0.0 };
                        records.push(record(&[
                            ("a", Value::from(a)),
                            ("b", Value::from(b)),
                            ("c", Value::from(c)),
                            ("y", Value::from(shift + rep as f64)),
                        ]));
                    }
                }
            }
        }
        let ds: Dataset = records.into();
        let table = analyze(&ds, "y", &["a", "b", "c"]).unwrap();
        assert_eq!(table.effects.len(), 7);
        assert_eq!(table.residual.df, 8);
        assert!(table.effect("a").unwrap().is_significant());
        assert!(table.effect("a:b:c").is_some());
    }

    #[test]
    fn test_empty_cell_is_fatal() {
        let mut records = Vec::new();
        for (a, b) in [("x", "p"), ("x", "q"), ("y", "p"), ("y", "p")] {
            records.push(record(&[
                ("a", Value::from(a)),
                ("b", Value::from(b)),
                ("y", Value::from(1.0)),
            ]));
        }
        let ds: Dataset = records.into();
        assert!(matches!(
            analyze(&ds, "y", &["a", "b"]),
            Err(AnovaError::InsufficientGroups { .. })
        ));
    }

    #[test]
    fn test_single_level_factor_rejected() {
        let mut records = Vec::new();
        for v in [1.0, 2.0, 3.0] {
            records.push(record(&[("g", Value::from("only")), ("v", Value::from(v))]));
        }
        let ds: Dataset = records.into();
        assert!(matches!(
            analyze(&ds, "v", &["g"]),
            Err(AnovaError::DegenerateFactor { .. })
        ));
    }

    #[test]
    fn test_empty_factor_list() {
        let ds = strategy_dataset();
        let none: [&str; 0] = [];
        assert!(matches!(
            analyze(&ds, "elecCost", &none),
            Err(AnovaError::EmptyFactorSet)
        ));
    }

    #[test]
    fn test_missing_factor_field() {
        let ds = strategy_dataset();
        match analyze(&ds, "elecCost", &["strategy", "ascending"]) {
            Err(AnovaError::MissingField { field, record }) => {
                assert_eq!(field, "ascending");
                assert_eq!(record, 0);
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_no_residual_df() {
        let mut records = Vec::new();
        for (g, v) in [("x", 1.0), ("y", 2.0)] {
            records.push(record(&[("g", Value::from(g)), ("v", Value::from(v))]));
        }
        let ds: Dataset = records.into();
        assert!(matches!(
            analyze(&ds, "v", &["g"]),
            Err(AnovaError::NoResidualDegreesOfFreedom { .. })
        ));
    }

    #[test]
    fn test_request_dispatch() {
        assert_eq!(
            AnalysisRequest::new(&["a"]).unwrap(),
            AnalysisRequest::OneWay { factor: "a".to_string() }
        );
        assert_eq!(AnalysisRequest::new(&["a", "b"]).unwrap().kind(), AnalysisKind::MultiWay);
        assert!(AnalysisRequest::new(&["a", "a"]).is_err());
    }
}
