//! Post-hoc cascade: Tukey HSD on every significant main effect
//!
//! Interaction terms never trigger a comparison. A factor whose comparison
//! cannot be computed is recorded as skipped with the reason; other factors
//! are still processed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::anova::{AnovaTable, ALPHA};
use super::tukey::{tukey_hsd, TukeyHsdResult};
use crate::data::{Dataset, Factor};
use crate::error::Result;

/// Outcome of the post-hoc step for one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostHocOutcome {
    Completed(TukeyHsdResult),
    Skipped { reason: String },
}

/// Post-hoc result keyed by factor name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorPostHoc {
    pub factor: String,
    pub outcome: PostHocOutcome,
}

/// Post-hoc results in significance-table order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostHocResults {
    entries: Vec<FactorPostHoc>,
}

impl PostHocResults {
    pub fn entries(&self) -> &[FactorPostHoc] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome for a factor, if it was significant
    pub fn get(&self, factor: &str) -> Option<&PostHocOutcome> {
        self.entries
            .iter()
            .find(|e| e.factor == factor)
            .map(|e| &e.outcome)
    }

    /// Completed comparisons only
    pub fn completed(&self) -> impl Iterator<Item = &TukeyHsdResult> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            PostHocOutcome::Completed(r) => Some(r),
            PostHocOutcome::Skipped { .. } => None,
        })
    }
}

impl From<Vec<FactorPostHoc>> for PostHocResults {
    fn from(entries: Vec<FactorPostHoc>) -> Self {
        Self { entries }
    }
}

impl fmt::Display for PostHocResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match &entry.outcome {
                PostHocOutcome::Completed(result) => writeln!(f, "{}", result)?,
                PostHocOutcome::Skipped { reason } => writeln!(
                    f,
                    "Post-hoc test for '{}' skipped: {}",
                    entry.factor, reason
                )?,
            }
        }
        Ok(())
    }
}

/// Run Tukey HSD for each listed factor whose main effect has p < ALPHA
pub fn run_post_hoc<S: AsRef<str>>(
    dataset: &Dataset,
    target_field: &str,
    table: &AnovaTable,
    factors: &[S],
) -> PostHocResults {
    let mut entries = Vec::new();

    for effect in &table.effects {
        if !effect.is_main_effect() {
            log::debug!("Skipping interaction term {} for post-hoc analysis", effect.term);
            continue;
        }
        let name = effect.name();
        if !factors.iter().any(|f| f.as_ref() == name) {
            continue;
        }
        if !effect.is_significant() {
            log::debug!("'{}' not significant (p={:.4}), no post-hoc test", name, effect.p_value);
            continue;
        }

        log::info!("Post-hoc analysis for factor: {}", name);
        let outcome = match factor_tukey(dataset, target_field, &name) {
            Ok(result) => {
                log::info!("\n{}", result);
                PostHocOutcome::Completed(result)
            }
            Err(e) => {
                log::warn!("Error in post-hoc test for {}: {}", name, e);
                PostHocOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        };
        entries.push(FactorPostHoc {
            factor: name,
            outcome,
        });
    }

    PostHocResults { entries }
}

fn factor_tukey(dataset: &Dataset, target_field: &str, factor_name: &str) -> Result<TukeyHsdResult> {
    let values = dataset.numeric_column(target_field)?;
    let factor = Factor::from_dataset(dataset, factor_name)?;
    tukey_hsd(&factor, &values, ALPHA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, Value};
    use crate::model::Term;
    use crate::testing::anova::{analyze, AnalysisKind, EffectResult, ResidualRow};

    fn dataset(rows: &[(&str, &str, f64)]) -> Dataset {
        rows.iter()
            .map(|(a, b, y)| {
                let mut r = Record::new();
                r.insert("a".to_string(), Value::from(*a));
                r.insert("b".to_string(), Value::from(*b));
                r.insert("y".to_string(), Value::from(*y));
                r
            })
            .collect()
    }

    #[test]
    fn test_only_significant_main_effects() {
        // a shifts the mean by 10, b does nothing
        let mut rows = Vec::new();
        for (a, shift) in [("a1", 0.0), ("a2", 10.0)] {
            for b in ["b1", "b2"] {
                for e in [-1.0, 0.0, 1.0] {
                    rows.push((a, b, shift + e));
                }
            }
        }
        let ds = dataset(&rows);
        let table = analyze(&ds, "y", &["a", "b"]).unwrap();
        let results = run_post_hoc(&ds, "y", &table, &["a", "b"]);

        assert_eq!(results.len(), 1);
        assert!(matches!(results.get("a"), Some(PostHocOutcome::Completed(_))));
        assert!(results.get("b").is_none());
        assert_eq!(results.completed().count(), 1);
    }

    #[test]
    fn test_interaction_never_triggers() {
        let mut rows = Vec::new();
        for (a, b, m) in [("a1", "b1", 10.0), ("a1", "b2", 20.0), ("a2", "b1", 20.0), ("a2", "b2", 10.0)] {
            for e in [-1.0, -0.5, 0.0, 0.5, 1.0] {
                rows.push((a, b, m + e));
            }
        }
        let ds = dataset(&rows);
        let table = analyze(&ds, "y", &["a", "b"]).unwrap();
        assert!(table.effect("a:b").unwrap().is_significant());

        let results = run_post_hoc(&ds, "y", &table, &["a", "b"]);
        assert!(results.is_empty());
        assert!(results.get("a:b").is_none());
    }

    #[test]
    fn test_failure_is_recorded() {
        // significant factor whose levels have zero spread
        let rows = vec![
            ("a1", "b1", 1.0),
            ("a1", "b1", 1.0),
            ("a2", "b1", 5.0),
            ("a2", "b1", 5.0),
        ];
        let ds = dataset(&rows);
        let table = analyze(&ds, "y", &["a"]).unwrap();
        assert!(table.effects[0].is_significant());

        let results = run_post_hoc(&ds, "y", &table, &["a"]);
        match results.get("a") {
            Some(PostHocOutcome::Skipped { reason }) => assert!(reason.contains("variance")),
            other => panic!("expected skipped outcome, got {:?}", other),
        }
    }

    fn effect(factors: &[&str], p_value: f64) -> EffectResult {
        EffectResult {
            term: Term::new(factors),
            sum_sq: 1.0,
            df: 1,
            f_statistic: 1.0,
            p_value,
        }
    }

    #[test]
    fn test_failed_factor_does_not_stop_siblings() {
        // y has a single-observation level, x is well formed
        let rows = [
            ("x1", "y1", "z1", 1.0),
            ("x1", "y1", "z2", 2.0),
            ("x1", "y1", "z1", 3.0),
            ("x2", "y1", "z2", 10.0),
            ("x2", "y1", "z1", 11.0),
            ("x2", "y1", "z2", 12.0),
            ("x2", "y2", "z1", 13.0),
        ];
        let ds: Dataset = rows
            .iter()
            .map(|(x, y, z, v)| {
                let mut r = Record::new();
                r.insert("x".to_string(), Value::from(*x));
                r.insert("y".to_string(), Value::from(*y));
                r.insert("z".to_string(), Value::from(*z));
                r.insert("v".to_string(), Value::from(*v));
                r
            })
            .collect();

        let table = AnovaTable {
            kind: AnalysisKind::MultiWay,
            target: "v".to_string(),
            formula: "v ~ z + y + x + x:y".to_string(),
            effects: vec![
                effect(&["z"], 0.5),
                effect(&["y"], 0.01),
                effect(&["x"], 0.01),
                effect(&["x", "y"], 0.001),
            ],
            residual: ResidualRow { sum_sq: 1.0, df: 3 },
            n_obs: 7,
        };

        let results = run_post_hoc(&ds, "v", &table, &["z", "y", "x"]);
        let order: Vec<&str> = results.entries().iter().map(|e| e.factor.as_str()).collect();
        assert_eq!(order, vec!["y", "x"]);

        match results.get("y") {
            Some(PostHocOutcome::Skipped { reason }) => assert!(reason.contains("y2")),
            other => panic!("expected skipped outcome for y, got {:?}", other),
        }
        match results.get("x") {
            Some(PostHocOutcome::Completed(tukey)) => {
                assert_eq!(tukey.levels, vec!["x1", "x2"]);
                assert!(tukey.comparisons[0].reject);
            }
            other => panic!("expected completed outcome for x, got {:?}", other),
        }
        assert!(results.get("z").is_none());
        assert!(results.get("x:y").is_none());
    }
}
