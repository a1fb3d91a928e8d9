//! End-to-end analysis: normalize, decompose, compare

use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::Dataset;
use crate::error::Result;
use crate::normalization::{normalize_with_sense, resolve_reference, MetricSense};
use crate::testing::{analyze, run_post_hoc, AnalysisKind, AnovaTable, PostHocOutcome, PostHocResults, ALPHA};

/// Options for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Analyze the RPD of the target instead of the raw target
    pub normalize: bool,
    /// Explicit best-known value; the best observed value when `None`
    pub reference: Option<f64>,
    pub sense: MetricSense,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            reference: None,
            sense: MetricSense::LowerIsBetter,
        }
    }
}

/// Everything produced by one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Target field as requested
    pub target: String,
    /// Field the variance decomposition ran on (the RPD field when normalized)
    pub analyzed_field: String,
    pub normalized: bool,
    /// Reference value used for normalization
    pub reference: Option<f64>,
    pub factors: Vec<String>,
    pub anova: AnovaTable,
    pub post_hoc: PostHocResults,
    pub generated_at: DateTime<Local>,
    /// Dataset the analysis ran on, including the derived field
    #[serde(skip)]
    pub dataset: Dataset,
}

impl AnalysisReport {
    pub fn kind(&self) -> AnalysisKind {
        self.anova.kind
    }

    /// One-line verdict for one-way analyses
    pub fn conclusion(&self) -> Option<String> {
        if self.kind() != AnalysisKind::OneWay {
            return None;
        }
        let effect = self.anova.effects.first()?;
        let verdict = if effect.is_significant() {
            format!("Significant difference found between groups (p < {})", ALPHA)
        } else {
            format!("No significant difference found between groups (p >= {})", ALPHA)
        };
        Some(verdict)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ANOVA Analysis Summary")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Generated at: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Analysis type: {}", self.kind())?;
        writeln!(f, "Target variable: {}", self.target)?;
        if self.normalized {
            match self.reference {
                Some(r) => writeln!(f, "Analyzed field: {} (RPD, reference {})", self.analyzed_field, r)?,
                None => writeln!(f, "Analyzed field: {} (RPD)", self.analyzed_field)?,
            }
        } else {
            writeln!(f, "Analyzed field: {}", self.analyzed_field)?;
        }
        writeln!(f, "Grouping variables: {}", self.factors.join(", "))?;
        writeln!(f, "Model: {}", self.anova.formula)?;
        writeln!(f)?;

        match (self.kind(), self.anova.effects.first()) {
            (AnalysisKind::OneWay, Some(effect)) => {
                writeln!(f, "F-statistic: {:.4}", effect.f_statistic)?;
                writeln!(f, "p-value: {:.4e}", effect.p_value)?;
                writeln!(
                    f,
                    "Degrees of freedom: between={}, within={}",
                    effect.df, self.anova.residual.df
                )?;
                if let Some(conclusion) = self.conclusion() {
                    writeln!(f, "{}", conclusion)?;
                }
            }
            _ => {
                writeln!(f, "ANOVA Table:")?;
                write!(f, "{}", self.anova)?;
            }
        }

        if !self.post_hoc.is_empty() {
            writeln!(f)?;
            writeln!(f, "Post-hoc Analysis")?;
            writeln!(f, "-----------------")?;
            for entry in self.post_hoc.entries() {
                match &entry.outcome {
                    PostHocOutcome::Completed(result) => writeln!(f, "{}", result)?,
                    PostHocOutcome::Skipped { reason } => {
                        writeln!(f, "{}: skipped ({})", entry.factor, reason)?
                    }
                }
            }
        }
        Ok(())
    }
}

/// Normalize (optionally), decompose the variance and run the post-hoc cascade
pub fn run_analysis<S: AsRef<str>>(
    dataset: &Dataset,
    target_field: &str,
    factors: &[S],
    options: &AnalysisOptions,
) -> Result<AnalysisReport> {
    let factor_names: Vec<String> = factors.iter().map(|f| f.as_ref().to_string()).collect();
    log::info!(
        "Analyzing '{}' by [{}]",
        target_field,
        factor_names.join(", ")
    );

    let (data, analyzed_field, reference) = if options.normalize {
        let values = dataset.numeric_column(target_field)?;
        let reference = resolve_reference(target_field, &values, options.reference, options.sense)?;
        let (data, field) = normalize_with_sense(dataset, target_field, Some(reference), options.sense)?;
        log::info!("Normalized '{}' into '{}' (reference {})", target_field, field, reference);
        (data, field, Some(reference))
    } else {
        (dataset.clone(), target_field.to_string(), None)
    };

    let anova = analyze(&data, &analyzed_field, &factor_names)?;
    log::info!("{} on '{}' complete", anova.kind, analyzed_field);

    let post_hoc = run_post_hoc(&data, &analyzed_field, &anova, &factor_names);

    Ok(AnalysisReport {
        target: target_field.to_string(),
        analyzed_field,
        normalized: options.normalize,
        reference,
        factors: factor_names,
        anova,
        post_hoc,
        generated_at: Local::now(),
        dataset: data,
    })
}

/// One independent analysis request
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Label used in logs and output file names
    pub name: String,
    pub dataset: Dataset,
    pub target: String,
    pub factors: Vec<String>,
    pub options: AnalysisOptions,
}

/// Run independent jobs in parallel; results keep job order
pub fn run_batch(jobs: &[BatchJob]) -> Vec<(String, Result<AnalysisReport>)> {
    jobs.par_iter()
        .map(|job| {
            log::debug!("Starting job '{}'", job.name);
            let result = run_analysis(&job.dataset, &job.target, &job.factors, &job.options);
            if let Err(e) = &result {
                log::error!("Job '{}' failed: {}", job.name, e);
            }
            (job.name.clone(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, Value};
    use crate::error::AnovaError;

    fn strategy_dataset() -> Dataset {
        let offsets = [-4.0, -3.0, -2.0, -1.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0];
        let mut records = Vec::new();
        for (strategy, base) in [("A", 100.0), ("B", 100.5), ("C", 150.0)] {
            for off in offsets {
                let mut r = Record::new();
                r.insert("strategy".to_string(), Value::from(strategy));
                r.insert("elecCost".to_string(), Value::from(base + off));
                records.push(r);
            }
        }
        records.into()
    }

    #[test]
    fn test_run_analysis_normalized() {
        let ds = strategy_dataset();
        let report = run_analysis(&ds, "elecCost", &["strategy"], &AnalysisOptions::default()).unwrap();

        assert_eq!(report.analyzed_field, "elecCostRpd");
        assert_eq!(report.reference, Some(96.0));
        assert!(report.normalized);
        assert_eq!(report.kind(), AnalysisKind::OneWay);
        assert!(report.anova.effects[0].is_significant());

        match report.post_hoc.get("strategy") {
            Some(PostHocOutcome::Completed(tukey)) => {
                assert!(!tukey.comparison("A", "B").unwrap().reject);
                assert!(tukey.comparison("A", "C").unwrap().reject);
                assert!(tukey.comparison("B", "C").unwrap().reject);
            }
            other => panic!("expected completed post-hoc, got {:?}", other),
        }

        // caller's dataset untouched
        assert!(ds.value(0, "elecCostRpd").is_err());
        assert!(report.dataset.value(0, "elecCostRpd").is_ok());
    }

    #[test]
    fn test_run_analysis_raw_target() {
        let ds = strategy_dataset();
        let options = AnalysisOptions {
            normalize: false,
            ..Default::default()
        };
        let report = run_analysis(&ds, "elecCost", &["strategy"], &options).unwrap();
        assert_eq!(report.analyzed_field, "elecCost");
        assert_eq!(report.reference, None);
        // RPD is a positive affine map of the target: same F either way
        let normalized = run_analysis(&ds, "elecCost", &["strategy"], &AnalysisOptions::default()).unwrap();
        let f_raw = report.anova.effects[0].f_statistic;
        let f_rpd = normalized.anova.effects[0].f_statistic;
        assert!((f_raw - f_rpd).abs() / f_raw < 1e-9);
    }

    #[test]
    fn test_summary_text() {
        let ds = strategy_dataset();
        let report = run_analysis(&ds, "elecCost", &["strategy"], &AnalysisOptions::default()).unwrap();
        let text = report.to_string();
        assert!(text.contains("Analysis type: One-Way ANOVA"));
        assert!(text.contains("Significant difference found"));
        assert!(text.contains("Tukey HSD"));
    }

    #[test]
    fn test_run_batch_keeps_order_and_isolates_failures() {
        let good = BatchJob {
            name: "good".to_string(),
            dataset: strategy_dataset(),
            target: "elecCost".to_string(),
            factors: vec!["strategy".to_string()],
            options: AnalysisOptions::default(),
        };
        let bad = BatchJob {
            name: "bad".to_string(),
            target: "missing".to_string(),
            ..good.clone()
        };

        let results = run_batch(&[good, bad]);
        assert_eq!(results[0].0, "good");
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].0, "bad");
        assert!(matches!(results[1].1, Err(AnovaError::MissingField { .. })));
    }
}
