//! Grouped comparison of a metric across an x factor and an optional hue factor
//!
//! Produces mean and 95% confidence interval per (x, hue) cell, the data
//! behind a point plot of several algorithms across one experiment parameter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::data::Dataset;
use crate::error::Result;
use crate::normalization::{normalize_with_sense, MetricSense};
use crate::stats::{mean, std_dev};
use crate::testing::t_critical;

/// Confidence level of the per-group intervals
pub const CONFIDENCE: f64 = 0.95;

/// Options for a grouped comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Compare RPD of the metric instead of the raw metric
    pub normalize: bool,
    pub reference: Option<f64>,
    pub sense: MetricSense,
    /// Strip parenthesized parameter text from hue labels
    pub clean_labels: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            reference: None,
            sense: MetricSense::LowerIsBetter,
            clean_labels: true,
        }
    }
}

/// Summary statistics of one (x, hue) cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub x: String,
    pub hue: Option<String>,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Result of a grouped comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub x_field: String,
    /// Compared field (the RPD field when normalized)
    pub y_field: String,
    pub hue_field: Option<String>,
    pub normalized: bool,
    /// x levels in plotting order
    pub x_levels: Vec<String>,
    /// hue levels in plotting order; empty without a hue field
    pub hue_levels: Vec<String>,
    pub groups: Vec<GroupSummary>,
}

impl Comparison {
    /// Summaries of one hue level, in x order
    pub fn series(&self, hue: Option<&str>) -> Vec<&GroupSummary> {
        self.groups
            .iter()
            .filter(|g| g.hue.as_deref() == hue)
            .collect()
    }
}

/// Summarize `y_field` per level of `x_field` (and of `hue_field`, if given)
pub fn compare(
    dataset: &Dataset,
    x_field: &str,
    y_field: &str,
    hue_field: Option<&str>,
    options: &CompareOptions,
) -> Result<Comparison> {
    let mut fields = vec![x_field, y_field];
    fields.extend(hue_field);
    dataset.require_fields(&fields)?;

    let (data, y_name) = if options.normalize {
        normalize_with_sense(dataset, y_field, options.reference, options.sense)?
    } else {
        (dataset.clone(), y_field.to_string())
    };

    let values = data.numeric_column(&y_name)?;
    let xs = data.categorical_column(x_field)?;
    let hues: Vec<Option<String>> = match hue_field {
        Some(field) => data
            .categorical_column(field)?
            .into_iter()
            .map(|label| {
                Some(if options.clean_labels {
                    clean_label(&label)
                } else {
                    label
                })
            })
            .collect(),
        None => vec![None; values.len()],
    };

    let mut cells: BTreeMap<(String, Option<String>), Vec<f64>> = BTreeMap::new();
    for ((x, hue), v) in xs.iter().zip(hues.iter()).zip(values.iter()) {
        cells.entry((x.clone(), hue.clone())).or_default().push(*v);
    }

    let x_levels = level_order(xs.iter().cloned());
    let hue_levels = level_order(hues.iter().flatten().cloned());

    let mut groups = Vec::with_capacity(cells.len());
    let hue_keys: Vec<Option<String>> = if hue_field.is_some() {
        hue_levels.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    };
    for hue in &hue_keys {
        for x in &x_levels {
            if let Some(vs) = cells.get(&(x.clone(), hue.clone())) {
                groups.push(summarize(x, hue.clone(), vs));
            }
        }
    }

    log::info!(
        "Compared '{}' over '{}'{}: {} groups",
        y_name,
        x_field,
        hue_field.map(|h| format!(" by '{}'", h)).unwrap_or_default(),
        groups.len()
    );

    Ok(Comparison {
        x_field: x_field.to_string(),
        y_field: y_name,
        hue_field: hue_field.map(String::from),
        normalized: options.normalize,
        x_levels,
        hue_levels,
        groups,
    })
}

fn summarize(x: &str, hue: Option<String>, values: &[f64]) -> GroupSummary {
    let n = values.len();
    let m = mean(values);
    let sd = std_dev(values);
    let (ci_lower, ci_upper) = if n >= 2 {
        let half = t_critical(CONFIDENCE, (n - 1) as f64) * sd / (n as f64).sqrt();
        (m - half, m + half)
    } else {
        (f64::NAN, f64::NAN)
    };

    GroupSummary {
        x: x.to_string(),
        hue,
        count: n,
        mean: m,
        std_dev: sd,
        ci_lower,
        ci_upper,
    }
}

/// Distinct labels, numerically ordered when every label is a number
fn level_order<I: Iterator<Item = String>>(labels: I) -> Vec<String> {
    let mut levels: Vec<String> = labels.collect();
    levels.sort();
    levels.dedup();

    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if let Some(keys) = numeric {
        let mut paired: Vec<(f64, String)> = keys.into_iter().zip(levels).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0));
        levels = paired.into_iter().map(|(_, l)| l).collect();
    }
    levels
}

/// Remove parenthesized segments, e.g. `"GA (pop=50)"` becomes `"GA"`
pub fn clean_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut rest = label;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Write the comparison as CSV: `x,hue,count,mean,std,ci_lower,ci_upper`
pub fn write_comparison_table<P: AsRef<Path>>(path: P, comparison: &Comparison) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        comparison.x_field.as_str(),
        comparison.hue_field.as_deref().unwrap_or("hue"),
        "count",
        "mean",
        "std",
        "ci_lower",
        "ci_upper",
    ])?;

    for g in &comparison.groups {
        writer.write_record([
            g.x.clone(),
            g.hue.clone().unwrap_or_default(),
            g.count.to_string(),
            g.mean.to_string(),
            g.std_dev.to_string(),
            g.ci_lower.to_string(),
            g.ci_upper.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, Value};

    fn runs() -> Dataset {
        let mut records = Vec::new();
        for (name, base) in [("GA (pop=50)", 10.0), ("SA (t0=100)", 20.0)] {
            for deadline in [1.5, 10.0, 2.0] {
                for e in [-1.0, 0.0, 1.0] {
                    let mut r = Record::new();
                    r.insert("name".to_string(), Value::from(name));
                    r.insert("deadlineFactor".to_string(), Value::from(deadline));
                    r.insert("elecCost".to_string(), Value::from(base + deadline + e));
                    records.push(r);
                }
            }
        }
        records.into()
    }

    #[test]
    fn test_clean_label() {
        assert_eq!(clean_label("GA (pop=50)"), "GA");
        assert_eq!(clean_label("HEFT(a)(b) v2"), "HEFT v2");
        assert_eq!(clean_label("plain"), "plain");
        assert_eq!(clean_label("open (paren"), "open (paren");
    }

    #[test]
    fn test_compare_with_hue() {
        let options = CompareOptions {
            normalize: false,
            ..Default::default()
        };
        let cmp = compare(&runs(), "deadlineFactor", "elecCost", Some("name"), &options).unwrap();

        assert_eq!(cmp.x_levels, vec!["1.5", "2", "10"]);
        assert_eq!(cmp.hue_levels, vec!["GA", "SA"]);
        assert_eq!(cmp.groups.len(), 6);

        let ga = cmp.series(Some("GA"));
        assert_eq!(ga.len(), 3);
        assert_eq!(ga[0].x, "1.5");
        assert_eq!(ga[0].count, 3);
        assert!((ga[0].mean - 11.5).abs() < 1e-12);
        assert!((ga[0].std_dev - 1.0).abs() < 1e-12);
        // t(0.975, 2) = 4.302653
        let half = 4.302653 / 3f64.sqrt();
        assert!((ga[0].ci_upper - (11.5 + half)).abs() < 1e-4);
    }

    #[test]
    fn test_compare_normalized_without_hue() {
        let cmp = compare(&runs(), "deadlineFactor", "elecCost", None, &CompareOptions::default()).unwrap();
        assert_eq!(cmp.y_field, "elecCostRpd");
        assert_eq!(cmp.groups.len(), 3);
        assert!(cmp.hue_levels.is_empty());
        assert_eq!(cmp.series(None).len(), 3);
        assert!(cmp.groups.iter().all(|g| g.count == 6));
    }

    #[test]
    fn test_write_comparison_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cmp.csv");
        let cmp = compare(&runs(), "deadlineFactor", "elecCost", Some("name"), &CompareOptions::default()).unwrap();
        write_comparison_table(&path, &cmp).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let header = contents.lines().next().unwrap();
        assert_eq!(header, "deadlineFactor,name,count,mean,std,ci_lower,ci_upper");
        assert_eq!(contents.lines().count(), 7);
    }

    #[test]
    fn test_missing_hue_field() {
        assert!(compare(&runs(), "deadlineFactor", "elecCost", Some("algo"), &CompareOptions::default()).is_err());
    }
}
