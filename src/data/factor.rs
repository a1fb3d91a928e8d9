//! Categorical factors derived from dataset fields

use serde::{Deserialize, Serialize};

use super::Dataset;
use crate::error::{AnovaError, Result};

/// A categorical grouping variable
///
/// Levels are the distinct labels observed in the dataset, sorted
/// lexicographically; `codes` maps every record to its level index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    name: String,
    levels: Vec<String>,
    codes: Vec<usize>,
}

impl Factor {
    /// Build a factor from a dataset field
    pub fn from_dataset(dataset: &Dataset, name: &str) -> Result<Self> {
        let labels = dataset.categorical_column(name)?;
        Ok(Self::from_labels(name, &labels))
    }

    /// Build a factor from per-record labels
    pub fn from_labels(name: &str, labels: &[String]) -> Self {
        let mut levels: Vec<String> = labels.to_vec();
        levels.sort();
        levels.dedup();

        let codes = labels
            .iter()
            .map(|label| levels.binary_search(label).unwrap_or_default())
            .collect();

        Self {
            name: name.to_string(),
            levels,
            codes,
        }
    }

    /// Get factor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get sorted unique levels
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Get the level index of every record
    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Number of distinct levels
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check whether the factor covers no records
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Fail if the factor cannot separate records into at least two groups
    pub fn ensure_testable(&self) -> Result<()> {
        match self.levels.len() {
            0 => Err(AnovaError::EmptyData {
                reason: format!("factor '{}' has no observations", self.name),
            }),
            1 => Err(AnovaError::DegenerateFactor {
                factor: self.name.clone(),
                level: self.levels[0].clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Record indices for a specific level
    pub fn records_with_level(&self, level: &str) -> Vec<usize> {
        match self.levels.iter().position(|l| l == level) {
            Some(code) => self
                .codes
                .iter()
                .enumerate()
                .filter(|(_, &c)| c == code)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Observation count per level
    pub fn level_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.levels.len()];
        for &c in &self.codes {
            counts[c] += 1;
        }
        counts
    }

    /// Split `values` (one per record) into per-level groups, in level order
    pub fn group_values(&self, values: &[f64]) -> Vec<Vec<f64>> {
        let mut groups = vec![Vec::new(); self.levels.len()];
        for (&c, &v) in self.codes.iter().zip(values.iter()) {
            groups[c].push(v);
        }
        groups
    }
}
