//! Dataset - ordered experiment records

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::Value;
use crate::error::{AnovaError, Result};

/// One experiment run: field name -> value
pub type Record = BTreeMap<String, Value>;

/// Ordered sequence of experiment records.
///
/// Datasets are never mutated by the analysis; every transformation returns
/// a new value so the same source can feed several requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset from records
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Get number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the dataset has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get records
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// All field names seen in any record (sorted)
    pub fn field_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.records.iter().flat_map(|r| r.keys()).collect();
        names.into_iter().cloned().collect()
    }

    /// Get a field value of a record
    pub fn value(&self, record: usize, field: &str) -> Result<&Value> {
        self.records
            .get(record)
            .and_then(|r| r.get(field))
            .ok_or_else(|| AnovaError::MissingField {
                field: field.to_string(),
                record,
            })
    }

    /// Check that every record carries every listed field
    pub fn require_fields(&self, fields: &[&str]) -> Result<()> {
        for (i, record) in self.records.iter().enumerate() {
            for field in fields {
                if !record.contains_key(*field) {
                    return Err(AnovaError::MissingField {
                        field: field.to_string(),
                        record: i,
                    });
                }
            }
        }
        Ok(())
    }

    /// Extract a numeric column; every value must be a finite number
    pub fn numeric_column(&self, field: &str) -> Result<Vec<f64>> {
        (0..self.records.len())
            .map(|i| {
                let value = self.value(i, field)?;
                match value.as_f64() {
                    Some(x) if x.is_finite() => Ok(x),
                    Some(x) => Err(AnovaError::InvalidValue {
                        field: field.to_string(),
                        record: i,
                        reason: format!("non-finite number {}", x),
                    }),
                    None => Err(AnovaError::InvalidValue {
                        field: field.to_string(),
                        record: i,
                        reason: format!("expected a number, found {}", value.kind()),
                    }),
                }
            })
            .collect()
    }

    /// Extract a column as category labels
    pub fn categorical_column(&self, field: &str) -> Result<Vec<String>> {
        (0..self.records.len())
            .map(|i| {
                let value = self.value(i, field)?;
                value.category_label().ok_or_else(|| AnovaError::InvalidValue {
                    field: field.to_string(),
                    record: i,
                    reason: format!("{} value cannot be used as a category", value.kind()),
                })
            })
            .collect()
    }

    /// Return a copy with one numeric field added (or replaced)
    pub fn with_numeric_field(&self, name: &str, values: &[f64]) -> Result<Dataset> {
        self.with_field(name, values.iter().map(|&x| Value::Number(x)).collect())
    }

    /// Return a copy with one field added (or replaced)
    pub fn with_field(&self, name: &str, values: Vec<Value>) -> Result<Dataset> {
        if values.len() != self.records.len() {
            return Err(AnovaError::InvalidInput {
                reason: format!(
                    "field '{}' has {} values for {} records",
                    name,
                    values.len(),
                    self.records.len()
                ),
            });
        }

        let records = self
            .records
            .iter()
            .zip(values)
            .map(|(record, value)| {
                let mut record = record.clone();
                record.insert(name.to_string(), value);
                record
            })
            .collect();

        Ok(Dataset { records })
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Dataset::new(records)
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}
