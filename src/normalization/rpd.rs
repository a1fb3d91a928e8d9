//! Relative percentage deviation (RPD) of a target metric
//!
//! RPD = (value - reference) / reference * 100
//!
//! The reference is the best known value. Without an explicit reference the
//! best observed value is used: the minimum for cost-like metrics, the
//! maximum for metrics where higher is better.

use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{AnovaError, Result};

/// Suffix appended to the target field name for the derived RPD field
pub const RPD_SUFFIX: &str = "Rpd";

/// Direction in which the target metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetricSense {
    /// Cost-like metric: the minimum observed value is the best known
    #[default]
    LowerIsBetter,
    /// Score-like metric: the maximum observed value is the best known
    HigherIsBetter,
}

/// Name of the derived RPD field for a target
pub fn rpd_field_name(target_field: &str) -> String {
    format!("{}{}", target_field, RPD_SUFFIX)
}

/// Normalize a cost-like target into RPD
///
/// Returns a copy of the dataset carrying the derived field and the name of
/// that field. The original target field is left untouched.
pub fn normalize(
    dataset: &Dataset,
    target_field: &str,
    reference: Option<f64>,
) -> Result<(Dataset, String)> {
    normalize_with_sense(dataset, target_field, reference, MetricSense::LowerIsBetter)
}

/// Normalize a target into RPD, choosing the implicit reference by `sense`
pub fn normalize_with_sense(
    dataset: &Dataset,
    target_field: &str,
    reference: Option<f64>,
    sense: MetricSense,
) -> Result<(Dataset, String)> {
    let values = dataset.numeric_column(target_field)?;
    let reference = resolve_reference(target_field, &values, reference, sense)?;

    let rpd = relative_deviation(&values, reference);
    let name = rpd_field_name(target_field);
    log::debug!(
        "Normalized '{}' into '{}' with reference {}",
        target_field,
        name,
        reference
    );

    Ok((dataset.with_numeric_field(&name, &rpd)?, name))
}

/// Resolve the reference value and check it can be divided by
pub fn resolve_reference(
    target_field: &str,
    values: &[f64],
    reference: Option<f64>,
    sense: MetricSense,
) -> Result<f64> {
    let reference = match reference {
        Some(r) => r,
        None => {
            if values.is_empty() {
                return Err(AnovaError::EmptyData {
                    reason: format!("no values of '{}' to derive a reference from", target_field),
                });
            }
            match sense {
                MetricSense::LowerIsBetter => values.iter().cloned().fold(f64::INFINITY, f64::min),
                MetricSense::HigherIsBetter => {
                    values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                }
            }
        }
    };

    if reference == 0.0 {
        return Err(AnovaError::InvalidReference {
            field: target_field.to_string(),
            reference,
            reason: "reference is zero, relative deviation is undefined".to_string(),
        });
    }
    if !reference.is_finite() {
        return Err(AnovaError::InvalidReference {
            field: target_field.to_string(),
            reference,
            reason: "reference is not finite".to_string(),
        });
    }
    if reference < 0.0 {
        log::warn!(
            "Reference {} for '{}' is negative; RPD signs are inverted",
            reference,
            target_field
        );
    }

    Ok(reference)
}

/// (value - reference) / reference * 100 for every value
pub fn relative_deviation(values: &[f64], reference: f64) -> Vec<f64> {
    values
        .iter()
        .map(|&v| (v - reference) / reference * 100.0)
        .collect()
}
