//! Design matrix creation for factorial linear models

use ndarray::{Array2, Axis};
use std::collections::HashMap;

use super::Term;
use crate::data::Factor;
use crate::error::{AnovaError, Result};

/// Treatment-coded design matrix with per-term column bookkeeping
///
/// Column 0 is the intercept. Every term contributes one column per
/// combination of non-reference levels of its factors; the reference level
/// of a factor is its first (alphabetical) level.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// Full model matrix (records x columns)
    pub matrix: Array2<f64>,
    /// Names of the columns
    pub coef_names: Vec<String>,
    /// Columns belonging to each term, in term order
    pub term_columns: Vec<(Term, Vec<usize>)>,
}

impl DesignMatrix {
    /// Number of records
    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Sub-matrix with the intercept plus the columns of the selected terms
    pub fn select_terms(&self, terms: &[&Term]) -> Array2<f64> {
        let mut cols = vec![0];
        for (term, term_cols) in &self.term_columns {
            if terms.iter().any(|t| *t == term) {
                cols.extend(term_cols.iter().copied());
            }
        }
        self.matrix.select(Axis(1), &cols)
    }
}

/// Create the model matrix for a set of terms over categorical factors
pub fn create_design_matrix(factors: &[Factor], terms: &[Term]) -> Result<DesignMatrix> {
    let by_name = index_factors(factors);
    let n_records = factors.first().map(|f| f.len()).unwrap_or(0);

    if n_records == 0 {
        return Err(AnovaError::EmptyData {
            reason: "Design matrix has zero rows".to_string(),
        });
    }

    let mut coef_names = vec!["Intercept".to_string()];
    let mut term_columns = Vec::with_capacity(terms.len());
    // (factor, level index) pairs that must all match for a column to be 1
    let mut column_levels: Vec<Vec<(&Factor, usize)>> = vec![Vec::new()];

    for term in terms {
        let term_factors = term_factors(&by_name, term)?;

        let mut cols = Vec::new();
        for combo in non_reference_combinations(&term_factors) {
            let name = combo
                .iter()
                .map(|&(f, l)| {
                    if term.is_main_effect() {
                        format!("{}_{}_vs_{}", f.name(), f.levels()[l], f.levels()[0])
                    } else {
                        format!("{}_{}", f.name(), f.levels()[l])
                    }
                })
                .collect::<Vec<_>>()
                .join("_x_");
            cols.push(coef_names.len());
            coef_names.push(name);
            column_levels.push(combo);
        }
        term_columns.push((term.clone(), cols));
    }

    let mut matrix = Array2::zeros((n_records, coef_names.len()));
    for i in 0..n_records {
        for (j, levels) in column_levels.iter().enumerate() {
            let hit = levels.iter().all(|&(f, l)| f.codes()[i] == l);
            matrix[[i, j]] = if hit { 1.0 } else { 0.0 };
        }
    }

    Ok(DesignMatrix {
        matrix,
        coef_names,
        term_columns,
    })
}

/// Check that every cell implied by every term holds at least one record
///
/// A cell is one combination of levels of the term's factors. An empty cell
/// leaves the corresponding model column without support.
pub fn check_cells(factors: &[Factor], terms: &[Term]) -> Result<()> {
    let by_name = index_factors(factors);

    for term in terms {
        let term_factors = term_factors(&by_name, term)?;
        let sizes: Vec<usize> = term_factors.iter().map(|f| f.n_levels()).collect();
        let n_cells: usize = sizes.iter().product();

        let mut counts = vec![0usize; n_cells];
        let n_records = term_factors.first().map(|f| f.len()).unwrap_or(0);
        for i in 0..n_records {
            let mut cell = 0;
            for f in &term_factors {
                cell = cell * f.n_levels() + f.codes()[i];
            }
            counts[cell] += 1;
        }

        if let Some(empty) = counts.iter().position(|&c| c == 0) {
            // Decode the mixed-radix cell index back into level labels
            let mut rest = empty;
            let mut labels = vec![String::new(); term_factors.len()];
            for (k, f) in term_factors.iter().enumerate().rev() {
                let level = rest % f.n_levels();
                rest /= f.n_levels();
                labels[k] = format!("{}={}", f.name(), f.levels()[level]);
            }
            return Err(AnovaError::InsufficientGroups {
                term: term.name(),
                cell: labels.join(", "),
            });
        }
    }

    Ok(())
}

fn index_factors(factors: &[Factor]) -> HashMap<&str, &Factor> {
    factors.iter().map(|f| (f.name(), f)).collect()
}

fn term_factors<'a>(by_name: &HashMap<&str, &'a Factor>, term: &Term) -> Result<Vec<&'a Factor>> {
    term.factors()
        .iter()
        .map(|name| {
            by_name.get(name.as_str()).copied().ok_or_else(|| AnovaError::InvalidInput {
                reason: format!("term '{}' refers to unknown factor '{}'", term, name),
            })
        })
        .collect()
}

/// Cartesian product of the non-reference levels of each factor
fn non_reference_combinations<'a>(factors: &[&'a Factor]) -> Vec<Vec<(&'a Factor, usize)>> {
    let mut combos: Vec<Vec<(&Factor, usize)>> = vec![Vec::new()];
    for &f in factors {
        let mut next = Vec::with_capacity(combos.len() * f.n_levels().saturating_sub(1));
        for combo in &combos {
            for level in 1..f.n_levels() {
                let mut extended = combo.clone();
                extended.push((f, level));
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}
