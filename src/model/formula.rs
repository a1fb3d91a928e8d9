//! Model terms and the full interaction lattice
//!
//! For factors `a, b, c` the lattice is
//! `a + b + c + a:b + a:c + b:c + a:b:c`: every non-empty subset, ordered by
//! subset size first and by input order within a size.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{AnovaError, Result};

/// Separator between factor names in an interaction term
pub const INTERACTION_SEPARATOR: &str = ":";

/// Largest factor count accepted; the lattice has 2^n - 1 terms
pub const MAX_FACTORS: usize = 16;

/// One model term: a main effect or an interaction of several factors
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    factors: Vec<String>,
}

impl Term {
    /// Create a term from its factor names (kept in the given order)
    pub fn new<S: AsRef<str>>(factors: &[S]) -> Self {
        Self {
            factors: factors.iter().map(|f| f.as_ref().to_string()).collect(),
        }
    }

    /// Factor names in this term
    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    /// Number of factors (1 for a main effect)
    pub fn order(&self) -> usize {
        self.factors.len()
    }

    /// True for single-factor terms
    pub fn is_main_effect(&self) -> bool {
        self.factors.len() == 1
    }

    /// Display name, e.g. `strategy` or `strategy:ascending`
    pub fn name(&self) -> String {
        self.factors.join(INTERACTION_SEPARATOR)
    }

    /// True if every factor of `other` appears in this term (order ignored)
    pub fn contains(&self, other: &Term) -> bool {
        other.factors.iter().all(|f| self.factors.contains(f))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Build every main-effect and interaction term for the given factors
pub fn build_terms<S: AsRef<str>>(factors: &[S]) -> Result<Vec<Term>> {
    if factors.is_empty() {
        return Err(AnovaError::EmptyFactorSet);
    }

    let mut seen = HashSet::new();
    for factor in factors {
        if !seen.insert(factor.as_ref()) {
            return Err(AnovaError::DuplicateFactor {
                factor: factor.as_ref().to_string(),
            });
        }
    }

    let n = factors.len();
    if n > MAX_FACTORS {
        return Err(AnovaError::InvalidInput {
            reason: format!(
                "{} factors give 2^{} - 1 model terms, at most {} factors are supported",
                n, n, MAX_FACTORS
            ),
        });
    }

    let mut terms = Vec::with_capacity((1usize << n) - 1);
    for k in 1..=n {
        for combo in combinations(n, k) {
            let names: Vec<&str> = combo.iter().map(|&i| factors[i].as_ref()).collect();
            terms.push(Term::new(&names));
        }
    }

    Ok(terms)
}

/// Render a model formula, e.g. `elecCost ~ a + b + a:b`
pub fn formula_string(target: &str, terms: &[Term]) -> String {
    let rhs: Vec<String> = terms.iter().map(|t| t.name()).collect();
    format!("{} ~ {}", target, rhs.join(" + "))
}

/// All k-subsets of 0..n as sorted index vectors, in lexicographic order
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }

    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());

        // Find the rightmost index that can still move right
        let mut i = k;
        while i > 0 && idx[i - 1] == i - 1 + n - k {
            i -= 1;
        }
        if i == 0 {
            break;
        }
        idx[i - 1] += 1;
        for j in i..k {
            idx[j] = idx[j - 1] + 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_factor_lattice() {
        let terms = build_terms(&["workflowComparator", "ascending"]).unwrap();
        let names: Vec<String> = terms.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["workflowComparator", "ascending", "workflowComparator:ascending"]
        );
        assert!(terms[0].is_main_effect());
        assert!(!terms[2].is_main_effect());
    }

    #[test]
    fn test_three_factor_order() {
        let terms = build_terms(&["a", "b", "c"]).unwrap();
        let names: Vec<String> = terms.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "a:b", "a:c", "b:c", "a:b:c"]);
    }

    #[test]
    fn test_term_count_law() {
        for n in 1..=6 {
            let factors: Vec<String> = (0..n).map(|i| format!("f{}", i)).collect();
            let terms = build_terms(&factors).unwrap();
            assert_eq!(terms.len(), (1 << n) - 1, "n = {}", n);

            let subsets: HashSet<Vec<String>> = terms
                .iter()
                .map(|t| {
                    let mut s = t.factors().to_vec();
                    s.sort();
                    s
                })
                .collect();
            assert_eq!(subsets.len(), terms.len(), "duplicate subset for n = {}", n);

            // orders never decrease
            for pair in terms.windows(2) {
                assert!(pair[0].order() <= pair[1].order());
            }
        }
    }

    #[test]
    fn test_empty_factor_set() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(build_terms(&empty), Err(AnovaError::EmptyFactorSet)));
    }

    #[test]
    fn test_duplicate_factor() {
        match build_terms(&["a", "b", "a"]) {
            Err(AnovaError::DuplicateFactor { factor }) => assert_eq!(factor, "a"),
            other => panic!("expected DuplicateFactor, got {:?}", other),
        }
    }

    #[test]
    fn test_too_many_factors_rejected() {
        let factors: Vec<String> = (0..64).map(|i| format!("f{}", i)).collect();
        assert!(matches!(build_terms(&factors), Err(AnovaError::InvalidInput { .. })));

        let limit: Vec<String> = (0..MAX_FACTORS + 1).map(|i| format!("f{}", i)).collect();
        assert!(build_terms(&limit).is_err());
    }

    #[test]
    fn test_contains_ignores_order() {
        let ab = Term::new(&["a", "b"]);
        let ba = Term::new(&["b", "a"]);
        let a = Term::new(&["a"]);
        assert!(ab.contains(&ba));
        assert!(ab.contains(&a));
        assert!(!a.contains(&ab));
    }

    #[test]
    fn test_formula_string() {
        let terms = build_terms(&["a", "b"]).unwrap();
        assert_eq!(formula_string("elecCost", &terms), "elecCost ~ a + b + a:b");
    }
}
