//! Linear model construction for factorial designs

mod design;
mod formula;
mod least_squares;

pub use design::{check_cells, create_design_matrix, DesignMatrix};
pub use formula::{build_terms, formula_string, Term, INTERACTION_SEPARATOR, MAX_FACTORS};
pub use least_squares::{fit_least_squares, LeastSquaresFit};
