//! rust_anova: significance analysis of experiment results in Rust
//!
//! Normalizes a target metric into relative percentage deviation, decomposes
//! its variance over categorical factors (one-way or Type II multi-way ANOVA
//! with all interactions) and runs Tukey HSD on every significant main effect.
//!
//! # Example
//!
//! ```ignore
//! use rust_anova::prelude::*;
//!
//! // Load data
//! let dataset = load_dataset("results.jsonl")?;
//!
//! // Run analysis
//! let report = run_analysis(&dataset, "elecCost", &["strategy", "ascending"], &AnalysisOptions::default())?;
//!
//! // Write results
//! write_report_bundle("out", "results", &report)?;
//! ```
//!
//! # Features
//!
//! - `plotting` - point plots of group means with 95% confidence intervals

pub mod cli;
pub mod compare;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod normalization;
pub mod pipeline;
#[cfg(feature = "plotting")]
pub mod plotting;
pub mod stats;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::compare::{compare, write_comparison_table, CompareOptions, Comparison, GroupSummary};
    pub use crate::data::{Dataset, Factor, Record, Value};
    pub use crate::error::{AnovaError, Result};
    pub use crate::io::{load_dataset, unique_file_stems, write_anova_table, write_report_bundle, write_summary, write_tukey_table};
    pub use crate::model::{build_terms, formula_string, Term};
    pub use crate::normalization::{normalize, normalize_with_sense, MetricSense};
    pub use crate::pipeline::{run_analysis, run_batch, AnalysisOptions, AnalysisReport, BatchJob};
    pub use crate::testing::{
        analyze, run_post_hoc, tukey_hsd, AnalysisKind, AnalysisRequest, AnovaTable, EffectResult,
        PostHocOutcome, PostHocResults, TukeyHsdResult, ALPHA,
    };

    #[cfg(feature = "plotting")]
    pub use crate::plotting::{plot_comparison, plot_point_estimates, ColorPalette, PlotConfig};
}
