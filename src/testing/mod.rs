//! Significance testing: variance decomposition and post-hoc comparisons

mod anova;
mod posthoc;
mod pvalue;
mod studentized_range;
mod tukey;

pub use anova::{
    analyze, analyze_request, one_way_anova, type_ii_anova, AnalysisKind, AnalysisRequest,
    AnovaTable, EffectResult, ResidualRow, ALPHA,
};
pub use posthoc::{run_post_hoc, FactorPostHoc, PostHocOutcome, PostHocResults};
pub use pvalue::{f_pvalue, t_critical};
pub use studentized_range::{ptukey, qtukey};
pub use tukey::{tukey_hsd, PairwiseComparison, TukeyHsdResult};
