//! Normalization of target metrics

mod rpd;

pub use rpd::{
    normalize, normalize_with_sense, relative_deviation, resolve_reference, rpd_field_name,
    MetricSense, RPD_SUFFIX,
};
