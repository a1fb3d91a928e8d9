//! Data structures for experiment records

mod dataset;
mod factor;
mod value;

pub use dataset::{Dataset, Record};
pub use factor::Factor;
pub use value::Value;
