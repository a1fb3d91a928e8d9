//! Input/Output: loading records and writing reports

mod loader;
mod report;

pub use loader::{load_dataset, read_csv, read_json, read_jsonl};
pub use report::{
    unique_file_stems, write_anova_table, write_report_bundle, write_report_json, write_summary, write_tukey_table,
};
