//! Writing analysis reports: CSV tables, text summary, JSON

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pipeline::AnalysisReport;
use crate::testing::{AnovaTable, PostHocOutcome, TukeyHsdResult};

/// Write the significance table as CSV, residual row last
pub fn write_anova_table<P: AsRef<Path>>(path: P, table: &AnovaTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["term", "sum_sq", "df", "F", "PR(>F)"])?;

    for effect in &table.effects {
        writer.write_record([
            effect.name(),
            effect.sum_sq.to_string(),
            effect.df.to_string(),
            effect.f_statistic.to_string(),
            effect.p_value.to_string(),
        ])?;
    }
    writer.write_record([
        "Residual".to_string(),
        table.residual.sum_sq.to_string(),
        table.residual.df.to_string(),
        String::new(),
        String::new(),
    ])?;

    writer.flush()?;
    Ok(())
}

/// Write pairwise comparisons of one factor as CSV
pub fn write_tukey_table<P: AsRef<Path>>(path: P, result: &TukeyHsdResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"])?;

    for c in &result.comparisons {
        writer.write_record([
            c.group1.clone(),
            c.group2.clone(),
            format!("{:.4}", c.mean_diff),
            format!("{:.4}", c.p_adj),
            format!("{:.4}", c.lower),
            format!("{:.4}", c.upper),
            if c.reject { "True" } else { "False" }.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the human-readable summary
pub fn write_summary<P: AsRef<Path>>(path: P, report: &AnalysisReport) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write!(file, "{}", report)?;
    file.flush()?;
    Ok(())
}

/// Write the whole report as pretty-printed JSON
pub fn write_report_json<P: AsRef<Path>>(path: P, report: &AnalysisReport) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

/// Write every report artifact into `dir` and return the written paths
///
/// Files: `<base>_anova_table.csv`, `<base>_tukey_<factor>.csv` per
/// completed comparison, `<base>_anova_summary.txt`, `<base>_report.json`.
pub fn write_report_bundle<P: AsRef<Path>>(
    dir: P,
    base_name: &str,
    report: &AnalysisReport,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let table_path = dir.join(format!("{}_anova_table.csv", base_name));
    write_anova_table(&table_path, &report.anova)?;
    written.push(table_path);

    let completed: Vec<(&str, &TukeyHsdResult)> = report
        .post_hoc
        .entries()
        .iter()
        .filter_map(|entry| match &entry.outcome {
            PostHocOutcome::Completed(result) => Some((entry.factor.as_str(), result)),
            PostHocOutcome::Skipped { .. } => None,
        })
        .collect();
    let stems = unique_file_stems(completed.iter().map(|(factor, _)| *factor));
    for ((_, result), stem) in completed.iter().zip(stems) {
        let path = dir.join(format!("{}_tukey_{}.csv", base_name, stem));
        write_tukey_table(&path, result)?;
        written.push(path);
    }

    let summary_path = dir.join(format!("{}_anova_summary.txt", base_name));
    write_summary(&summary_path, report)?;
    written.push(summary_path);

    let json_path = dir.join(format!("{}_report.json", base_name));
    write_report_json(&json_path, report)?;
    written.push(json_path);

    for path in &written {
        log::info!("Wrote {}", path.display());
    }
    Ok(written)
}

/// Replace characters that are awkward in file names
fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// File-name-safe stems for `names`, one per name and pairwise distinct
///
/// Names that sanitize to the same stem (`a b` and `a_b`, or the same file
/// stem from two directories) get `_2`, `_3`, ... suffixes in input order.
pub fn unique_file_stems<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut used = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let base = sanitize_file_component(name.as_ref());
            let mut stem = base.clone();
            let mut n = 2;
            while !used.insert(stem.clone()) {
                stem = format!("{}_{}", base, n);
                n += 1;
            }
            stem
        })
        .collect()
}
