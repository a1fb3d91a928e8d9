//! Loading experiment records from result files

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::data::{Dataset, Record, Value};
use crate::error::{AnovaError, Result};

/// Load records from a `.csv`, `.json` or `.jsonl` file
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let dataset = match extension.as_deref() {
        Some("csv") => read_csv(path)?,
        Some("json") => read_json(path)?,
        Some("jsonl") => read_jsonl(path)?,
        _ => {
            return Err(AnovaError::UnsupportedFormat {
                path: path.display().to_string(),
            })
        }
    };

    if dataset.is_empty() {
        return Err(AnovaError::EmptyData {
            reason: format!("no records in {}", path.display()),
        });
    }

    log::info!("Loaded {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Read a delimited file with a header row
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(AnovaError::EmptyData {
            reason: format!("{} has no header row", path.as_ref().display()),
        });
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(h, cell)| (h.clone(), Value::parse_cell(cell)))
            .collect();
        records.push(record);
    }

    Ok(Dataset::new(records))
}

/// Read a JSON array of objects, or a single object
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;

    let records = match json {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Record>, _>>()?,
        object @ serde_json::Value::Object(_) => vec![serde_json::from_value(object)?],
        other => {
            return Err(AnovaError::InvalidInput {
                reason: format!("expected an array of records, found {}", json_kind(&other)),
            })
        }
    };

    Ok(Dataset::new(records))
}

/// Read one JSON object per non-blank line
pub fn read_jsonl<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str::<Record>(&line)?);
    }

    Ok(Dataset::new(records))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
