//! CSV loader for EHR history tables.
//!
//! The first row is the header. Cells are typed loosely:
//! - empty cell → `null`
//! - integer or decimal text → number
//! - anything else → string
//!
//! ```text
//! Patient_ID,Past_Visits,Last_Risk_Level,Avg_BP,Avg_Heart_Rate,Chronic_Conditions
//! 42,3,Medium,131.5,88,Hypertension
//! ```

use std::io::Read;
use std::path::Path;

use serde_json::{Number, Value};

use crate::domain::{EhrDataset, EhrRow};
use crate::TriageError;

/// Parse an EHR table from any reader.
///
/// # Errors
/// Returns `TriageError::Dataset` for malformed CSV (e.g. ragged rows).
pub fn parse_ehr_csv<R: Read>(reader: R) -> Result<EhrDataset, TriageError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()
        .map_err(|e| TriageError::Dataset(format!("CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| TriageError::Dataset(format!("CSV row {}: {e}", row_idx + 1)))?;
        let row: EhrRow = columns
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column.clone(), cell_value(cell)))
            .collect();
        rows.push(row);
    }

    Ok(EhrDataset::new(columns, rows))
}

/// Load an EHR table from a CSV file.
///
/// # Errors
/// Returns error if the file cannot be opened or parsed.
pub fn load_ehr_csv(path: &Path) -> Result<EhrDataset, TriageError> {
    let file = std::fs::File::open(path)?;
    let dataset = parse_ehr_csv(std::io::BufReader::new(file))?;
    tracing::info!(
        "Loaded EHR dataset from {:?} ({} rows, {} columns)",
        path,
        dataset.len(),
        dataset.columns.len()
    );
    Ok(dataset)
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(cell.to_string()), Value::Number)
}
