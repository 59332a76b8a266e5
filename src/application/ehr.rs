//! EHR summarizer: Historical context for a patient from a tabular dataset.
//!
//! Lookups never fail. A missing dataset, a dataset without a patient id
//! column, or an id with no rows all yield [`EhrSummary::default`].

use serde_json::Value;

use crate::domain::patient::parse_f64;
use crate::domain::{
    EhrDataset, EhrRow, EhrSummary, COL_AVG_BP, COL_AVG_HEART_RATE, COL_CHRONIC_CONDITIONS,
    COL_LAST_RISK, COL_PAST_VISITS, COL_PATIENT_ID,
};

/// Summarize the first dataset row for `patient_id`.
#[must_use]
pub fn summarize(patient_id: i64, dataset: Option<&EhrDataset>) -> EhrSummary {
    let Some(dataset) = dataset else {
        return EhrSummary::default();
    };
    if !dataset.has_column(COL_PATIENT_ID) {
        tracing::debug!("EHR dataset has no {COL_PATIENT_ID} column");
        return EhrSummary::default();
    }

    match dataset
        .rows
        .iter()
        .find(|row| row_patient_id(row) == Some(patient_id))
    {
        Some(row) => summary_from_row(row),
        None => {
            tracing::debug!("No EHR history for patient");
            EhrSummary::default()
        }
    }
}

fn row_patient_id(row: &EhrRow) -> Option<i64> {
    row.get(COL_PATIENT_ID).and_then(parse_f64).map(|id| id as i64)
}

fn summary_from_row(row: &EhrRow) -> EhrSummary {
    let defaults = EhrSummary::default();
    let number = |column: &str| row.get(column).and_then(parse_f64);

    EhrSummary {
        past_visits: number(COL_PAST_VISITS)
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(defaults.past_visits),
        last_risk: text(row.get(COL_LAST_RISK)).unwrap_or(defaults.last_risk),
        avg_bp: number(COL_AVG_BP).unwrap_or(defaults.avg_bp),
        avg_heart_rate: number(COL_AVG_HEART_RATE).unwrap_or(defaults.avg_heart_rate),
        chronic_conditions: text(row.get(COL_CHRONIC_CONDITIONS))
            .unwrap_or(defaults.chronic_conditions),
    }
}

/// Cell as text; null and empty cells are missing.
fn text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    (!text.trim().is_empty()).then_some(text)
}
