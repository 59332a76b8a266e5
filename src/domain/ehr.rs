//! Historical EHR context types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COL_PATIENT_ID: &str = "Patient_ID";
pub const COL_PAST_VISITS: &str = "Past_Visits";
pub const COL_LAST_RISK: &str = "Last_Risk_Level";
pub const COL_AVG_BP: &str = "Avg_BP";
pub const COL_AVG_HEART_RATE: &str = "Avg_Heart_Rate";
pub const COL_CHRONIC_CONDITIONS: &str = "Chronic_Conditions";

/// Aggregated visit history for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EhrSummary {
    pub past_visits: u32,
    pub last_risk: String,
    pub avg_bp: f64,
    pub avg_heart_rate: f64,
    pub chronic_conditions: String,
}

impl Default for EhrSummary {
    fn default() -> Self {
        Self {
            past_visits: 0,
            last_risk: "Unknown".to_string(),
            avg_bp: 0.0,
            avg_heart_rate: 0.0,
            chronic_conditions: "None".to_string(),
        }
    }
}

/// One dataset row: column name to cell. Missing cells are absent or `Null`.
pub type EhrRow = BTreeMap<String, Value>;

/// Tabular per-user EHR history, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EhrDataset {
    pub columns: Vec<String>,
    pub rows: Vec<EhrRow>,
}

impl EhrDataset {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<EhrRow>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
