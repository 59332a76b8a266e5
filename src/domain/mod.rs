//! Domain layer: Core triage types and input normalization.
//!
//! This module contains pure Rust types with no model or I/O dependencies.

mod diagnosis;
mod ehr;
mod features;
pub mod patient;

pub use diagnosis::{departments, Contributor, PredictionResult, RiskLevel, TopContributors};
pub use ehr::{
    EhrDataset, EhrRow, EhrSummary, COL_AVG_BP, COL_AVG_HEART_RATE, COL_CHRONIC_CONDITIONS,
    COL_LAST_RISK, COL_PAST_VISITS, COL_PATIENT_ID,
};
pub use features::EncodedFeatureVector;
pub use patient::{PatientInput, PatientRecord};
