//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual artifact and file integrations:
//! - `forest`: JSON decision forest (classifier + explainer)
//! - `encoders`: JSON label and symptom encoders
//! - `bundle`: signed model bundle loading
//! - `ehr_csv`: EHR history tables from CSV
//! - `sanitize`: PII filtering for logs

pub mod bundle;
pub mod ehr_csv;
pub mod encoders;
pub mod forest;
pub mod sanitize;

pub use bundle::{BundleError, BundleOptions, ModelBundle};
pub use ehr_csv::load_ehr_csv;
pub use encoders::{JsonLabelEncoder, JsonMultiLabelEncoder};
pub use forest::DecisionForest;
