//! # Smart Triage
//!
//! Patient triage inference over frozen, pre-trained models.
//!
//! For one raw patient record this crate produces:
//! - a risk level with the model's confidence
//! - a 0-100 priority score
//! - a recommended department (safety override, learned model, then rules)
//! - the top contributing features
//! - a summary of the patient's EHR history
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (patient input, feature vector, prediction result, EHR)
//! - `ports`: Trait definitions for the frozen predictors
//! - `adapters`: Concrete implementations (JSON forest, encoders, bundle, CSV, log sanitizing)
//! - `application`: The pipeline stages and the `TriageService` entry point
//! - `config`: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{TriageModels, TriageService};
pub use config::TriageConfig;
pub use domain::{EhrDataset, PatientInput, PredictionResult, RiskLevel};

/// Result type for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

/// Main error type for triage operations
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Model invocation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Model bundle error: {0}")]
    Bundle(#[from] adapters::BundleError),

    #[error("EHR dataset error: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
