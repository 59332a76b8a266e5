//! Application layer: Use cases and services.
//!
//! Each pipeline stage lives in its own module and depends only on domain
//! types and the model ports. `inference` wires them into one call.

pub mod ehr;
pub mod encoder;
pub mod explain;
mod inference;
pub mod predictor;
pub mod priority;
pub mod routing;

pub use encoder::FeatureEncoder;
pub use explain::{ExplanationEngine, MAX_CONTRIBUTORS};
pub use inference::{TriageModels, TriageService};
pub use predictor::{RiskAssessment, RiskPredictor};
pub use priority::priority_score;
pub use routing::{DepartmentRouter, RoutingDecision, RoutingSource};
