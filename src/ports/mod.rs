//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the triage pipeline and the trained model artifacts.

mod model;

pub use model::{Attribution, Classifier, FeatureAttributor, LabelDecoder, ModelError, SymptomEncoder};
