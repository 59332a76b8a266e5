//! Model ports: Traits for the frozen, pre-trained predictors.
//!
//! These traits abstract the trained artifacts from the pipeline. All
//! implementations are read-only after construction and must be safe to
//! call from concurrent requests without locking.

use crate::domain::EncodedFeatureVector;

/// Error type for predictor invocations.
///
/// Any of these indicates a precondition violation (a vector that does not
/// match the model) or a corrupt artifact, never bad user input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Feature vector shape mismatch: {0}")]
    Shape(String),

    #[error("Unknown class index {index} (decoder has {classes} classes)")]
    UnknownClass { index: usize, classes: usize },

    #[error("Model produced invalid output: {0}")]
    InvalidOutput(String),
}

/// A frozen classifier over one encoded row.
pub trait Classifier: Send + Sync {
    /// Ordered input columns the classifier was trained on.
    fn required_columns(&self) -> &[String];

    /// Encoded class index for the row.
    ///
    /// # Errors
    /// Returns `ModelError::Shape` if the vector does not match
    /// [`Self::required_columns`].
    fn predict(&self, row: &EncodedFeatureVector) -> Result<usize, ModelError>;

    /// Class probabilities for the row, indexed like the label decoder.
    ///
    /// # Errors
    /// Returns `ModelError::Shape` if the vector does not match
    /// [`Self::required_columns`].
    fn predict_proba(&self, row: &EncodedFeatureVector) -> Result<Vec<f64>, ModelError>;
}

/// Maps encoded class indices back to human-readable labels.
pub trait LabelDecoder: Send + Sync {
    fn classes(&self) -> &[String];

    /// # Errors
    /// Returns `ModelError::UnknownClass` if the index is out of range.
    fn decode(&self, index: usize) -> Result<&str, ModelError> {
        let classes = self.classes();
        classes
            .get(index)
            .map(String::as_str)
            .ok_or(ModelError::UnknownClass {
                index,
                classes: classes.len(),
            })
    }
}

/// Multi-label binarizer over a fixed symptom vocabulary.
pub trait SymptomEncoder: Send + Sync {
    /// Known symptoms; also the names of the encoded columns.
    fn vocabulary(&self) -> &[String];

    /// One binary slot per vocabulary entry. Symptoms outside the
    /// vocabulary do not set any slot.
    fn transform(&self, symptoms: &[String]) -> Vec<f64> {
        self.vocabulary()
            .iter()
            .map(|known| {
                if symptoms.iter().any(|s| s == known) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Per-feature attributions for a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribution {
    /// One slice per class, each with one value per feature.
    PerClass(Vec<Vec<f64>>),
    /// One value per feature.
    Single(Vec<f64>),
}

/// Feature-attribution explainer bound to the risk classifier.
pub trait FeatureAttributor: Send + Sync {
    /// # Errors
    /// Returns `ModelError::Shape` if the vector does not match the
    /// classifier's schema.
    fn attribute(&self, row: &EncodedFeatureVector) -> Result<Attribution, ModelError>;
}
