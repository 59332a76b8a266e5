//! Label encoders loaded from `{"classes": [...]}` artifacts.
//!
//! `JsonLabelEncoder` decodes classifier outputs (risk levels, departments).
//! `JsonMultiLabelEncoder` binarizes symptom lists over a fixed vocabulary.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ports::{LabelDecoder, SymptomEncoder};

#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    #[error("Failed to read encoder: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid encoder JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid encoder: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Serialize)]
struct ClassesArtifact {
    classes: Vec<String>,
}

fn read_classes(path: &Path) -> Result<Vec<String>, EncoderError> {
    let content = std::fs::read_to_string(path)?;
    let artifact: ClassesArtifact = serde_json::from_str(&content)?;
    Ok(artifact.classes)
}

fn check_unique(classes: &[String]) -> Result<(), EncoderError> {
    let mut seen = HashSet::new();
    for class in classes {
        if !seen.insert(class.as_str()) {
            return Err(EncoderError::Invalid(format!("duplicate class {class:?}")));
        }
    }
    Ok(())
}

/// Index-to-label decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLabelEncoder {
    classes: Vec<String>,
}

impl JsonLabelEncoder {
    /// # Errors
    /// Returns `EncoderError::Invalid` for an empty or duplicated class list.
    pub fn new(classes: Vec<String>) -> Result<Self, EncoderError> {
        if classes.is_empty() {
            return Err(EncoderError::Invalid("label encoder has no classes".into()));
        }
        check_unique(&classes)?;
        Ok(Self { classes })
    }

    /// # Errors
    /// Returns error if the file is unreadable or the class list is invalid.
    pub fn load(path: &Path) -> Result<Self, EncoderError> {
        let encoder = Self::new(read_classes(path)?)?;
        tracing::debug!("Loaded label encoder {:?} ({} classes)", path, encoder.classes.len());
        Ok(encoder)
    }
}

impl LabelDecoder for JsonLabelEncoder {
    fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Multi-hot symptom binarizer.
///
/// An empty vocabulary is allowed; it encodes every list to zero columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonMultiLabelEncoder {
    classes: Vec<String>,
}

impl JsonMultiLabelEncoder {
    /// # Errors
    /// Returns `EncoderError::Invalid` for duplicated vocabulary entries.
    pub fn new(classes: Vec<String>) -> Result<Self, EncoderError> {
        check_unique(&classes)?;
        Ok(Self { classes })
    }

    /// # Errors
    /// Returns error if the file is unreadable or the vocabulary is invalid.
    pub fn load(path: &Path) -> Result<Self, EncoderError> {
        let encoder = Self::new(read_classes(path)?)?;
        tracing::debug!("Loaded symptom vocabulary {:?} ({} entries)", path, encoder.classes.len());
        Ok(encoder)
    }
}

impl SymptomEncoder for JsonMultiLabelEncoder {
    fn vocabulary(&self) -> &[String] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ModelError;
    use std::io::Write;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_label_decode() {
        let encoder = JsonLabelEncoder::new(strings(&["High", "Low", "Medium"])).expect("encoder");
        assert_eq!(encoder.decode(2).expect("decode"), "Medium");
        assert_eq!(
            encoder.decode(3),
            Err(ModelError::UnknownClass { index: 3, classes: 3 })
        );
    }

    #[test]
    fn test_label_encoder_rejects_empty_and_duplicates() {
        assert!(JsonLabelEncoder::new(vec![]).is_err());
        assert!(JsonLabelEncoder::new(strings(&["Low", "Low"])).is_err());
        assert!(JsonMultiLabelEncoder::new(strings(&["Fever", "Fever"])).is_err());
        assert!(JsonMultiLabelEncoder::new(vec![]).is_ok());
    }

    #[test]
    fn test_multi_hot_ignores_unknown_symptoms() {
        let encoder =
            JsonMultiLabelEncoder::new(strings(&["Chest Pain", "Fever", "Seizure"])).expect("encoder");
        let encoded = encoder.transform(&strings(&["Seizure", "Hiccups", "Chest Pain"]));
        assert_eq!(encoded, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"classes": ["Cardiology", "Emergency"]}}"#).expect("write");

        let encoder = JsonLabelEncoder::load(file.path()).expect("load");
        assert_eq!(encoder.classes(), strings(&["Cardiology", "Emergency"]).as_slice());

        let mut bad = tempfile::NamedTempFile::new().expect("tempfile");
        write!(bad, r#"{{"labels": []}}"#).expect("write");
        assert!(matches!(JsonLabelEncoder::load(bad.path()), Err(EncoderError::Parse(_))));
    }
}
