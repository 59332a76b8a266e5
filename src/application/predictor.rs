//! Risk predictor: Runs the frozen classifier on one encoded row.

use crate::domain::EncodedFeatureVector;
use crate::ports::{Classifier, LabelDecoder, ModelError};

/// Decoded classifier output for a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Human-readable risk label from the decoder vocabulary
    pub label: String,

    /// Maximum class probability (0.0 to 1.0)
    pub confidence: f64,
}

/// Classifier paired with the decoder for its labels.
pub struct RiskPredictor<'a> {
    classifier: &'a dyn Classifier,
    decoder: &'a dyn LabelDecoder,
}

impl<'a> RiskPredictor<'a> {
    #[must_use]
    pub fn new(classifier: &'a dyn Classifier, decoder: &'a dyn LabelDecoder) -> Self {
        Self {
            classifier,
            decoder,
        }
    }

    /// Predict the risk label and confidence for an encoded row.
    ///
    /// The row is trusted to match the classifier's schema; a mismatch
    /// surfaces as the classifier's own error.
    ///
    /// # Errors
    /// Returns error if the classifier rejects the row, the class index
    /// cannot be decoded, or the probabilities are unusable.
    pub fn predict_risk(&self, row: &EncodedFeatureVector) -> Result<RiskAssessment, ModelError> {
        let label = decode_prediction(self.classifier, self.decoder, row)?;
        let probabilities = self.classifier.predict_proba(row)?;
        let confidence = max_probability(&probabilities)?;

        Ok(RiskAssessment { label, confidence })
    }
}

/// Predict a class index and decode it to its label.
///
/// # Errors
/// Returns error if prediction or decoding fails.
pub fn decode_prediction(
    classifier: &dyn Classifier,
    decoder: &dyn LabelDecoder,
    row: &EncodedFeatureVector,
) -> Result<String, ModelError> {
    let index = classifier.predict(row)?;
    decoder.decode(index).map(str::to_string)
}

fn max_probability(probabilities: &[f64]) -> Result<f64, ModelError> {
    let max = probabilities
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    if !(0.0..=1.0).contains(&max) {
        return Err(ModelError::InvalidOutput(format!(
            "Class probabilities {probabilities:?} have no maximum in [0, 1]"
        )));
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClassifier {
        columns: Vec<String>,
        index: usize,
        proba: Vec<f64>,
    }

    impl Classifier for FixedClassifier {
        fn required_columns(&self) -> &[String] {
            &self.columns
        }

        fn predict(&self, _row: &EncodedFeatureVector) -> Result<usize, ModelError> {
            Ok(self.index)
        }

        fn predict_proba(&self, _row: &EncodedFeatureVector) -> Result<Vec<f64>, ModelError> {
            Ok(self.proba.clone())
        }
    }

    struct Labels(Vec<String>);

    impl LabelDecoder for Labels {
        fn classes(&self) -> &[String] {
            &self.0
        }
    }

    fn labels() -> Labels {
        Labels(vec!["High".into(), "Low".into(), "Medium".into()])
    }

    fn row() -> EncodedFeatureVector {
        EncodedFeatureVector::new(vec!["Age".into()], vec![40.0]).expect("valid row")
    }

    #[test]
    fn test_decodes_label_and_takes_max_probability() {
        let classifier = FixedClassifier {
            columns: vec!["Age".into()],
            index: 2,
            proba: vec![0.1, 0.25, 0.65],
        };
        let decoder = labels();
        let predictor = RiskPredictor::new(&classifier, &decoder);

        let risk = predictor.predict_risk(&row()).expect("prediction");
        assert_eq!(risk.label, "Medium");
        assert!((risk.confidence - 0.65).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_class_index_is_an_error() {
        let classifier = FixedClassifier {
            columns: vec!["Age".into()],
            index: 7,
            proba: vec![1.0, 0.0, 0.0],
        };
        let decoder = labels();
        let err = RiskPredictor::new(&classifier, &decoder)
            .predict_risk(&row())
            .expect_err("must fail");
        assert_eq!(err, ModelError::UnknownClass { index: 7, classes: 3 });
    }

    #[test]
    fn test_empty_probabilities_are_rejected() {
        let classifier = FixedClassifier {
            columns: vec!["Age".into()],
            index: 0,
            proba: vec![],
        };
        let decoder = labels();
        let err = RiskPredictor::new(&classifier, &decoder)
            .predict_risk(&row())
            .expect_err("must fail");
        assert!(matches!(err, ModelError::InvalidOutput(_)));
    }
}
