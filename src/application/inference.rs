//! Triage service: Orchestrates the inference pipeline for one patient.
//!
//! This service coordinates:
//! - Input normalization
//! - Feature encoding against the risk classifier's schema
//! - Risk prediction and explanation
//! - Department routing and priority scoring
//! - EHR history lookup

use std::sync::Arc;

use crate::application::encoder::FeatureEncoder;
use crate::application::explain::ExplanationEngine;
use crate::application::predictor::RiskPredictor;
use crate::application::routing::DepartmentRouter;
use crate::application::{ehr, priority};
use crate::domain::{EhrDataset, PatientInput, PredictionResult};
use crate::ports::{Classifier, FeatureAttributor, LabelDecoder, SymptomEncoder};
use crate::TriageError;

/// The frozen predictors the pipeline runs against.
///
/// Built once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct TriageModels {
    pub risk_classifier: Arc<dyn Classifier>,
    pub risk_labels: Arc<dyn LabelDecoder>,
    pub symptom_encoder: Arc<dyn SymptomEncoder>,
    pub department_classifier: Arc<dyn Classifier>,
    pub department_labels: Arc<dyn LabelDecoder>,
    pub explainer: Arc<dyn FeatureAttributor>,
}

/// Service for running triage inference.
///
/// Holds no mutable state: `predict_patient` takes `&self` and may be called
/// from any number of threads at once.
#[derive(Clone)]
pub struct TriageService {
    models: TriageModels,
    fallback_ehr: Option<Arc<EhrDataset>>,
}

impl TriageService {
    /// Create a new triage service.
    #[must_use]
    pub fn new(models: TriageModels) -> Self {
        Self {
            models,
            fallback_ehr: None,
        }
    }

    /// Use `dataset` for EHR lookups when a request carries none.
    #[must_use]
    pub fn with_fallback_ehr(mut self, dataset: EhrDataset) -> Self {
        tracing::info!("Using fallback EHR dataset with {} rows", dataset.len());
        self.fallback_ehr = Some(Arc::new(dataset));
        self
    }

    /// Run the full pipeline on one raw patient input.
    ///
    /// Malformed input never fails: it is normalized to defaults. The
    /// request's `ehr` dataset takes precedence over the fallback dataset.
    ///
    /// # Errors
    /// Returns `TriageError::Model` if a predictor rejects the encoded row,
    /// which means the encoder and the model artifacts disagree.
    pub fn predict_patient(
        &self,
        input: &PatientInput,
        ehr: Option<&EhrDataset>,
    ) -> Result<PredictionResult, TriageError> {
        let models = &self.models;

        tracing::debug!("Step 1: Normalizing patient input...");
        let record = input.normalize();

        tracing::debug!("Step 2: Encoding features...");
        let row = FeatureEncoder::new(
            models.symptom_encoder.as_ref(),
            models.risk_classifier.required_columns(),
        )
        .encode(&record);

        tracing::debug!("Step 3: Predicting risk...");
        let risk = RiskPredictor::new(models.risk_classifier.as_ref(), models.risk_labels.as_ref())
            .predict_risk(&row)?;

        tracing::debug!("Step 4: Routing department...");
        let routing = DepartmentRouter::new(
            models.department_classifier.as_ref(),
            models.department_labels.as_ref(),
        )
        .route(&record, &risk.label, &row)?;

        tracing::debug!("Step 5: Explaining prediction...");
        let top_contributors = ExplanationEngine::new(models.explainer.as_ref()).explain(&row)?;

        let priority_score = priority::priority_score(&risk.label, risk.confidence);

        tracing::debug!("Step 6: Summarizing EHR history...");
        let dataset = ehr.or(self.fallback_ehr.as_deref());
        let ehr_summary = ehr::summarize(record.patient_id, dataset);

        tracing::info!(
            "Triage complete: risk={}, confidence={:.1}%, priority={}, department={} ({:?})",
            risk.label,
            risk.confidence * 100.0,
            priority_score,
            routing.department,
            routing.source
        );

        Ok(PredictionResult {
            risk_level: risk.label,
            confidence: round_to(risk.confidence, 3),
            priority_score,
            recommended_department: routing.department,
            top_contributors,
            ehr_summary,
        })
    }
}

/// Round to `decimals` places, halves to even.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
