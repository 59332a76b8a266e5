//! Department router: Merges the learned department model with rule-based routing.
//!
//! Precedence, highest first:
//! 1. Safety override: High risk with critical vitals always goes to Emergency.
//! 2. Learned model: the department classifier's label, when non-empty.
//! 3. Rule-based fallback over symptoms and conditions.
//!
//! Each tier is its own function so the precedence can be tested in isolation.

use serde::{Deserialize, Serialize};

use crate::application::predictor::decode_prediction;
use crate::domain::{departments, EncodedFeatureVector, PatientRecord, RiskLevel};
use crate::ports::{Classifier, LabelDecoder, ModelError};

/// Heart rate above which a High-risk patient is an emergency (bpm).
pub const CRITICAL_HEART_RATE: f64 = 130.0;

/// Temperature above which a High-risk patient is an emergency (°F).
pub const CRITICAL_TEMPERATURE: f64 = 103.0;

/// Which tier produced the final department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingSource {
    SafetyOverride,
    LearnedModel,
    RuleBased,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub department: String,
    pub source: RoutingSource,
}

#[must_use]
pub fn has_critical_vitals(record: &PatientRecord) -> bool {
    record.heart_rate > CRITICAL_HEART_RATE || record.temperature > CRITICAL_TEMPERATURE
}

fn is_high_risk(risk_label: &str) -> bool {
    RiskLevel::from_label(risk_label) == Some(RiskLevel::High)
}

/// Tier 1: force Emergency for High risk with critical vitals.
#[must_use]
pub fn safety_override(record: &PatientRecord, risk_label: &str) -> Option<&'static str> {
    (is_high_risk(risk_label) && has_critical_vitals(record)).then_some(departments::EMERGENCY)
}

/// Tier 2: accept the learned label unless it is blank.
///
/// Blank is wider than empty: a whitespace-only label also falls through to
/// the rules, since no department is named by it.
#[must_use]
pub fn learned_department(label: &str) -> Option<&str> {
    (!label.trim().is_empty()).then_some(label)
}

/// Tier 3: fixed-order rules over vitals, symptoms and conditions.
#[must_use]
pub fn rule_based_department(record: &PatientRecord, risk_label: &str) -> &'static str {
    if is_high_risk(risk_label) && has_critical_vitals(record) {
        departments::EMERGENCY
    } else if record.has_symptom("Chest Pain") {
        departments::CARDIOLOGY
    } else if record.has_symptom("Shortness of Breath") {
        departments::PULMONOLOGY
    } else if record.has_symptom("Seizure") {
        departments::NEUROLOGY
    } else if record.has_condition("Diabetes") {
        departments::ENDOCRINOLOGY
    } else {
        departments::GENERAL_MEDICINE
    }
}

/// Apply the three tiers in precedence order.
#[must_use]
pub fn resolve_department(
    record: &PatientRecord,
    risk_label: &str,
    learned_label: Option<&str>,
) -> RoutingDecision {
    if let Some(department) = safety_override(record, risk_label) {
        return RoutingDecision {
            department: department.to_string(),
            source: RoutingSource::SafetyOverride,
        };
    }

    if let Some(department) = learned_label.and_then(learned_department) {
        return RoutingDecision {
            department: department.to_string(),
            source: RoutingSource::LearnedModel,
        };
    }

    tracing::warn!("Department model gave no label, using rule-based routing");
    RoutingDecision {
        department: rule_based_department(record, risk_label).to_string(),
        source: RoutingSource::RuleBased,
    }
}

/// Department classifier paired with its label decoder.
pub struct DepartmentRouter<'a> {
    classifier: &'a dyn Classifier,
    decoder: &'a dyn LabelDecoder,
}

impl<'a> DepartmentRouter<'a> {
    #[must_use]
    pub fn new(classifier: &'a dyn Classifier, decoder: &'a dyn LabelDecoder) -> Self {
        Self {
            classifier,
            decoder,
        }
    }

    /// Route a patient using the learned model on `row` plus the rule tiers.
    ///
    /// # Errors
    /// Returns error if the department classifier rejects the row.
    pub fn route(
        &self,
        record: &PatientRecord,
        risk_label: &str,
        row: &EncodedFeatureVector,
    ) -> Result<RoutingDecision, ModelError> {
        let learned = decode_prediction(self.classifier, self.decoder, row)?;
        let decision = resolve_department(record, risk_label, Some(&learned));
        tracing::debug!(
            "Routed to {} via {:?} (learned model said {:?})",
            decision.department,
            decision.source,
            learned
        );
        Ok(decision)
    }
}
