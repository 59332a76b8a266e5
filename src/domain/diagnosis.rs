//! Triage result types.
//!
//! Represents the output of one pass through the inference pipeline.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::EhrSummary;

/// Risk labels the classifier is trained on.
///
/// The classifier's label vocabulary is authoritative; labels outside this
/// set still flow through the pipeline as plain strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Routine follow-up
    Low,
    /// Needs attention within the visit
    Medium,
    /// Urgent, eligible for the emergency safety override
    High,
}

impl RiskLevel {
    /// Match a decoded classifier label. Matching is exact.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department names produced by the rule-based router.
pub mod departments {
    pub const EMERGENCY: &str = "Emergency";
    pub const CARDIOLOGY: &str = "Cardiology";
    pub const PULMONOLOGY: &str = "Pulmonology";
    pub const NEUROLOGY: &str = "Neurology";
    pub const ENDOCRINOLOGY: &str = "Endocrinology";
    pub const GENERAL_MEDICINE: &str = "General Medicine";
}

/// A single feature's contribution to the risk prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Contributor {
    pub feature: String,
    pub importance: f64,
}

/// Ordered feature contributions, largest magnitude first.
///
/// Serializes as a JSON object whose key order is the ranking order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopContributors(pub Vec<Contributor>);

impl TopContributors {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contributor> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|c| c.feature == feature)
            .map(|c| c.importance)
    }
}

impl Serialize for TopContributors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for c in &self.0 {
            map.serialize_entry(&c.feature, &c.importance)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TopContributors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = TopContributors;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of feature name to importance")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((feature, importance)) = access.next_entry::<String, f64>()? {
                    out.push(Contributor {
                        feature,
                        importance,
                    });
                }
                Ok(TopContributors(out))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Complete triage outcome for one patient input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Decoded classifier label
    pub risk_level: String,

    /// Maximum class probability, rounded to 3 decimals
    pub confidence: f64,

    /// Urgency ranking in [0, 100]
    pub priority_score: u8,

    pub recommended_department: String,

    /// At most three features, descending by absolute importance
    pub top_contributors: TopContributors,

    pub ehr_summary: EhrSummary,
}
