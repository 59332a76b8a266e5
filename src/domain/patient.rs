//! Patient input types and the feature normalizer.
//!
//! Raw input arrives as a loosely-typed JSON object: numbers may be strings,
//! lists may be comma-separated strings, and any key may be missing. All of
//! the leniency lives here; everything downstream sees a [`PatientRecord`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_PATIENT_ID: &str = "Patient_ID";
pub const FIELD_PATIENT_NAME: &str = "Patient_Name";
pub const FIELD_AGE: &str = "Age";
pub const FIELD_GENDER: &str = "Gender";
pub const FIELD_BLOOD_PRESSURE: &str = "Blood_Pressure";
pub const FIELD_HEART_RATE: &str = "Heart_Rate";
pub const FIELD_TEMPERATURE: &str = "Temperature";
pub const FIELD_SYMPTOMS: &str = "Symptoms";
pub const FIELD_CONDITIONS: &str = "Pre_Existing_Conditions";

/// Representative condition used for encoding when the patient reports none.
pub const NO_CONDITION: &str = "None";

/// Raw patient input as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientInput {
    fields: Map<String, Value>,
}

impl PatientInput {
    /// Wrap an arbitrary JSON value. Anything other than an object is
    /// treated as an input with no fields.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    /// Set a single field, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Convert into the canonical record. Never fails: malformed fields
    /// degrade to their defaults.
    #[must_use]
    pub fn normalize(&self) -> PatientRecord {
        PatientRecord {
            patient_id: lenient_f64(self.get(FIELD_PATIENT_ID)) as i64,
            patient_name: lenient_text(self.get(FIELD_PATIENT_NAME)),
            age: lenient_f64(self.get(FIELD_AGE)) as i64,
            gender: lenient_text(self.get(FIELD_GENDER)),
            blood_pressure: lenient_f64(self.get(FIELD_BLOOD_PRESSURE)),
            heart_rate: lenient_f64(self.get(FIELD_HEART_RATE)),
            temperature: lenient_f64(self.get(FIELD_TEMPERATURE)),
            symptoms: lenient_list(self.get(FIELD_SYMPTOMS)),
            conditions: lenient_list(self.get(FIELD_CONDITIONS)),
        }
    }
}

impl From<Map<String, Value>> for PatientInput {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Canonical, strictly-typed patient record.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: i64,
    pub patient_name: Option<String>,
    pub age: i64,
    pub gender: Option<String>,
    pub blood_pressure: f64,
    pub heart_rate: f64,
    pub temperature: f64,
    pub symptoms: Vec<String>,
    /// Full condition list; the encoder only sees [`Self::primary_condition`].
    pub conditions: Vec<String>,
}

impl PatientRecord {
    /// Single representative condition used for dummy encoding.
    #[must_use]
    pub fn primary_condition(&self) -> &str {
        self.conditions
            .first()
            .map(String::as_str)
            .unwrap_or(NO_CONDITION)
    }

    #[must_use]
    pub fn has_symptom(&self, symptom: &str) -> bool {
        self.symptoms.iter().any(|s| s == symptom)
    }

    #[must_use]
    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.iter().any(|c| c == condition)
    }
}

// Names must never reach log output through `{:?}`.
impl std::fmt::Debug for PatientRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientRecord")
            .field("patient_id", &self.patient_id)
            .field(
                "patient_name",
                &self.patient_name.as_ref().map(|_| "[REDACTED]"),
            )
            .field("age", &self.age)
            .field("gender", &self.gender)
            .field("blood_pressure", &self.blood_pressure)
            .field("heart_rate", &self.heart_rate)
            .field("temperature", &self.temperature)
            .field("symptoms", &self.symptoms)
            .field("conditions", &self.conditions)
            .finish()
    }
}

/// Parse a numeric-like value, substituting 0.0 for anything that is not a
/// finite number.
#[must_use]
pub fn lenient_f64(value: Option<&Value>) -> f64 {
    value.and_then(parse_f64).unwrap_or(0.0)
}

/// Parse a numeric-like value, or `None` if it is not a finite number.
#[must_use]
pub fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// List-or-comma-string normalization shared by symptoms and conditions.
fn lenient_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string().trim().to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> PatientInput {
        PatientInput::from_value(value)
    }

    #[test]
    fn test_symptom_list_and_string_normalize_identically() {
        let as_list = input(json!({ "Symptoms": [" Chest Pain", "Fever ", ""] })).normalize();
        let as_string = input(json!({ "Symptoms": "Chest Pain, Fever,," })).normalize();

        assert_eq!(as_list.symptoms, vec!["Chest Pain", "Fever"]);
        assert_eq!(as_list.symptoms, as_string.symptoms);
    }

    #[test]
    fn test_conditions_accept_all_three_shapes() {
        let list = input(json!({ "Pre_Existing_Conditions": ["Diabetes", "Asthma"] })).normalize();
        let text = input(json!({ "Pre_Existing_Conditions": "Diabetes,Asthma" })).normalize();
        let absent = input(json!({})).normalize();
        let wrong_type = input(json!({ "Pre_Existing_Conditions": 12 })).normalize();

        assert_eq!(list.conditions, text.conditions);
        assert!(absent.conditions.is_empty());
        assert!(wrong_type.conditions.is_empty());
    }

    #[test]
    fn test_primary_condition_collapses_to_first_or_none() {
        let with = input(json!({ "Pre_Existing_Conditions": "Hypertension, Diabetes" })).normalize();
        assert_eq!(with.primary_condition(), "Hypertension");
        assert!(with.has_condition("Diabetes"));

        let without = input(json!({ "Pre_Existing_Conditions": [] })).normalize();
        assert_eq!(without.primary_condition(), NO_CONDITION);
    }

    #[test]
    fn test_malformed_numbers_default_to_zero() {
        let record = input(json!({
            "Age": "forty",
            "Blood_Pressure": null,
            "Heart_Rate": [],
            "Temperature": "NaN"
        }))
        .normalize();

        assert_eq!(record.age, 0);
        assert_eq!(record.blood_pressure, 0.0);
        assert_eq!(record.heart_rate, 0.0);
        assert_eq!(record.temperature, 0.0);

        let omitted = input(json!({})).normalize();
        assert_eq!(omitted.age, 0);
        assert_eq!(omitted.patient_id, 0);
    }

    #[test]
    fn test_numeric_strings_parse_and_age_truncates() {
        let record = input(json!({
            "Patient_ID": "42.0",
            "Age": "67.9",
            "Heart_Rate": " 140 ",
            "Temperature": 101.3
        }))
        .normalize();

        assert_eq!(record.patient_id, 42);
        assert_eq!(record.age, 67);
        assert!((record.heart_rate - 140.0).abs() < f64::EPSILON);
        assert!((record.temperature - 101.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_object_input_is_empty() {
        let record = input(json!(["not", "an", "object"])).normalize();
        assert_eq!(record.patient_id, 0);
        assert!(record.gender.is_none());
        assert!(record.symptoms.is_empty());
    }

    #[test]
    fn test_debug_redacts_patient_name() {
        let record = input(json!({ "Patient_Name": "Jane Roe", "Gender": " Female " })).normalize();
        assert_eq!(record.gender.as_deref(), Some("Female"));

        let debug = format!("{record:?}");
        assert!(!debug.contains("Jane"));
        assert!(debug.contains("[REDACTED]"));
    }
}
