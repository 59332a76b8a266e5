//! Feature encoder: Expands a canonical record into the classifier's schema.
//!
//! Encoding happens in two steps:
//! 1. Build a one-row table: scalar fields, one binary column per known
//!    symptom, and drop-first `<field>_<level>` indicator columns for
//!    `Gender` and the primary pre-existing condition.
//! 2. Reconcile that table against the classifier's declared columns:
//!    missing columns become 0.0, extra columns are dropped, and the result
//!    follows the declared order exactly.
//!
//! Step 2 runs on every call. It is what keeps serving working when the
//! symptom vocabulary or category levels drift away from training time.
//!
//! Categorical levels are taken from the table being encoded, not from the
//! training data. A one-row table has a single level per field and that level
//! is the dropped one, so no indicator survives and every trained
//! `Gender_*` / `Pre_Existing_Conditions_*` column is zero-filled.

use std::collections::HashMap;

use crate::domain::patient::{
    FIELD_AGE, FIELD_BLOOD_PRESSURE, FIELD_CONDITIONS, FIELD_GENDER, FIELD_HEART_RATE,
    FIELD_PATIENT_ID, FIELD_TEMPERATURE,
};
use crate::domain::{EncodedFeatureVector, PatientRecord};
use crate::ports::SymptomEncoder;

/// Encoder bound to one symptom vocabulary and one target schema.
pub struct FeatureEncoder<'a> {
    symptoms: &'a dyn SymptomEncoder,
    required_columns: &'a [String],
}

impl<'a> FeatureEncoder<'a> {
    #[must_use]
    pub fn new(symptoms: &'a dyn SymptomEncoder, required_columns: &'a [String]) -> Self {
        Self {
            symptoms,
            required_columns,
        }
    }

    /// Encode a record into exactly the required column set and order.
    #[must_use]
    pub fn encode(&self, record: &PatientRecord) -> EncodedFeatureVector {
        let table = self.build_table(record);
        reconcile(&table, self.required_columns)
    }

    /// Unreconciled one-row table, in construction order.
    fn build_table(&self, record: &PatientRecord) -> Vec<(String, f64)> {
        let mut table: Vec<(String, f64)> = vec![
            (FIELD_PATIENT_ID.to_string(), record.patient_id as f64),
            (FIELD_AGE.to_string(), record.age as f64),
            (FIELD_BLOOD_PRESSURE.to_string(), record.blood_pressure),
            (FIELD_HEART_RATE.to_string(), record.heart_rate),
            (FIELD_TEMPERATURE.to_string(), record.temperature),
        ];

        let vocabulary = self.symptoms.vocabulary();
        let encoded = self.symptoms.transform(&record.symptoms);
        table.extend(vocabulary.iter().cloned().zip(encoded));

        for unknown in record
            .symptoms
            .iter()
            .filter(|s| !vocabulary.iter().any(|known| known == *s))
        {
            tracing::debug!("Ignoring symptom outside the trained vocabulary: {unknown}");
        }

        let gender: Vec<&str> = record.gender.iter().map(String::as_str).collect();
        table.extend(drop_first_dummies(FIELD_GENDER, &gender));
        table.extend(drop_first_dummies(FIELD_CONDITIONS, &[record.primary_condition()]));

        table
    }
}

/// Name of the indicator column for one categorical level.
#[must_use]
pub fn dummy_column(field: &str, level: &str) -> String {
    format!("{field}_{level}")
}

/// Drop-first indicator columns for the first row of a categorical column.
///
/// Levels are the sorted distinct values of `column`; the lowest is dropped.
#[must_use]
pub fn drop_first_dummies(field: &str, column: &[&str]) -> Vec<(String, f64)> {
    let mut levels: Vec<&str> = column.to_vec();
    levels.sort_unstable();
    levels.dedup();

    let row = column.first().copied();
    levels
        .into_iter()
        .skip(1)
        .map(|level| {
            let hit = if row == Some(level) { 1.0 } else { 0.0 };
            (dummy_column(field, level), hit)
        })
        .collect()
}

/// Align a computed table to a declared schema.
///
/// When the table repeats a column name, the first occurrence wins.
#[must_use]
pub fn reconcile(table: &[(String, f64)], required_columns: &[String]) -> EncodedFeatureVector {
    let mut lookup: HashMap<&str, f64> = HashMap::with_capacity(table.len());
    for (name, value) in table {
        lookup.entry(name.as_str()).or_insert(*value);
    }

    let mut synthesized = 0usize;
    let values: Vec<f64> = required_columns
        .iter()
        .map(|column| {
            lookup.get(column.as_str()).copied().unwrap_or_else(|| {
                synthesized += 1;
                0.0
            })
        })
        .collect();

    let dropped = lookup
        .keys()
        .filter(|name| !required_columns.iter().any(|c| c.as_str() == **name))
        .count();
    tracing::debug!(
        "Reconciled features: {} required, {} zero-filled, {} dropped",
        required_columns.len(),
        synthesized,
        dropped
    );

    EncodedFeatureVector::from_aligned(required_columns.to_vec(), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PatientInput;
    use serde_json::json;

    struct Vocabulary(Vec<String>);

    impl SymptomEncoder for Vocabulary {
        fn vocabulary(&self) -> &[String] {
            &self.0
        }
    }

    fn vocabulary() -> Vocabulary {
        Vocabulary(vec![
            "Chest Pain".into(),
            "Fever".into(),
            "Shortness of Breath".into(),
        ])
    }

    fn schema() -> Vec<String> {
        [
            "Age",
            "Blood_Pressure",
            "Heart_Rate",
            "Temperature",
            "Chest Pain",
            "Fever",
            "Shortness of Breath",
            "Gender_Male",
            "Pre_Existing_Conditions_Diabetes",
            "Pre_Existing_Conditions_None",
            "Seizure",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn record(value: serde_json::Value) -> PatientRecord {
        PatientInput::from_value(value).normalize()
    }

    #[test]
    fn test_columns_match_schema_for_any_input() {
        let vocab = vocabulary();
        let schema = schema();
        let encoder = FeatureEncoder::new(&vocab, &schema);

        let inputs = [
            json!({}),
            json!({ "Symptoms": "Fever, Hiccups", "Gender": "Female" }),
            json!({ "Symptoms": ["Chest Pain"], "Gender": "Male", "Pre_Existing_Conditions": "Diabetes" }),
            json!({ "Extra_Field": 10, "Age": "n/a" }),
        ];

        for input in inputs {
            let encoded = encoder.encode(&record(input));
            assert_eq!(encoded.columns(), schema.as_slice());
            assert_eq!(encoded.len(), schema.len());
        }
    }

    #[test]
    fn test_encodes_scalars_and_symptoms() {
        let vocab = vocabulary();
        let schema = schema();
        let encoder = FeatureEncoder::new(&vocab, &schema);

        let encoded = encoder.encode(&record(json!({
            "Age": 58,
            "Heart_Rate": "112",
            "Symptoms": ["Chest Pain", "Shortness of Breath"],
            "Gender": "Male",
            "Pre_Existing_Conditions": ["Diabetes", "Asthma"]
        })));

        assert_eq!(encoded.get("Age"), Some(58.0));
        assert_eq!(encoded.get("Heart_Rate"), Some(112.0));
        assert_eq!(encoded.get("Chest Pain"), Some(1.0));
        assert_eq!(encoded.get("Fever"), Some(0.0));
        assert_eq!(encoded.get("Shortness of Breath"), Some(1.0));
    }

    #[test]
    fn test_single_row_categoricals_are_zero_filled() {
        let vocab = vocabulary();
        let schema = schema();
        let encoder = FeatureEncoder::new(&vocab, &schema);

        // One row means one level per field, and drop-first removes it.
        let encoded = encoder.encode(&record(json!({
            "Age": 3,
            "Gender": "Male",
            "Pre_Existing_Conditions": ["Diabetes", "Asthma"]
        })));
        assert_eq!(encoded.get("Age"), Some(3.0));
        assert_eq!(encoded.get("Gender_Male"), Some(0.0));
        assert_eq!(encoded.get("Pre_Existing_Conditions_Diabetes"), Some(0.0));
        assert_eq!(encoded.get("Pre_Existing_Conditions_None"), Some(0.0));
    }

    #[test]
    fn test_drop_first_dummies_uses_sorted_levels() {
        assert!(drop_first_dummies("Gender", &["Male"]).is_empty());
        assert!(drop_first_dummies("Gender", &[]).is_empty());

        let columns = drop_first_dummies("Gender", &["Male", "Female", "Male"]);
        assert_eq!(columns, vec![("Gender_Male".to_string(), 1.0)]);

        let columns = drop_first_dummies("Gender", &["Female", "Male", "Other"]);
        assert_eq!(
            columns,
            vec![("Gender_Male".to_string(), 0.0), ("Gender_Other".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_baseline_level_and_unknown_columns_fall_away() {
        let vocab = vocabulary();
        let schema = schema();
        let encoder = FeatureEncoder::new(&vocab, &schema);

        let encoded = encoder.encode(&record(json!({ "Gender": "Female" })));
        assert_eq!(encoded.get("Gender_Male"), Some(0.0));
        assert_eq!(encoded.get("Gender_Female"), None);
        assert_eq!(encoded.get("Patient_ID"), None);
        assert_eq!(encoded.get("Pre_Existing_Conditions_None"), Some(0.0));
    }

    #[test]
    fn test_required_column_missing_from_vocabulary_is_zero() {
        let vocab = vocabulary();
        let schema = schema();
        let encoder = FeatureEncoder::new(&vocab, &schema);

        // "Seizure" is declared by the classifier but not in the symptom vocabulary.
        let encoded = encoder.encode(&record(json!({ "Symptoms": ["Seizure"] })));
        assert_eq!(encoded.get("Seizure"), Some(0.0));
    }

    #[test]
    fn test_reconcile_orders_and_keeps_first_duplicate() {
        let table = vec![
            ("b".to_string(), 2.0),
            ("a".to_string(), 1.0),
            ("b".to_string(), 9.0),
            ("z".to_string(), 5.0),
        ];
        let required = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let encoded = reconcile(&table, &required);
        assert_eq!(encoded.values(), &[1.0, 2.0, 0.0]);
        assert_eq!(encoded.columns(), required.as_slice());
    }
}
