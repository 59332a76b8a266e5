//! Model-ready feature vector.

use serde::{Deserialize, Serialize};

/// One encoded row whose columns match a classifier's declared schema.
///
/// Produced by the feature encoder; the predictors index into `values`
/// positionally, so `columns` and `values` always have equal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedFeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl EncodedFeatureVector {
    /// Build a vector from parallel column/value lists.
    ///
    /// # Errors
    /// Returns an error if the two lists differ in length.
    pub fn new(columns: Vec<String>, values: Vec<f64>) -> Result<Self, String> {
        if columns.len() != values.len() {
            return Err(format!(
                "Column count {} does not match value count {}",
                columns.len(),
                values.len()
            ));
        }
        Ok(Self { columns, values })
    }

    /// Build from lists already known to be parallel.
    pub(crate) fn from_aligned(columns: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}
