//! Explanation engine: Top contributing features for one prediction.
//!
//! Per-class attributions are collapsed to one magnitude per feature by
//! averaging absolute values across classes. That discards direction; a
//! single-output attribution keeps its sign. Ranking always uses absolute
//! value, and ties keep the schema order.

use crate::domain::{Contributor, EncodedFeatureVector, TopContributors};
use crate::ports::{Attribution, FeatureAttributor, ModelError};

/// Number of contributors reported per prediction.
pub const MAX_CONTRIBUTORS: usize = 3;

pub struct ExplanationEngine<'a> {
    attributor: &'a dyn FeatureAttributor,
}

impl<'a> ExplanationEngine<'a> {
    #[must_use]
    pub fn new(attributor: &'a dyn FeatureAttributor) -> Self {
        Self { attributor }
    }

    /// Explain the prediction for `row`, at full precision.
    ///
    /// # Errors
    /// Returns error if the attributor fails or returns a malformed result.
    pub fn explain(&self, row: &EncodedFeatureVector) -> Result<TopContributors, ModelError> {
        let attribution = self.attributor.attribute(row)?;
        let importances = collapse(&attribution, row.len())?;
        Ok(top_contributors(row.columns(), &importances, MAX_CONTRIBUTORS))
    }
}

/// Reduce an attribution to one value per feature.
///
/// # Errors
/// Returns `ModelError::Shape` if a slice has the wrong width and
/// `ModelError::InvalidOutput` for empty or non-finite attributions.
pub fn collapse(attribution: &Attribution, n_features: usize) -> Result<Vec<f64>, ModelError> {
    let check_width = |values: &[f64]| {
        if values.len() == n_features {
            Ok(())
        } else {
            Err(ModelError::Shape(format!(
                "Attribution has {} values, expected {n_features}",
                values.len()
            )))
        }
    };

    let collapsed = match attribution {
        Attribution::Single(values) => {
            check_width(values)?;
            values.clone()
        }
        Attribution::PerClass(slices) => {
            if slices.is_empty() {
                return Err(ModelError::InvalidOutput(
                    "Per-class attribution has no classes".into(),
                ));
            }
            let mut sums = vec![0.0; n_features];
            for slice in slices {
                check_width(slice)?;
                for (sum, value) in sums.iter_mut().zip(slice) {
                    *sum += value.abs();
                }
            }
            let n_classes = slices.len() as f64;
            sums.into_iter().map(|s| s / n_classes).collect()
        }
    };

    if collapsed.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidOutput(
            "Attribution contains non-finite values".into(),
        ));
    }
    Ok(collapsed)
}

/// Pick the `limit` features with the largest absolute importance.
#[must_use]
pub fn top_contributors(columns: &[String], importances: &[f64], limit: usize) -> TopContributors {
    let mut ranked: Vec<(&String, f64)> = columns.iter().zip(importances.iter().copied()).collect();
    // `sort_by` is stable, so equal magnitudes keep schema order.
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

    TopContributors(
        ranked
            .into_iter()
            .take(limit)
            .map(|(feature, importance)| Contributor {
                feature: feature.clone(),
                importance,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Attribution);

    impl FeatureAttributor for Fixed {
        fn attribute(&self, _row: &EncodedFeatureVector) -> Result<Attribution, ModelError> {
            Ok(self.0.clone())
        }
    }

    fn row(n: usize) -> EncodedFeatureVector {
        let columns = (0..n).map(|i| format!("f{i}")).collect();
        EncodedFeatureVector::new(columns, vec![0.0; n]).expect("valid row")
    }

    #[test]
    fn test_per_class_collapse_averages_absolute_values() {
        let attribution = Attribution::PerClass(vec![vec![0.2, -0.4, 0.0], vec![-0.6, 0.0, 0.1]]);
        let collapsed = collapse(&attribution, 3).expect("collapse");

        assert!((collapsed[0] - 0.4).abs() < 1e-12);
        assert!((collapsed[1] - 0.2).abs() < 1e-12);
        assert!((collapsed[2] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_single_output_keeps_sign_but_ranks_by_magnitude() {
        let engine_input = Fixed(Attribution::Single(vec![0.1, -0.9, 0.3, 0.05]));
        let engine = ExplanationEngine::new(&engine_input);

        let top = engine.explain(&row(4)).expect("explain");
        let ranked: Vec<(&str, f64)> = top.iter().map(|c| (c.feature.as_str(), c.importance)).collect();
        assert_eq!(ranked, vec![("f1", -0.9), ("f2", 0.3), ("f0", 0.1)]);
    }

    #[test]
    fn test_at_most_three_non_increasing() {
        let engine_input = Fixed(Attribution::PerClass(vec![
            vec![0.3, 0.1, 0.7, 0.2, 0.5],
            vec![0.1, 0.1, 0.1, 0.9, 0.5],
        ]));
        let top = ExplanationEngine::new(&engine_input)
            .explain(&row(5))
            .expect("explain");

        assert_eq!(top.len(), MAX_CONTRIBUTORS);
        let magnitudes: Vec<f64> = top.iter().map(|c| c.importance.abs()).collect();
        assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_ties_keep_schema_order() {
        let columns: Vec<String> = ["b", "a", "c", "d"].iter().map(|s| s.to_string()).collect();
        let top = top_contributors(&columns, &[0.5, 0.5, -0.5, 0.1], 3);
        let names: Vec<&str> = top.iter().map(|c| c.feature.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_fewer_features_than_limit() {
        let columns = vec!["only".to_string()];
        let top = top_contributors(&columns, &[0.0], MAX_CONTRIBUTORS);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_wrong_width_is_shape_error() {
        let err = collapse(&Attribution::PerClass(vec![vec![0.1, 0.2]]), 3).expect_err("must fail");
        assert!(matches!(err, ModelError::Shape(_)));

        let err = collapse(&Attribution::PerClass(vec![]), 3).expect_err("must fail");
        assert!(matches!(err, ModelError::InvalidOutput(_)));
    }
}
