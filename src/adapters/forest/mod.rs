//! Forest adapter: A frozen decision-tree ensemble loaded from JSON.
//!
//! Implements both `Classifier` and `FeatureAttributor`, so the same artifact
//! answers "what class" and "why".
//!
//! # Artifact format
//!
//! ```json
//! {
//!   "feature_names": ["Age", "Heart_Rate"],
//!   "n_classes": 2,
//!   "trees": [
//!     { "nodes": [
//!       { "feature": 1, "threshold": 120.0, "left": 1, "right": 2, "value": [0.5, 0.5] },
//!       { "value": [0.9, 0.1] },
//!       { "value": [0.2, 0.8] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Node 0 is the root. A row goes left when `x[feature] <= threshold`. Every
//! node carries its class distribution; raw counts are normalized at load.
//!
//! # Attribution
//!
//! Tree path attribution: walking from root to leaf, each split credits the
//! change in class distribution to its feature. Averaged over trees, the
//! root distribution plus all credits equals `predict_proba` exactly.

use std::path::Path;

use serde::Deserialize;

use crate::domain::EncodedFeatureVector;
use crate::ports::{Attribution, Classifier, FeatureAttributor, ModelError};

/// Errors raised while loading a forest artifact.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    #[error("Failed to read forest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid forest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid forest: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct ForestArtifact {
    feature_names: Vec<String>,
    n_classes: usize,
    trees: Vec<TreeArtifact>,
}

#[derive(Debug, Deserialize)]
struct TreeArtifact {
    nodes: Vec<NodeArtifact>,
}

#[derive(Debug, Deserialize)]
struct NodeArtifact {
    #[serde(default)]
    feature: Option<usize>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    left: Option<usize>,
    #[serde(default)]
    right: Option<usize>,
    value: Vec<f64>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        value: Vec<f64>,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl Node {
    fn value(&self) -> &[f64] {
        match self {
            Node::Split { value, .. } | Node::Leaf { value } => value,
        }
    }
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Walk root to leaf, calling `on_split(feature, parent, child)` per edge.
    fn walk<F>(&self, x: &[f64], mut on_split: F) -> &Node
    where
        F: FnMut(usize, &Node, &Node),
    {
        let mut node = &self.nodes[0];
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = node
        {
            let next = if x[*feature] <= *threshold {
                &self.nodes[*left]
            } else {
                &self.nodes[*right]
            };
            on_split(*feature, node, next);
            node = next;
        }
        node
    }
}

/// A validated, immutable tree ensemble.
#[derive(Debug, Clone)]
pub struct DecisionForest {
    feature_names: Vec<String>,
    n_classes: usize,
    trees: Vec<Tree>,
}

impl DecisionForest {
    /// Load and validate a forest from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file is unreadable or the forest is malformed.
    pub fn load(path: &Path) -> Result<Self, ForestError> {
        let content = std::fs::read_to_string(path)?;
        let forest = Self::from_json(&content)?;
        tracing::info!(
            "Loaded forest from {:?} (n_trees={}, n_features={}, n_classes={})",
            path,
            forest.trees.len(),
            forest.feature_names.len(),
            forest.n_classes
        );
        Ok(forest)
    }

    /// Parse and validate a forest from JSON text.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ForestError> {
        let artifact: ForestArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ForestArtifact) -> Result<Self, ForestError> {
        let n_features = artifact.feature_names.len();
        let n_classes = artifact.n_classes;
        if n_features == 0 {
            return Err(ForestError::Invalid("forest declares no features".into()));
        }
        if n_classes == 0 {
            return Err(ForestError::Invalid("forest declares no classes".into()));
        }
        if artifact.trees.is_empty() {
            return Err(ForestError::Invalid("forest has no trees".into()));
        }

        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(t, tree)| validate_tree(t, tree, n_features, n_classes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            feature_names: artifact.feature_names,
            n_classes,
            trees,
        })
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn check_row<'r>(&self, row: &'r EncodedFeatureVector) -> Result<&'r [f64], ModelError> {
        if row.columns() != self.feature_names.as_slice() {
            return Err(ModelError::Shape(format!(
                "Row has {} columns, forest expects {} in schema order",
                row.len(),
                self.feature_names.len()
            )));
        }
        if let Some(bad) = row.values().iter().position(|v| !v.is_finite()) {
            return Err(ModelError::InvalidOutput(format!(
                "Non-finite input in column {}",
                self.feature_names[bad]
            )));
        }
        Ok(row.values())
    }
}

fn validate_tree(
    t: usize,
    tree: TreeArtifact,
    n_features: usize,
    n_classes: usize,
) -> Result<Tree, ForestError> {
    let n_nodes = tree.nodes.len();
    if n_nodes == 0 {
        return Err(ForestError::Invalid(format!("tree {t} has no nodes")));
    }

    let nodes = tree
        .nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| {
            let invalid = |reason: String| ForestError::Invalid(format!("tree {t} node {i}: {reason}"));
            let value = normalize_distribution(node.value, n_classes).map_err(invalid)?;

            match (node.feature, node.threshold, node.left, node.right) {
                (None, None, None, None) => Ok(Node::Leaf { value }),
                (Some(feature), Some(threshold), Some(left), Some(right)) => {
                    if feature >= n_features {
                        return Err(invalid(format!(
                            "feature index {feature} out of range (n_features={n_features})"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid("threshold is not finite".into()));
                    }
                    // Children must point forward, which rules out cycles.
                    for child in [left, right] {
                        if child <= i || child >= n_nodes {
                            return Err(invalid(format!("child index {child} does not point forward")));
                        }
                    }
                    Ok(Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                        value,
                    })
                }
                _ => Err(invalid(
                    "split nodes need feature, threshold, left and right".into(),
                )),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Tree { nodes })
}

fn normalize_distribution(value: Vec<f64>, n_classes: usize) -> Result<Vec<f64>, String> {
    if value.len() != n_classes {
        return Err(format!(
            "value has {} entries, expected {n_classes}",
            value.len()
        ));
    }
    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err("value entries must be finite and non-negative".into());
    }
    let total: f64 = value.iter().sum();
    if total <= 0.0 {
        return Err("value entries sum to zero".into());
    }
    Ok(value.into_iter().map(|v| v / total).collect())
}

impl Classifier for DecisionForest {
    fn required_columns(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, row: &EncodedFeatureVector) -> Result<usize, ModelError> {
        let proba = self.predict_proba(row)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(best)
    }

    fn predict_proba(&self, row: &EncodedFeatureVector) -> Result<Vec<f64>, ModelError> {
        let x = self.check_row(row)?;
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.walk(x, |_, _, _| {});
            for (p, v) in proba.iter_mut().zip(leaf.value()) {
                *p += v;
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(proba.into_iter().map(|p| p / n_trees).collect())
    }
}

impl FeatureAttributor for DecisionForest {
    fn attribute(&self, row: &EncodedFeatureVector) -> Result<Attribution, ModelError> {
        let x = self.check_row(row)?;
        let n_features = self.feature_names.len();
        let mut contributions = vec![vec![0.0; n_features]; self.n_classes];

        for tree in &self.trees {
            tree.walk(x, |feature, parent, child| {
                for (class, per_feature) in contributions.iter_mut().enumerate() {
                    per_feature[feature] += child.value()[class] - parent.value()[class];
                }
            });
        }

        let n_trees = self.trees.len() as f64;
        for per_feature in &mut contributions {
            for c in per_feature.iter_mut() {
                *c /= n_trees;
            }
        }
        Ok(Attribution::PerClass(contributions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STUMPS: &str = r#"{
        "feature_names": ["Age", "Heart_Rate"],
        "n_classes": 2,
        "trees": [
            { "nodes": [
                { "feature": 0, "threshold": 0.5, "left": 1, "right": 2, "value": [5, 5] },
                { "value": [0.9, 0.1] },
                { "value": [0.2, 0.8] }
            ] },
            { "nodes": [
                { "feature": 1, "threshold": 10.0, "left": 1, "right": 2, "value": [0.6, 0.4] },
                { "value": [1.0, 0.0] },
                { "value": [0.2, 0.8] }
            ] }
        ]
    }"#;

    fn row(values: Vec<f64>) -> EncodedFeatureVector {
        EncodedFeatureVector::new(vec!["Age".into(), "Heart_Rate".into()], values)
            .expect("valid row")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_predict_proba_averages_leaves() {
        let forest = DecisionForest::from_json(TWO_STUMPS).expect("forest");
        let proba = forest.predict_proba(&row(vec![1.0, 5.0])).expect("proba");

        assert!(close(proba[0], 0.6));
        assert!(close(proba[1], 0.4));
        assert_eq!(forest.predict(&row(vec![1.0, 5.0])).expect("predict"), 0);
        assert_eq!(forest.predict(&row(vec![1.0, 50.0])).expect("predict"), 1);
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let forest = DecisionForest::from_json(TWO_STUMPS).expect("forest");
        let proba = forest.predict_proba(&row(vec![0.5, 10.0])).expect("proba");
        // Both trees go left: [0.9, 0.1] and [1.0, 0.0].
        assert!(close(proba[0], 0.95));
    }

    #[test]
    fn test_path_attribution_sums_to_prediction() {
        let forest = DecisionForest::from_json(TWO_STUMPS).expect("forest");
        let x = row(vec![1.0, 5.0]);

        let Attribution::PerClass(per_class) = forest.attribute(&x).expect("attribution") else {
            panic!("expected per-class attribution");
        };
        assert_eq!(per_class.len(), 2);
        assert!(close(per_class[0][0], -0.15));
        assert!(close(per_class[0][1], 0.2));
        assert!(close(per_class[1][0], 0.15));
        assert!(close(per_class[1][1], -0.2));

        let bias = [0.55, 0.45];
        let proba = forest.predict_proba(&x).expect("proba");
        for class in 0..2 {
            let total: f64 = bias[class] + per_class[class].iter().sum::<f64>();
            assert!(close(total, proba[class]));
        }
    }

    #[test]
    fn test_rejects_wrong_columns() {
        let forest = DecisionForest::from_json(TWO_STUMPS).expect("forest");
        let swapped = EncodedFeatureVector::new(vec!["Heart_Rate".into(), "Age".into()], vec![0.0, 0.0])
            .expect("valid row");

        assert!(matches!(forest.predict_proba(&swapped), Err(ModelError::Shape(_))));
        assert!(matches!(forest.attribute(&swapped), Err(ModelError::Shape(_))));
    }

    #[test]
    fn test_rejects_malformed_artifacts() {
        let cases = [
            r#"{ "feature_names": [], "n_classes": 2, "trees": [] }"#,
            r#"{ "feature_names": ["a"], "n_classes": 2, "trees": [] }"#,
            // child points backwards
            r#"{ "feature_names": ["a"], "n_classes": 1, "trees": [{ "nodes": [
                { "feature": 0, "threshold": 1.0, "left": 0, "right": 1, "value": [1] },
                { "value": [1] } ] }] }"#,
            // feature out of range
            r#"{ "feature_names": ["a"], "n_classes": 1, "trees": [{ "nodes": [
                { "feature": 3, "threshold": 1.0, "left": 1, "right": 2, "value": [1] },
                { "value": [1] }, { "value": [1] } ] }] }"#,
            // wrong value width
            r#"{ "feature_names": ["a"], "n_classes": 2, "trees": [{ "nodes": [ { "value": [1] } ] }] }"#,
            // half-specified split
            r#"{ "feature_names": ["a"], "n_classes": 1, "trees": [{ "nodes": [
                { "feature": 0, "value": [1] } ] }] }"#,
        ];

        for json in cases {
            let err = DecisionForest::from_json(json).expect_err("must reject");
            assert!(matches!(err, ForestError::Invalid(_)), "unexpected error for {json}: {err}");
        }
    }

    #[test]
    fn test_single_leaf_tree_has_zero_attribution() {
        let forest = DecisionForest::from_json(
            r#"{ "feature_names": ["a", "b"], "n_classes": 2, "trees": [{ "nodes": [ { "value": [3, 1] } ] }] }"#,
        )
        .expect("forest");
        let x = EncodedFeatureVector::new(vec!["a".into(), "b".into()], vec![1.0, 2.0]).expect("row");

        let proba = forest.predict_proba(&x).expect("proba");
        assert!(close(proba[0], 0.75));
        assert_eq!(
            forest.attribute(&x).expect("attribution"),
            Attribution::PerClass(vec![vec![0.0, 0.0], vec![0.0, 0.0]])
        );
    }
}
