use serde::{Deserialize, Serialize};

use super::{FeatureRow, ModelError, Predictor, FEATURE_COUNT};

/// A tree node. Splits send a row left when `row[feature] <= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Flat node list; node 0 is the root and children always point forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Most common leaf value (classifier). Ties go to the smallest value.
    #[default]
    Vote,
    /// Mean of leaf values (regressor).
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionForest {
    #[serde(default)]
    pub aggregation: Aggregation,
    pub trees: Vec<Tree>,
}

impl Tree {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid("tree has no nodes".to_string()));
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    left,
                    right,
                    threshold,
                } => {
                    if feature >= FEATURE_COUNT {
                        return Err(ModelError::Invalid(format!(
                            "node {idx} splits on feature {feature}, expected < {FEATURE_COUNT}"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::Invalid(format!("node {idx} has a NaN threshold")));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= len {
                            return Err(ModelError::Invalid(format!(
                                "node {idx} points to child {child} outside {}..{len}",
                                idx + 1
                            )));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ModelError::Invalid(format!(
                            "leaf {idx} has a non-finite value"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walks from the root to a leaf. Assumes `validate` passed.
    pub fn predict_row(&self, row: &FeatureRow) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row.0[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

impl DecisionForest {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".to_string()));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| ModelError::Invalid(format!("tree {idx}: {e}")))?;
        }
        Ok(())
    }

    fn predict_row(&self, row: &FeatureRow) -> f64 {
        let leaves: Vec<f64> = self.trees.iter().map(|t| t.predict_row(row)).collect();
        match self.aggregation {
            Aggregation::Mean => leaves.iter().sum::<f64>() / leaves.len() as f64,
            Aggregation::Vote => majority(&leaves),
        }
    }
}

fn majority(values: &[f64]) -> f64 {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &v in values {
        match counts.iter_mut().find(|(seen, _)| *seen == v) {
            Some((_, n)) => *n += 1,
            None => counts.push((v, 1)),
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.total_cmp(&a.0)))
        .map(|(v, _)| v)
        .unwrap_or(0.0)
}

impl Predictor for DecisionForest {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        Ok(rows.iter().map(|row| self.predict_row(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// days_left <= 1 -> 3, days_left <= 3 -> 2, otherwise 1.
    fn urgency_tree() -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: 3.0 },
                Node::Split {
                    feature: 0,
                    threshold: 3.0,
                    left: 3,
                    right: 4,
                },
                Node::Leaf { value: 2.0 },
                Node::Leaf { value: 1.0 },
            ],
        }
    }

    fn constant(value: f64) -> Tree {
        Tree {
            nodes: vec![Node::Leaf { value }],
        }
    }

    #[test]
    fn single_tree_follows_thresholds() {
        let forest = DecisionForest {
            aggregation: Aggregation::Vote,
            trees: vec![urgency_tree()],
        };
        forest.validate().unwrap();
        let out = forest
            .predict(&[
                FeatureRow::new(1.0, 5.0, 2.0),
                FeatureRow::new(2.0, 5.0, 2.0),
                FeatureRow::new(9.0, 5.0, 2.0),
            ])
            .unwrap();
        assert_eq!(out, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn vote_picks_majority_and_breaks_ties_low() {
        let forest = DecisionForest {
            aggregation: Aggregation::Vote,
            trees: vec![constant(2.0), constant(3.0), constant(3.0)],
        };
        assert_eq!(forest.predict(&[FeatureRow::new(0.0, 0.0, 0.0)]).unwrap(), vec![3.0]);

        let tied = DecisionForest {
            aggregation: Aggregation::Vote,
            trees: vec![constant(3.0), constant(2.0)],
        };
        assert_eq!(tied.predict(&[FeatureRow::new(0.0, 0.0, 0.0)]).unwrap(), vec![2.0]);
    }

    #[test]
    fn mean_averages_leaves() {
        let forest = DecisionForest {
            aggregation: Aggregation::Mean,
            trees: vec![constant(1.0), constant(2.0)],
        };
        assert_eq!(forest.predict(&[FeatureRow::new(0.0, 0.0, 0.0)]).unwrap(), vec![1.5]);
    }

    #[test]
    fn backward_child_is_rejected() {
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 0,
                    right: 1,
                },
                Node::Leaf { value: 1.0 },
            ],
        };
        assert!(tree.validate().is_err());
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 3,
                    threshold: 1.0,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: 1.0 },
                Node::Leaf { value: 2.0 },
            ],
        };
        assert!(tree.validate().is_err());
    }

    #[test]
    fn empty_forest_is_rejected() {
        let forest = DecisionForest {
            aggregation: Aggregation::Mean,
            trees: vec![],
        };
        assert!(forest.validate().is_err());
    }
}
