use serde::{Deserialize, Serialize};

use super::{FeatureRow, ModelError, Predictor, FEATURE_COUNT};

/// `weights · row + bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: [f64; FEATURE_COUNT],
    #[serde(default)]
    pub bias: f64,
}

impl LinearModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.weights.iter().chain(std::iter::once(&self.bias)).any(|w| !w.is_finite()) {
            return Err(ModelError::Invalid(
                "linear model coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn predict_row(&self, row: &FeatureRow) -> f64 {
        self.weights
            .iter()
            .zip(row.0.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias
    }
}

impl Predictor for LinearModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        Ok(rows.iter().map(|row| self.predict_row(row)).collect())
    }
}
