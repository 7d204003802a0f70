//! Model Provider: a trained predictor mapping feature rows to priorities.
//!
//! The model is decoded once at startup from a base64 artifact and then shared
//! read-only between request handlers behind an `Arc<dyn Predictor>`.

pub mod artifact;
pub mod forest;
pub mod linear;

use thiserror::Error;

pub use artifact::{decode_artifact, encode_artifact, load_model, ModelSpec};
pub use forest::{Aggregation, DecisionForest, Node, Tree};
pub use linear::LinearModel;

/// Number of positional features the model consumes.
pub const FEATURE_COUNT: usize = 3;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("no model found at {collection}/{document}")]
    NotFound { collection: String, document: String },

    #[error("model document {document} has no field {field:?}")]
    MissingField { document: String, field: String },

    #[error("model artifact is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("model artifact is not a valid model spec: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("document store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

/// One model input: `[days_left, quantity, workforce]`, in that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow(pub [f64; FEATURE_COUNT]);

impl FeatureRow {
    pub fn new(days_left: f64, quantity: f64, workforce: f64) -> Self {
        Self([days_left, quantity, workforce])
    }

    pub fn days_left(&self) -> f64 {
        self.0[0]
    }

    pub fn quantity(&self) -> f64 {
        self.0[1]
    }

    pub fn workforce(&self) -> f64 {
        self.0[2]
    }
}

/// A trained model. `predict` is a batch call: one invocation per request or
/// scheduling run, returning one value per input row in the same order.
pub trait Predictor: Send + Sync {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError>;
}

/// Casts a raw model output to the integer priority label, truncating toward
/// zero. NaN, infinities and values outside the `i64` range are rejected.
pub fn to_priority(value: f64) -> Result<i64, ModelError> {
    let truncated = value.trunc();
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive.
    if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(ModelError::Invalid(format!(
            "model returned {value}, which is not a valid priority"
        )));
    }
    Ok(truncated as i64)
}
