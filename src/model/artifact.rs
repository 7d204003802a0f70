use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{DecisionForest, FeatureRow, LinearModel, ModelError, Predictor};
use crate::store::DocumentStore;

/// Serialized form of a trained model. The artifact stored in the document
/// store is this JSON, base64-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    DecisionForest(DecisionForest),
    Linear(LinearModel),
}

impl ModelSpec {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            ModelSpec::DecisionForest(forest) => forest.validate(),
            ModelSpec::Linear(linear) => linear.validate(),
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let spec: ModelSpec = serde_json::from_slice(bytes)?;
        spec.validate()?;
        Ok(spec)
    }

    fn kind(&self) -> &'static str {
        match self {
            ModelSpec::DecisionForest(_) => "decision_forest",
            ModelSpec::Linear(_) => "linear",
        }
    }
}

impl Predictor for ModelSpec {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        match self {
            ModelSpec::DecisionForest(forest) => forest.predict(rows),
            ModelSpec::Linear(linear) => linear.predict(rows),
        }
    }
}

/// Decodes and validates a base64 model artifact.
pub fn decode_artifact(encoded: &str) -> Result<ModelSpec, ModelError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    ModelSpec::from_json(&bytes)
}

pub fn encode_artifact(spec: &ModelSpec) -> Result<String, ModelError> {
    let json = serde_json::to_vec(spec)?;
    Ok(STANDARD.encode(json))
}

/// Fetches the model artifact from `collection/document`, field `field`, and
/// decodes it into a shareable predictor.
#[instrument(skip(store))]
pub fn load_model(
    store: &dyn DocumentStore,
    collection: &str,
    document: &str,
    field: &str,
) -> Result<Arc<dyn Predictor>, ModelError> {
    let doc = store
        .get_document(collection, document)?
        .ok_or_else(|| ModelError::NotFound {
            collection: collection.to_string(),
            document: document.to_string(),
        })?;

    let encoded = doc
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ModelError::MissingField {
            document: document.to_string(),
            field: field.to_string(),
        })?;

    let spec = decode_artifact(encoded)?;
    info!(kind = spec.kind(), "model loaded");
    Ok(Arc::new(spec))
}
