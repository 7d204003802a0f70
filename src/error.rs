use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::model::ModelError;
use crate::schedule::ScheduleError;
use crate::store::StoreError;

/// Errors surfaced by the HTTP layer. Every variant renders as
/// `{"error": "<message>"}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// Nothing to work on: no orders, no valid orders, no employees.
    #[error("{0}")]
    NoData(String),

    #[error("Model not loaded")]
    ModelUnavailable,

    /// Prediction failed while serving `/predict`.
    #[error("{0}")]
    Prediction(String),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::NoData(_) | ApiError::Prediction(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ModelUnavailable | ApiError::Model(_) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::ModelUnavailable => ApiError::ModelUnavailable,
            ScheduleError::NoOrders
            | ScheduleError::NoValidOrders { .. }
            | ScheduleError::NoEmployees => ApiError::NoData(err.to_string()),
            ScheduleError::Model(e) => ApiError::Model(e),
            ScheduleError::Store(e) => ApiError::Store(e),
        }
    }
}
