use std::sync::Arc;

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::features::SkippedOrder;
use crate::model::{to_priority, FeatureRow, Predictor};
use crate::schedule::{run_schedule, AssignmentReport};
use crate::store::DocumentStore;

/// Shared, read-only state handed to every handler. The predictor is loaded
/// once by the entry point before the server starts.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub predictor: Option<Arc<dyn Predictor>>,
    /// Fixed "today" for deterministic runs; the local date otherwise.
    pub today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, predictor: Option<Arc<dyn Predictor>>) -> Self {
        Self {
            store,
            predictor,
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Serialize)]
pub struct PredictResponse {
    priority: i64,
}

#[derive(Deserialize)]
pub struct ScheduleQuery {
    #[serde(default)]
    dry_run: bool,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    message: String,
    assignments: Vec<AssignmentReport>,
    skipped: Vec<SkippedOrder>,
}

const PREDICT_FIELDS: [&str; 3] = ["days_left", "quantity", "workforce"];

/// Pulls `days_left`, `quantity` and `workforce` out of a JSON body, in that
/// order.
pub fn parse_feature_row(body: &[u8]) -> Result<FeatureRow, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {e}")))?;
    let fields = value
        .as_object()
        .ok_or_else(|| ApiError::Validation("Request body must be a JSON object".to_string()))?;

    let mut row = [0.0; 3];
    for (slot, key) in row.iter_mut().zip(PREDICT_FIELDS) {
        let raw = fields
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ApiError::Validation(format!("Missing field '{key}'")))?;
        *slot = raw
            .as_f64()
            .ok_or_else(|| ApiError::Validation(format!("Field '{key}' must be a number")))?;
    }
    Ok(FeatureRow(row))
}

async fn home() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Job Scheduling API is running!" }))
}

// Single prediction
async fn predict(body: web::Bytes, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let row = parse_feature_row(&body)?;
    // Every failure past input parsing is reported as a 400, a missing model included.
    let predictor = state
        .predictor
        .as_ref()
        .ok_or_else(|| ApiError::Prediction("Model not loaded".to_string()))?;

    let prediction = predictor
        .predict(&[row])
        .map_err(|e| ApiError::Prediction(e.to_string()))?
        .first()
        .copied()
        .ok_or_else(|| ApiError::Prediction("model returned no prediction".to_string()))?;
    let priority = to_priority(prediction).map_err(|e| ApiError::Prediction(e.to_string()))?;

    Ok(HttpResponse::Ok().json(PredictResponse { priority }))
}

// Batch scheduling
async fn schedule_jobs(
    query: web::Query<ScheduleQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let persist = !query.dry_run;
    let report = run_schedule(
        state.store.as_ref(),
        state.predictor.as_deref(),
        state.today(),
        persist,
    )?;

    let message = if persist {
        "Jobs scheduled successfully"
    } else {
        "Dry run: assignments computed but not saved"
    };

    Ok(HttpResponse::Ok().json(ScheduleResponse {
        message: message.to_string(),
        assignments: report.assignments,
        skipped: report.skipped,
    }))
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Not found" }))
}

/// Registers all routes, the JSON 404 fallback and the query error handler.
/// Shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::Validation(err.to_string()).into());

    cfg.app_data(query_config)
        .route("/", web::get().to(home))
        .route("/predict", web::post().to(predict))
        .route("/schedule_jobs", web::get().to(schedule_jobs))
        .default_service(web::to(not_found));
}

pub async fn start_server(bind_address: &str, port: u16, state: AppState) -> std::io::Result<()> {
    if state.predictor.is_none() {
        warn!("serving without a model: /predict and /schedule_jobs will fail");
    }
    let app_state = web::Data::new(state);

    info!(%bind_address, port, "starting web server");
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((bind_address, port))?
    .run()
    .await
}
