//! HTTP handlers for the inference gateway.

use crate::models::{PredictionRequest, PredictionResponse};
use crate::services::metrics::{get_metrics, record_prediction};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use service_core::error::AppError;
use std::time::Instant;

/// Liveness probe. Does not contact the backend.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Forward instances to the backend and relay its predictions verbatim.
///
/// Malformed bodies are rejected with 422 before the backend is called.
/// Any backend failure becomes a 500 whose `detail` is the backend message.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed prediction request");
        AppError::from(rejection)
    })?;

    let endpoint = state.backend.endpoint();
    let instance_count = request.instances.len();
    let start = Instant::now();

    match state.backend.predict(&request.instances).await {
        Ok(predictions) => {
            let elapsed = start.elapsed().as_secs_f64();
            record_prediction(endpoint, "success", instance_count, elapsed);
            tracing::info!(
                endpoint = %endpoint,
                project_id = %state.config.vertex.project_id,
                instance_count,
                prediction_count = predictions.len(),
                duration_secs = elapsed,
                "Prediction succeeded"
            );

            Ok(Json(PredictionResponse { predictions }))
        }
        Err(e) => {
            let elapsed = start.elapsed().as_secs_f64();
            record_prediction(endpoint, e.kind(), instance_count, elapsed);
            tracing::error!(
                endpoint = %endpoint,
                project_id = %state.config.vertex.project_id,
                instance_count,
                error_kind = e.kind(),
                error = %e,
                "Prediction failed"
            );

            Err(e.into())
        }
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
