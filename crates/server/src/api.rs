use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use larder_core::errors::{ApplicationError, InterfaceError};
use serde::{Deserialize, Serialize};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::ServiceState;
use crate::health;

pub type SharedState = Arc<ServiceState>;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

/// `/ask` and `/health`, plus the single-page frontend when a static
/// directory is configured. Unknown paths fall back to its `index.html`.
pub fn router(state: SharedState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/ask", post(ask))
        .route("/health", get(health::health))
        .with_state(state);

    match static_dir {
        Some(dir) => {
            let assets = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            api.fallback_service(assets)
        }
        None => api,
    }
}

pub async fn ask(
    State(state): State<SharedState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| {
        let error = ApplicationError::InvalidRequest(rejection.body_text());
        error_response(error, &correlation_id)
    })?;
    info!(
        event_name = "http.ask.received",
        correlation_id = %correlation_id,
        question_chars = request.question.chars().count(),
        "question received"
    );

    let runtime = state.runtime().map_err(|error| error_response(error, &correlation_id))?;
    let answer = runtime
        .ask(&request.question, &correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;

    info!(
        event_name = "http.ask.answered",
        correlation_id = %correlation_id,
        outcome = answer.outcome.as_str(),
        "question answered"
    );
    Ok(Json(AskResponse { answer: answer.text }))
}

fn error_response(error: ApplicationError, correlation_id: &str) -> ApiError {
    let error = error.into_interface(correlation_id);
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!(
        event_name = "http.ask.failed",
        correlation_id = error.correlation_id(),
        status = status.as_u16(),
        error = %error,
        "question could not be answered"
    );
    (status, Json(ErrorDetail { detail: error.message().to_string() }))
}
