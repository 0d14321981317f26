pub mod alerts;
pub mod checkins;
pub mod predictions;
pub mod users;

use crate::db;
use crate::domain::DomainError;
use crate::services::wellbeing::ServiceError;
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

/// Validation failures are 400; state conflicts (illegal transitions) are 409.
pub fn invalid(err: DomainError) -> ApiError {
    if err.is_conflict() {
        api_error(StatusCode::CONFLICT, "conflict", err.to_string())
    } else {
        api_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
    }
}

pub fn not_found(what: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

pub fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!("Request failed: {:#}", err);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

pub fn service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::UserNotFound => not_found("user"),
        ServiceError::InactiveUser => {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, "inactive_user", err.to_string())
        }
        ServiceError::Invalid(e) => invalid(e),
        ServiceError::Internal(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub days: Option<i64>,
}

impl WindowParams {
    /// Requested look-back, falling back to the configured default.
    pub fn resolve(&self, default_days: i64) -> Result<i64, ApiError> {
        let days = self.days.unwrap_or(default_days);
        if !(1..=MAX_WINDOW_DAYS).contains(&days) {
            return Err(invalid(DomainError::OutOfRange {
                field: "days",
                min: 1.0,
                max: MAX_WINDOW_DAYS as f64,
            }));
        }
        Ok(days)
    }
}

async fn health(State(state): State<SharedState>) -> (StatusCode, Json<serde_json::Value>) {
    match db::ping(&state.pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy" })),
            )
        }
    }
}

pub fn routes(state: SharedState) -> Router {
    let api = Router::new()
        .nest("/users", users::router(state.clone()))
        .nest("/checkins", checkins::router(state.clone()))
        .nest("/alerts", alerts::router(state.clone()))
        .nest("/predictions", predictions::router(state.clone()));

    Router::new()
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", api)
}
