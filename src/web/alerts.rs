use crate::db::{self, AlertFilter};
use crate::domain::alert::{Alert, AlertStatus, Severity};
use crate::services::wellbeing::CheckInSource;
use crate::state::SharedState;
use crate::web::{internal, invalid, not_found, ApiError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(fetch))
        .route("/:id/status", patch(change_status))
        .route("/:id/escalate", post(escalate))
        .with_state(state)
}

#[derive(Serialize)]
struct AlertView {
    #[serde(flatten)]
    alert: Alert,
    is_critical: bool,
    is_pending: bool,
    is_resolved: bool,
    is_recent: bool,
    open_minutes: i64,
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        let now = Utc::now();
        Self {
            is_critical: alert.is_critical(),
            is_pending: alert.is_pending(),
            is_resolved: alert.is_resolved(),
            is_recent: alert.is_recent(now),
            open_minutes: alert.open_duration(now).num_minutes(),
            alert,
        }
    }
}

#[derive(Deserialize)]
struct AlertQuery {
    user_id: Option<Uuid>,
    status: Option<String>,
    #[serde(default)]
    pending_only: bool,
}

#[derive(Deserialize)]
struct CreateAlertPayload {
    user_id: Uuid,
    kind: String,
    severity: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct StatusPayload {
    status: String,
    action_taken: Option<String>,
}

async fn list(
    State(state): State<SharedState>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<AlertView>>, ApiError> {
    let status = if query.pending_only {
        Some(AlertStatus::Pending)
    } else {
        query
            .status
            .as_deref()
            .map(AlertStatus::try_from)
            .transpose()
            .map_err(invalid)?
    };
    let filter = AlertFilter {
        user_id: query.user_id,
        status,
    };

    let alerts = db::list_alerts(&state.pool, &filter)
        .await
        .map_err(internal)?;
    Ok(Json(alerts.into_iter().map(AlertView::from).collect()))
}

async fn create(
    State(state): State<SharedState>,
    Json(payload): Json<CreateAlertPayload>,
) -> Result<(StatusCode, Json<AlertView>), ApiError> {
    let severity = Severity::try_from(payload.severity.as_str()).map_err(invalid)?;
    let alert = Alert::new(
        payload.user_id,
        &payload.kind,
        severity,
        payload.description,
        Utc::now(),
    )
    .map_err(invalid)?;

    state
        .find_user(payload.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("user"))?;

    db::insert_alert(&state.pool, &alert)
        .await
        .map_err(internal)?;
    tracing::info!(
        "Alert {} ({}, {}) opened for user {}",
        alert.id,
        alert.kind,
        alert.severity.as_str(),
        alert.user_id
    );
    Ok((StatusCode::CREATED, Json(alert.into())))
}

async fn load(state: &SharedState, id: Uuid) -> Result<Alert, ApiError> {
    db::find_alert(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("alert"))
}

async fn fetch(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertView>, ApiError> {
    Ok(Json(load(&state, id).await?.into()))
}

async fn change_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<AlertView>, ApiError> {
    let status = AlertStatus::try_from(payload.status.as_str()).map_err(invalid)?;
    let current = load(&state, id).await?;
    let next = current
        .with_status(status, payload.action_taken, Utc::now())
        .map_err(invalid)?;

    db::update_alert(&state.pool, &next)
        .await
        .map_err(internal)?;
    tracing::info!(
        "Alert {} moved from {} to {}",
        id,
        current.status.as_str(),
        next.status.as_str()
    );
    Ok(Json(next.into()))
}

async fn escalate(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertView>, ApiError> {
    let current = load(&state, id).await?;
    let next = current.escalated().map_err(invalid)?;
    if next.severity != current.severity {
        db::update_alert(&state.pool, &next)
            .await
            .map_err(internal)?;
        tracing::info!(
            "Alert {} escalated from {} to {}",
            id,
            current.severity.as_str(),
            next.severity.as_str()
        );
    }
    Ok(Json(next.into()))
}
