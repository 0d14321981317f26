use crate::analytics::report::AnalysisReport;
use crate::db;
use crate::domain::alert::Alert;
use crate::domain::checkin::{CheckIn, ConcernArea, HealthStatus, NewCheckIn};
use crate::services::wellbeing::{analyze_user, record_checkin, CheckInSource};
use crate::state::SharedState;
use crate::web::{api_error, internal, invalid, not_found, service_error, ApiError, WindowParams};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(create))
        .route("/user/:user_id", get(list_for_user))
        .route("/user/:user_id/analysis", get(analysis))
        .route("/:id/notes", patch(update_notes))
        .with_state(state)
}

/// A check-in with everything derived from it.
#[derive(Serialize)]
struct CheckInView {
    #[serde(flatten)]
    checkin: CheckIn,
    wellbeing_index: f64,
    health_status: HealthStatus,
    burnout_risk: bool,
    area_of_concern: ConcernArea,
    recommendation: &'static str,
}

impl From<CheckIn> for CheckInView {
    fn from(checkin: CheckIn) -> Self {
        Self {
            wellbeing_index: checkin.wellbeing_index(),
            health_status: checkin.health_status(),
            burnout_risk: checkin.indicates_burnout(),
            area_of_concern: checkin.area_of_concern(),
            recommendation: checkin.recommendation(),
            checkin,
        }
    }
}

#[derive(Serialize)]
struct CreatedCheckIn {
    #[serde(flatten)]
    view: CheckInView,
    alert: Option<Alert>,
}

#[derive(Deserialize)]
struct CreateCheckInPayload {
    user_id: Uuid,
    #[serde(flatten)]
    checkin: NewCheckIn,
}

#[derive(Deserialize)]
struct NotesPayload {
    notes: Option<String>,
}

async fn create(
    State(state): State<SharedState>,
    Json(payload): Json<CreateCheckInPayload>,
) -> Result<(StatusCode, Json<CreatedCheckIn>), ApiError> {
    let (checkin, alert) = record_checkin(&state, payload.user_id, payload.checkin)
        .await
        .map_err(service_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedCheckIn {
            view: checkin.into(),
            alert,
        }),
    ))
}

async fn list_for_user(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Vec<CheckInView>>, ApiError> {
    let days = params.resolve(state.window_days)?;
    state
        .find_user(user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("user"))?;

    let checkins = state
        .checkins_within(user_id, days)
        .await
        .map_err(internal)?;
    Ok(Json(checkins.into_iter().map(CheckInView::from).collect()))
}

async fn analysis(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<WindowParams>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let days = params.resolve(state.window_days)?;
    let report = analyze_user(state.as_ref(), user_id, days)
        .await
        .map_err(internal)?;

    report.map(Json).ok_or_else(|| no_data(days))
}

/// Unknown, inactive and silent users all end up here.
fn no_data(days: i64) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "no_data",
        format!("user not found or without check-ins in the last {days} days"),
    )
}

async fn update_notes(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NotesPayload>,
) -> Result<Json<CheckInView>, ApiError> {
    let checkin = db::find_checkin(&state.pool, &state.crypto, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("check-in"))?
        .with_notes(payload.notes)
        .map_err(invalid)?;

    db::update_checkin_notes(&state.pool, &state.crypto, &checkin)
        .await
        .map_err(internal)?;
    Ok(Json(checkin.into()))
}
