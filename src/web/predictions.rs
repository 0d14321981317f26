use crate::services::predictor::{BurnoutPrediction, PredictorInput};
use crate::state::SharedState;
use crate::web::{invalid, ApiError};
use axum::{extract::State, routing::post, Json, Router};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/burnout", post(predict_burnout))
        .with_state(state)
}

async fn predict_burnout(
    State(state): State<SharedState>,
    Json(input): Json<PredictorInput>,
) -> Result<Json<BurnoutPrediction>, ApiError> {
    input.validate().map_err(invalid)?;
    let prediction = state.predictor.predict(&input);
    tracing::debug!(
        "Burnout prediction via {}: probability {:.2}, at risk {}",
        prediction.predictor,
        prediction.probability,
        prediction.at_risk
    );
    Ok(Json(prediction))
}
