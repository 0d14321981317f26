use crate::crypto::Crypto;
use crate::services::predictor::BurnoutPredictor;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub crypto: Arc<Crypto>,
    pub predictor: Arc<dyn BurnoutPredictor>,
    /// Default look-back for listings and analysis when a request omits `days`.
    pub window_days: i64,
}

pub type SharedState = Arc<AppState>;
