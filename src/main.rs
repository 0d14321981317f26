mod analytics;
mod config;
mod crypto;
mod db;
mod domain;
mod services;
mod state;
mod web;

use crate::config::{AppConfig, PredictorKind};
use crate::services::predictor::{BurnoutPredictor, LinearModelPredictor, RuleBasedPredictor};
use crate::state::SharedState;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    let crypto = Arc::new(crypto::Crypto::from_base64_key(&config.enc_key)?);
    let predictor = build_predictor(&config)?;

    let shared: SharedState = Arc::new(state::AppState {
        pool,
        crypto,
        predictor,
        window_days: config.analysis_window_days,
    });

    let scheduler = JobScheduler::new().await?;
    let shared_for_sweep = shared.clone();
    scheduler
        .add(Job::new_async(config.sweep_cron.as_str(), move |_uuid, _l| {
            let state = shared_for_sweep.clone();
            Box::pin(async move {
                tracing::info!("Starting sustained burnout sweep...");
                if let Err(e) = services::wellbeing::sweep_sustained_burnout(&state).await {
                    tracing::error!("Burnout sweep failed: {}", e);
                }
            })
        })?)
        .await?;
    scheduler.start().await?;
    tracing::info!("Scheduler started: burnout sweep at '{}'", config.sweep_cron);

    let app = Router::new()
        .merge(web::routes(shared))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_predictor(config: &AppConfig) -> anyhow::Result<Arc<dyn BurnoutPredictor>> {
    let predictor: Arc<dyn BurnoutPredictor> = match config.predictor {
        PredictorKind::Rules => Arc::new(RuleBasedPredictor),
        PredictorKind::Model => {
            let model = LinearModelPredictor::load(&config.model_path).map_err(|e| {
                tracing::error!("Failed to load burnout model: {}", e);
                e
            })?;
            tracing::info!("Loaded burnout model from {}", config.model_path.display());
            Arc::new(model)
        }
    };
    tracing::info!("Burnout predictor: {}", predictor.name());
    Ok(predictor)
}
