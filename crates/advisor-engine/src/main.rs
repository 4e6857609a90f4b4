//! Advisory engine - runs the periodic conflict detection cycle.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisor_core::risk::synthetic_training_set;
use advisor_engine::{run_detection_loop, EngineConfig, EngineState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("advisor_engine=debug".parse()?),
        )
        .init();

    tracing::info!("Starting advisory engine...");

    let config = EngineConfig::from_env();
    let state = Arc::new(EngineState::new(&config));

    // Bootstrap the risk model; detection runs on geometry alone if this fails.
    let dataset = synthetic_training_set(5000, &mut rand::rng());
    match state.train_risk_model(&dataset) {
        Ok(report) => tracing::info!(
            train_accuracy = report.train_accuracy,
            test_accuracy = report.test_accuracy,
            "risk model trained"
        ),
        Err(e) => tracing::warn!("risk model unavailable: {e}"),
    }

    tokio::spawn(run_detection_loop(state.clone(), config));

    loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        let status = state.scheduler_status();
        tracing::info!(
            flights = state.store.len(),
            conflicts = state.conflicts().len(),
            runways = status.total_runways,
            scheduled = status.total_scheduled_flights,
            "engine status"
        );
    }
}
