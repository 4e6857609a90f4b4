//! Periodic conflict detection cycle.
//!
//! Each cycle takes an immutable snapshot of the flight store, runs the
//! pairwise detector over it and publishes a risk-ranked conflict list.
//! Cycles are pure reads over the snapshot, so a cycle in progress always
//! runs to completion; ticks that fall due while one runs are skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use advisor_core::models::FlightState;

use crate::config::EngineConfig;
use crate::state::{EngineState, RankedConflict};

/// Run one detection cycle over a store snapshot and publish the result.
///
/// Returns the number of conflicts published. Fewer than two flights yields
/// an empty list, not an error.
pub fn run_cycle(state: &EngineState) -> usize {
    let snapshot = state.store.snapshot();
    let records = state.detector.detect_all(&snapshot);

    let ranked: Vec<RankedConflict> = records
        .into_iter()
        .map(|record| {
            let risk = state
                .with_risk_model(|model| {
                    if model.is_trained() {
                        score_pair(model, &snapshot, &record.flight_a, &record.flight_b)
                    } else {
                        None
                    }
                })
                .flatten();
            RankedConflict { record, risk }
        })
        .collect();

    let count = ranked.len();
    if count > 0 {
        tracing::warn!(
            flights = snapshot.len(),
            conflicts = count,
            "detection cycle found separation violations"
        );
    } else {
        tracing::debug!(flights = snapshot.len(), "detection cycle clean");
    }
    state.publish_conflicts(ranked);
    count
}

fn score_pair(
    model: &advisor_core::risk::ConflictRiskModel,
    snapshot: &[FlightState],
    a: &str,
    b: &str,
) -> Option<advisor_core::risk::RiskAssessment> {
    let flight_a = snapshot.iter().find(|f| f.icao24 == a)?;
    let flight_b = snapshot.iter().find(|f| f.icao24 == b)?;
    Some(model.predict(flight_a, flight_b))
}

/// Start the periodic detection loop.
pub async fn run_detection_loop(state: Arc<EngineState>, config: EngineConfig) {
    let mut ticker = interval(Duration::from_secs(config.cycle_period_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        run_cycle(&state);
    }
}
