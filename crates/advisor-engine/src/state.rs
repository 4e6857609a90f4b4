//! Shared engine state.

use std::sync::{Mutex, RwLock};

use advisor_core::conflict::ConflictDetector;
use advisor_core::models::{ConflictRecord, ScheduleRequest, ScheduleResult};
use advisor_core::risk::{ConflictRiskModel, RiskAssessment, RiskModelError, TrainingReport};
use advisor_core::scheduler::{RunwayScheduler, SchedulerError, SchedulerStatus};

use crate::config::EngineConfig;
use crate::store::FlightStore;

/// A geometric conflict with an optional advisory risk score attached.
///
/// The score orders alerts for display; it never removes a record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RankedConflict {
    pub record: ConflictRecord,
    pub risk: Option<RiskAssessment>,
}

/// Thread-safe state shared between the feed, the detection cycle and the
/// scheduling callers.
pub struct EngineState {
    pub store: FlightStore,
    pub detector: ConflictDetector,
    conflicts: RwLock<Vec<RankedConflict>>,
    // Read-decide-commit must be one critical section; a plain mutex around
    // the scheduler gives every call the whole runway set atomically.
    scheduler: Mutex<RunwayScheduler>,
    risk_model: RwLock<ConflictRiskModel>,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            store: FlightStore::new(),
            detector: ConflictDetector::new(config.detection.clone()),
            conflicts: RwLock::new(Vec::new()),
            scheduler: Mutex::new(RunwayScheduler::new(config.scheduling.clone())),
            risk_model: RwLock::new(ConflictRiskModel::new()),
        }
    }

    /// Latest published conflict list, most urgent first.
    pub fn conflicts(&self) -> Vec<RankedConflict> {
        self.conflicts
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn publish_conflicts(&self, conflicts: Vec<RankedConflict>) {
        if let Ok(mut guard) = self.conflicts.write() {
            *guard = conflicts;
        }
    }

    /// Train the risk model in place. A failed training run leaves the
    /// previous fit (or the untrained default) untouched; detection keeps
    /// running on geometry alone.
    pub fn train_risk_model(
        &self,
        dataset: &[advisor_core::risk::LabeledEncounter],
    ) -> Result<TrainingReport, RiskModelError> {
        let mut guard = self
            .risk_model
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.train(dataset)
    }

    pub(crate) fn with_risk_model<T>(&self, f: impl FnOnce(&ConflictRiskModel) -> T) -> Option<T> {
        self.risk_model.read().ok().map(|guard| f(&guard))
    }

    pub fn add_runway(&self, id: &str, capacity_ops_per_hour: u32) -> Result<(), SchedulerError> {
        self.with_scheduler(|s| s.add_runway(id, capacity_ops_per_hour))
    }

    pub fn schedule(&self, request: &ScheduleRequest) -> ScheduleResult {
        self.with_scheduler(|s| s.schedule(request))
    }

    pub fn schedule_batch(&self, requests: &[ScheduleRequest]) -> Vec<ScheduleResult> {
        self.with_scheduler(|s| s.schedule_batch(requests))
    }

    pub fn cancel(&self, flight_id: &str) -> Result<(), SchedulerError> {
        self.with_scheduler(|s| s.cancel(flight_id))
    }

    pub fn complete(&self, flight_id: &str) -> Result<(), SchedulerError> {
        self.with_scheduler(|s| s.complete(flight_id))
    }

    pub fn scheduler_status(&self) -> SchedulerStatus {
        self.with_scheduler(|s| s.status())
    }

    fn with_scheduler<T>(&self, f: impl FnOnce(&mut RunwayScheduler) -> T) -> T {
        let mut guard = self
            .scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}
