pub mod conflict;
pub mod models;
pub mod risk;
pub mod rules;
pub mod scheduler;
pub mod spatial;
pub mod trajectory;

pub use conflict::ConflictDetector;
pub use models::{
    ConflictRecord, FlightState, FlightType, PositionSource, Priority, RawFlightRecord,
    RunwayOperation, ScheduleRequest, ScheduleResult, Severity, TrajectoryPoint,
};
pub use risk::{
    synthetic_training_set, ConflictRiskModel, EncounterFeatures, LabeledEncounter,
    RiskAssessment, RiskModelError, TrainingReport,
};
pub use rules::{DetectionRules, SchedulingRules};
pub use scheduler::{RunwayScheduler, SchedulerError, SchedulerStatus, SlotState};
pub use spatial::haversine_nm;
