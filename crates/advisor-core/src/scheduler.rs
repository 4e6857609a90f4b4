//! Runway slot allocation.
//!
//! Each runway owns an ordered schedule of committed operations; the
//! scheduler is the sole mutator. A `schedule` call is one critical section
//! over the whole runway set: feasibility is evaluated against the current
//! schedules and the winning slot is committed before the call returns, so
//! no two accepted requests can ever hold overlapping slots.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Priority, RunwayOperation, ScheduleRequest, ScheduleResult};
use crate::rules::SchedulingRules;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("runway {0} is already registered")]
    DuplicateRunway(String),
    #[error("runway capacity must be positive, got {0}")]
    InvalidCapacity(u32),
    #[error("flight {0} is not known to the scheduler")]
    UnknownFlight(String),
    #[error("flight {flight_id} cannot move from {from} to {to}")]
    IllegalTransition {
        flight_id: String,
        from: &'static str,
        to: &'static str,
    },
}

/// Lifecycle of a scheduled flight.
///
/// `Requested -> Assigned -> Completed`, with `Requested -> Rejected` when
/// no feasible slot exists and `Assigned -> Cancelled` on explicit
/// cancellation. Nothing else is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum SlotState {
    Requested,
    Assigned {
        runway_id: String,
        scheduled_time: DateTime<Utc>,
    },
    Completed,
    Rejected,
    Cancelled,
}

impl SlotState {
    fn name(&self) -> &'static str {
        match self {
            SlotState::Requested => "requested",
            SlotState::Assigned { .. } => "assigned",
            SlotState::Completed => "completed",
            SlotState::Rejected => "rejected",
            SlotState::Cancelled => "cancelled",
        }
    }
}

/// A registered runway and its committed schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runway {
    pub id: String,
    pub capacity_ops_per_hour: u32,
    /// Ordered by `scheduled_time`; slots never overlap within the runway's
    /// minimum spacing.
    pub schedule: Vec<RunwayOperation>,
}

impl Runway {
    fn min_spacing(&self) -> Duration {
        let minutes = 60.0 / f64::from(self.capacity_ops_per_hour);
        Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }

    /// Earliest time at or after `preferred` clear of every committed
    /// operation by the runway's minimum spacing, before and after. Gaps
    /// between existing operations are usable when wide enough.
    fn earliest_feasible(&self, preferred: DateTime<Utc>) -> DateTime<Utc> {
        let spacing = self.min_spacing();
        let mut candidate = preferred;
        // Schedule is sorted, so one forward pass settles the candidate.
        for op in &self.schedule {
            let gap = candidate - op.scheduled_time;
            if gap.abs() < spacing {
                candidate = op.scheduled_time + spacing;
            }
        }
        candidate
    }

    fn commit(&mut self, op: RunwayOperation) {
        let idx = self
            .schedule
            .partition_point(|existing| existing.scheduled_time <= op.scheduled_time);
        self.schedule.insert(idx, op);
    }
}

/// Utilization snapshot for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub total_runways: usize,
    pub total_scheduled_flights: usize,
    /// Committed operations divided by hourly capacity, per runway
    pub per_runway_utilization: HashMap<String, f64>,
}

/// Allocates runway time slots under spacing, priority and fuel constraints.
#[derive(Debug, Clone, Default)]
pub struct RunwayScheduler {
    pub rules: SchedulingRules,
    runways: BTreeMap<String, Runway>,
    flights: HashMap<String, SlotState>,
}

impl RunwayScheduler {
    pub fn new(rules: SchedulingRules) -> Self {
        Self {
            rules,
            runways: BTreeMap::new(),
            flights: HashMap::new(),
        }
    }

    /// Register a runway. Duplicate ids and zero capacity are rejected.
    pub fn add_runway(
        &mut self,
        id: impl Into<String>,
        capacity_ops_per_hour: u32,
    ) -> Result<(), SchedulerError> {
        let id = id.into();
        if capacity_ops_per_hour == 0 {
            return Err(SchedulerError::InvalidCapacity(capacity_ops_per_hour));
        }
        if self.runways.contains_key(&id) {
            return Err(SchedulerError::DuplicateRunway(id));
        }
        self.runways.insert(
            id.clone(),
            Runway {
                id,
                capacity_ops_per_hour,
                schedule: Vec::new(),
            },
        );
        Ok(())
    }

    /// Current state of a flight, if the scheduler has seen it.
    pub fn slot_state(&self, flight_id: &str) -> Option<&SlotState> {
        self.flights.get(flight_id)
    }

    /// Whether a request bypasses normal priority ordering.
    pub fn is_emergency(&self, request: &ScheduleRequest) -> bool {
        request.priority == Priority::Emergency
            || request.fuel_level_percent < self.rules.fuel_critical_threshold_percent
    }

    /// Find and commit a slot for one request.
    ///
    /// The feasibility scan and the commit happen under one `&mut self`
    /// borrow, so concurrent callers serialized by the owner observe a
    /// totally ordered sequence of schedule mutations.
    pub fn schedule(&mut self, request: &ScheduleRequest) -> ScheduleResult {
        if let Some(state @ SlotState::Assigned { .. }) = self.flights.get(&request.flight_id) {
            return ScheduleResult::rejected(format!(
                "flight {} is already {}; cancel before rescheduling",
                request.flight_id,
                state.name()
            ));
        }
        if self.runways.is_empty() {
            return ScheduleResult::rejected("no runways registered");
        }
        self.flights
            .insert(request.flight_id.clone(), SlotState::Requested);

        // Candidate slot per runway: globally earliest feasible time, which
        // for a fixed preferred_time is also the minimum delay. Ties go to
        // the runway with the lightest committed load. Emergency and
        // fuel-critical requests win by being evaluated ahead of pending
        // normal traffic (see schedule_batch), not by a different search.
        let best = self
            .runways
            .values()
            .map(|runway| {
                let time = runway.earliest_feasible(request.preferred_time);
                (time, runway.schedule.len(), runway.id.clone())
            })
            .min_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let Some((scheduled_time, _, runway_id)) = best else {
            return ScheduleResult::rejected("no runways registered");
        };

        let delay = scheduled_time - request.preferred_time;
        let delay_minutes = delay.num_milliseconds() as f64 / 60_000.0;
        if delay_minutes > self.rules.max_allowed_delay_minutes {
            self.flights
                .insert(request.flight_id.clone(), SlotState::Rejected);
            return ScheduleResult::rejected(format!(
                "no feasible slot within {:.0} minutes of preferred time (best delay {:.1} min)",
                self.rules.max_allowed_delay_minutes, delay_minutes
            ));
        }

        let runway = self
            .runways
            .get_mut(&runway_id)
            .expect("candidate runway came from the registry");
        runway.commit(RunwayOperation {
            flight_id: request.flight_id.clone(),
            scheduled_time,
            flight_type: request.flight_type,
        });
        self.flights.insert(
            request.flight_id.clone(),
            SlotState::Assigned {
                runway_id: runway_id.clone(),
                scheduled_time,
            },
        );

        ScheduleResult::assigned(runway_id, scheduled_time, delay_minutes)
    }

    /// Schedule a batch, evaluating emergency and fuel-critical requests
    /// ahead of everything else regardless of submission order. Results are
    /// returned in the original request order.
    pub fn schedule_batch(&mut self, requests: &[ScheduleRequest]) -> Vec<ScheduleResult> {
        let mut order: Vec<usize> = (0..requests.len()).collect();
        order.sort_by_key(|&i| !self.is_emergency(&requests[i]));

        let mut results: Vec<(usize, ScheduleResult)> = order
            .into_iter()
            .map(|i| (i, self.schedule(&requests[i])))
            .collect();
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Cancel an assigned flight, freeing its slot.
    pub fn cancel(&mut self, flight_id: &str) -> Result<(), SchedulerError> {
        match self.flights.get(flight_id) {
            None => Err(SchedulerError::UnknownFlight(flight_id.to_string())),
            Some(SlotState::Assigned { runway_id, .. }) => {
                let runway_id = runway_id.clone();
                if let Some(runway) = self.runways.get_mut(&runway_id) {
                    runway.schedule.retain(|op| op.flight_id != flight_id);
                }
                self.flights
                    .insert(flight_id.to_string(), SlotState::Cancelled);
                Ok(())
            }
            Some(state) => Err(SchedulerError::IllegalTransition {
                flight_id: flight_id.to_string(),
                from: state.name(),
                to: "cancelled",
            }),
        }
    }

    /// Mark an assigned flight's operation as flown.
    pub fn complete(&mut self, flight_id: &str) -> Result<(), SchedulerError> {
        match self.flights.get(flight_id) {
            None => Err(SchedulerError::UnknownFlight(flight_id.to_string())),
            Some(SlotState::Assigned { runway_id, .. }) => {
                let runway_id = runway_id.clone();
                if let Some(runway) = self.runways.get_mut(&runway_id) {
                    runway.schedule.retain(|op| op.flight_id != flight_id);
                }
                self.flights
                    .insert(flight_id.to_string(), SlotState::Completed);
                Ok(())
            }
            Some(state) => Err(SchedulerError::IllegalTransition {
                flight_id: flight_id.to_string(),
                from: state.name(),
                to: "completed",
            }),
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        let total_scheduled_flights = self
            .flights
            .values()
            .filter(|s| matches!(s, SlotState::Assigned { .. }))
            .count();
        let per_runway_utilization = self
            .runways
            .values()
            .map(|r| {
                (
                    r.id.clone(),
                    r.schedule.len() as f64 / f64::from(r.capacity_ops_per_hour),
                )
            })
            .collect();
        SchedulerStatus {
            total_runways: self.runways.len(),
            total_scheduled_flights,
            per_runway_utilization,
        }
    }

    /// Read-only view of a runway's committed schedule.
    pub fn runway_schedule(&self, runway_id: &str) -> Option<&[RunwayOperation]> {
        self.runways.get(runway_id).map(|r| r.schedule.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlightType;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn request(flight_id: &str, preferred: DateTime<Utc>) -> ScheduleRequest {
        ScheduleRequest {
            flight_id: flight_id.to_string(),
            flight_type: FlightType::Arrival,
            preferred_time: preferred,
            priority: Priority::Normal,
            fuel_level_percent: 75.0,
        }
    }

    #[test]
    fn duplicate_runway_is_rejected() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        assert!(matches!(
            scheduler.add_runway("RW01", 25),
            Err(SchedulerError::DuplicateRunway(_))
        ));
        assert!(matches!(
            scheduler.add_runway("RW02", 0),
            Err(SchedulerError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn consecutive_operations_respect_spacing() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        let preferred = base_time();

        for i in 0..5 {
            let result = scheduler.schedule(&request(&format!("FL{i:03}"), preferred));
            assert!(result.success, "{:?}", result.error);
        }

        let schedule = scheduler.runway_schedule("RW01").unwrap();
        assert_eq!(schedule.len(), 5);
        for pair in schedule.windows(2) {
            let gap = pair[1].scheduled_time - pair[0].scheduled_time;
            assert!(gap >= Duration::minutes(2), "gap {gap}");
            assert_ne!(pair[0].scheduled_time, pair[1].scheduled_time);
        }
    }

    #[test]
    fn spreads_load_across_runways_on_delay_ties() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        scheduler.add_runway("RW02", 30).unwrap();
        let preferred = base_time();

        let first = scheduler.schedule(&request("FL001", preferred));
        let second = scheduler.schedule(&request("FL002", preferred));
        assert!(first.success && second.success);
        // Second flight gets the empty runway at zero delay instead of a
        // spaced slot on the first one.
        assert_ne!(first.runway_id, second.runway_id);
        assert_eq!(second.delay_minutes, Some(0.0));
    }

    #[test]
    fn excessive_delay_rejects_request() {
        let rules = SchedulingRules {
            max_allowed_delay_minutes: 5.0,
            ..SchedulingRules::default()
        };
        let mut scheduler = RunwayScheduler::new(rules);
        // One op every 30 minutes: a second request at the same preferred
        // time would be delayed past the 5-minute cap.
        scheduler.add_runway("RW01", 2).unwrap();
        let preferred = base_time();

        assert!(scheduler.schedule(&request("FL001", preferred)).success);
        let result = scheduler.schedule(&request("FL002", preferred));
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("no feasible slot"));
        assert_eq!(
            scheduler.slot_state("FL002"),
            Some(&SlotState::Rejected)
        );
        assert_eq!(scheduler.runway_schedule("RW01").unwrap().len(), 1);
    }

    #[test]
    fn emergency_is_not_delayed_behind_normal_traffic() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        let preferred = base_time();

        // Emergency submitted last in a pending set of normal requests for
        // the same preferred time: it must never fare worse than any of them.
        let mut requests: Vec<ScheduleRequest> =
            (0..4).map(|i| request(&format!("FL{i:03}"), preferred)).collect();
        let mut emergency = request("MAYDAY1", preferred);
        emergency.priority = Priority::Emergency;
        requests.push(emergency);

        let results = scheduler.schedule_batch(&requests);
        assert!(results.iter().all(|r| r.success));
        let emergency_delay = results[4].delay_minutes.unwrap();
        for result in &results[..4] {
            assert!(emergency_delay <= result.delay_minutes.unwrap());
        }
        assert_eq!(emergency_delay, 0.0);
    }

    #[test]
    fn fuel_critical_counts_as_emergency() {
        let scheduler = RunwayScheduler::default();
        let mut low_fuel = request("LOWFUEL1", base_time());
        low_fuel.fuel_level_percent = 6.0;
        assert!(scheduler.is_emergency(&low_fuel));
        assert!(!scheduler.is_emergency(&request("FL001", base_time())));
    }

    #[test]
    fn batch_evaluates_emergencies_first() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        let preferred = base_time();

        let mut emergency = request("MAYDAY1", preferred);
        emergency.priority = Priority::Emergency;
        let requests = vec![
            request("FL001", preferred),
            request("FL002", preferred),
            emergency,
        ];

        let results = scheduler.schedule_batch(&requests);
        assert!(results.iter().all(|r| r.success));
        // The emergency was committed first, so it holds the zero-delay slot.
        assert_eq!(results[2].delay_minutes, Some(0.0));
        assert!(results[0].delay_minutes.unwrap() > 0.0);
        assert!(results[1].delay_minutes.unwrap() > 0.0);
    }

    #[test]
    fn rescheduling_assigned_flight_is_rejected_without_mutation() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        let preferred = base_time();

        let first = scheduler.schedule(&request("FL001", preferred));
        assert!(first.success);
        let before = scheduler.runway_schedule("RW01").unwrap().to_vec();

        let second = scheduler.schedule(&request("FL001", preferred));
        assert!(!second.success);
        assert!(second.error.as_deref().unwrap().contains("already"));

        let after = scheduler.runway_schedule("RW01").unwrap();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].scheduled_time, after[0].scheduled_time);
    }

    #[test]
    fn cancellation_frees_the_slot() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        let preferred = base_time();

        assert!(scheduler.schedule(&request("FL001", preferred)).success);
        scheduler.cancel("FL001").unwrap();
        assert_eq!(scheduler.slot_state("FL001"), Some(&SlotState::Cancelled));
        assert!(scheduler.runway_schedule("RW01").unwrap().is_empty());

        // Slot is reusable and the flight may be scheduled again.
        let again = scheduler.schedule(&request("FL001", preferred));
        assert!(again.success);
        assert_eq!(again.delay_minutes, Some(0.0));
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        assert!(matches!(
            scheduler.cancel("GHOST1"),
            Err(SchedulerError::UnknownFlight(_))
        ));

        assert!(scheduler.schedule(&request("FL001", base_time())).success);
        scheduler.complete("FL001").unwrap();
        assert!(matches!(
            scheduler.cancel("FL001"),
            Err(SchedulerError::IllegalTransition { .. })
        ));
        assert!(matches!(
            scheduler.complete("FL001"),
            Err(SchedulerError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn status_reports_utilization() {
        let mut scheduler = RunwayScheduler::default();
        scheduler.add_runway("RW01", 30).unwrap();
        scheduler.add_runway("RW02", 20).unwrap();
        let preferred = base_time();
        for i in 0..3 {
            assert!(scheduler.schedule(&request(&format!("FL{i:03}"), preferred)).success);
        }

        let status = scheduler.status();
        assert_eq!(status.total_runways, 2);
        assert_eq!(status.total_scheduled_flights, 3);
        let total_ops: f64 = status
            .per_runway_utilization
            .iter()
            .map(|(id, util)| match id.as_str() {
                "RW01" => util * 30.0,
                _ => util * 20.0,
            })
            .sum();
        assert!((total_ops - 3.0).abs() < 1e-9);
    }
}
