//! Pairwise conflict detection over predicted trajectories.
//!
//! The detector is purely geometric: it samples both aircraft's predicted
//! positions at matching time offsets and declares a conflict when the
//! horizontal and vertical separation minima are both violated at the same
//! offset. Sampling granularity is a deliberate approximation; the detector
//! never interpolates between samples.

use chrono::Utc;

use crate::models::{ConflictRecord, FlightState, Severity};
use crate::rules::DetectionRules;
use crate::spatial::haversine_nm;
use crate::trajectory;

/// Geometric conflict detector.
///
/// Stateless across cycles: each call operates only on the flight states
/// passed in.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    pub rules: DetectionRules,
}

impl ConflictDetector {
    pub fn new(rules: DetectionRules) -> Self {
        Self { rules }
    }

    /// Check one aircraft pair for a predicted separation violation.
    ///
    /// Returns `None` when no sampled offset violates both minima at once.
    /// Symmetric in its arguments up to the a/b labels.
    pub fn check(&self, a: &FlightState, b: &FlightState) -> Option<ConflictRecord> {
        let horizon = self.rules.horizon_minutes;
        let step = self.rules.sample_step_minutes;
        let path_a = trajectory::predict(a, horizon, step);
        let path_b = trajectory::predict(b, horizon, step);

        // Offset of minimum horizontal separation across the shared samples.
        let mut min_h = f64::INFINITY;
        let mut min_v = f64::INFINITY;
        let mut t_star = 0.0;
        for (pa, pb) in path_a.iter().zip(path_b.iter()) {
            let h = haversine_nm(pa.latitude, pa.longitude, pb.latitude, pb.longitude);
            if h < min_h {
                min_h = h;
                min_v = (pa.altitude_ft - pb.altitude_ft).abs();
                t_star = pa.offset_minutes;
            }
        }

        if min_h >= self.rules.horizontal_minimum_nm || min_v >= self.rules.vertical_minimum_ft {
            return None;
        }

        Some(ConflictRecord {
            flight_a: a.icao24.clone(),
            flight_b: b.icao24.clone(),
            severity: self.classify(t_star, min_h),
            time_to_conflict_min: t_star,
            min_horizontal_separation_nm: min_h,
            min_vertical_separation_ft: min_v,
            detected_at: Utc::now(),
        })
    }

    /// Severity policy: escalates with shorter time to conflict and tighter
    /// horizontal separation.
    fn classify(&self, t_star: f64, min_h: f64) -> Severity {
        if t_star <= 2.0 && min_h < 3.0 {
            Severity::Critical
        } else if t_star <= 5.0 && min_h < 4.0 {
            Severity::High
        } else if min_h < self.rules.horizontal_minimum_nm {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Evaluate all unordered pairs in a snapshot.
    ///
    /// The scan is capped at `max_pair_scan_count` flights to bound the
    /// quadratic cost. Results are ordered most urgent first: severity
    /// descending, then time to conflict ascending. Fewer than two flights
    /// yields an empty list.
    pub fn detect_all(&self, flights: &[FlightState]) -> Vec<ConflictRecord> {
        let scan = &flights[..flights.len().min(self.rules.max_pair_scan_count)];
        let mut conflicts = Vec::new();
        for i in 0..scan.len() {
            for j in (i + 1)..scan.len() {
                if let Some(conflict) = self.check(&scan[i], &scan[j]) {
                    conflicts.push(conflict);
                }
            }
        }

        conflicts.sort_by(|x, y| {
            y.severity.cmp(&x.severity).then(
                x.time_to_conflict_min
                    .partial_cmp(&y.time_to_conflict_min)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        conflicts
    }
}
