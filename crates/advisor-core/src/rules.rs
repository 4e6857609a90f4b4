//! Separation minima and scheduling thresholds.
//!
//! Defaults follow conventional en-route separation minima; they are policy
//! knobs, not fixed law, and the engine overrides them from the environment.

use serde::{Deserialize, Serialize};

/// Configuration for the conflict detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRules {
    /// Minimum horizontal separation in nautical miles
    pub horizontal_minimum_nm: f64,
    /// Minimum vertical separation in feet
    pub vertical_minimum_ft: f64,
    /// Lookahead window for conflict prediction in minutes
    pub horizon_minutes: f64,
    /// Trajectory sample spacing in minutes
    pub sample_step_minutes: f64,
    /// Cap on flights considered per pairwise scan (bounds the O(n^2) cost)
    pub max_pair_scan_count: usize,
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            horizontal_minimum_nm: 5.0,
            vertical_minimum_ft: 1000.0,
            horizon_minutes: 10.0,
            sample_step_minutes: 1.0,
            max_pair_scan_count: 20,
        }
    }
}

/// Configuration for the runway scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingRules {
    /// Fuel percentage below which a request bypasses normal priority
    pub fuel_critical_threshold_percent: f64,
    /// Largest delay a request will be assigned before rejection, in minutes
    pub max_allowed_delay_minutes: f64,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            fuel_critical_threshold_percent: 10.0,
            max_allowed_delay_minutes: 60.0,
        }
    }
}
