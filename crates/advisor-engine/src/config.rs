//! Engine configuration from environment.

use std::env;

use advisor_core::rules::{DetectionRules, SchedulingRules};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seconds between detection cycles
    pub cycle_period_secs: u64,
    pub detection: DetectionRules,
    pub scheduling: SchedulingRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_period_secs: 5,
            detection: DetectionRules::default(),
            scheduling: SchedulingRules::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cycle_period_secs: parse_env("ADVISOR_CYCLE_PERIOD_SECS", defaults.cycle_period_secs),
            detection: DetectionRules {
                horizontal_minimum_nm: parse_env(
                    "ADVISOR_HORIZONTAL_MINIMUM_NM",
                    defaults.detection.horizontal_minimum_nm,
                ),
                vertical_minimum_ft: parse_env(
                    "ADVISOR_VERTICAL_MINIMUM_FT",
                    defaults.detection.vertical_minimum_ft,
                ),
                horizon_minutes: parse_env(
                    "ADVISOR_HORIZON_MINUTES",
                    defaults.detection.horizon_minutes,
                ),
                sample_step_minutes: parse_env(
                    "ADVISOR_SAMPLE_STEP_MINUTES",
                    defaults.detection.sample_step_minutes,
                ),
                max_pair_scan_count: parse_env(
                    "ADVISOR_MAX_PAIR_SCAN_COUNT",
                    defaults.detection.max_pair_scan_count,
                ),
            },
            scheduling: SchedulingRules {
                fuel_critical_threshold_percent: parse_env(
                    "ADVISOR_FUEL_CRITICAL_THRESHOLD_PERCENT",
                    defaults.scheduling.fuel_critical_threshold_percent,
                ),
                max_allowed_delay_minutes: parse_env(
                    "ADVISOR_MAX_ALLOWED_DELAY_MINUTES",
                    defaults.scheduling.max_allowed_delay_minutes,
                ),
            },
        }
    }
}
