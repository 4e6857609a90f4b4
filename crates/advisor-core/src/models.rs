//! Core data models for the advisory system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin of a position report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    /// ADS-B transponder broadcast
    #[default]
    Adsb,
    /// Radar-derived (ASTERIX) report
    Asterix,
    /// Multilateration
    Mlat,
    /// FLARM beacon
    Flarm,
}

/// Most recent known kinematic state of one aircraft.
///
/// Produced by the ingestion boundary from a [`RawFlightRecord`]; every
/// kinematic field required by prediction is guaranteed present here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightState {
    /// 24-bit transponder address, hex-encoded. Primary key.
    pub icao24: String,
    #[serde(default)]
    pub callsign: Option<String>,
    pub origin_country: String,
    /// Decimal degrees, [-90, 90]
    pub latitude: f64,
    /// Decimal degrees, [-180, 180]
    pub longitude: f64,
    /// Barometric altitude in feet
    pub baro_altitude_ft: f64,
    /// Geometric altitude in feet; falls back to barometric when absent
    #[serde(default)]
    pub geo_altitude_ft: Option<f64>,
    pub on_ground: bool,
    /// Ground speed in knots, >= 0
    pub velocity_kt: f64,
    /// True track in degrees, [0, 360), 0 = north, clockwise
    pub true_track_deg: f64,
    /// Climb/descent rate in feet per minute, signed
    pub vertical_rate_fpm: f64,
    #[serde(default)]
    pub time_position: Option<DateTime<Utc>>,
    pub last_contact: DateTime<Utc>,
    /// 4-digit transponder code, if assigned
    #[serde(default)]
    pub squawk: Option<String>,
    /// Special position identification flag
    #[serde(default)]
    pub spi: bool,
    #[serde(default)]
    pub position_source: PositionSource,
    /// IDs of sensors that contributed to this report
    #[serde(default)]
    pub sensors: Vec<u32>,
}

impl FlightState {
    /// Create a flight with only the fields prediction needs; the rest take
    /// neutral defaults. Intended for construction in tests and simulations.
    pub fn new(icao24: impl Into<String>, latitude: f64, longitude: f64, altitude_ft: f64) -> Self {
        Self {
            icao24: icao24.into(),
            callsign: None,
            origin_country: String::new(),
            latitude,
            longitude,
            baro_altitude_ft: altitude_ft,
            geo_altitude_ft: None,
            on_ground: false,
            velocity_kt: 0.0,
            true_track_deg: 0.0,
            vertical_rate_fpm: 0.0,
            time_position: None,
            last_contact: Utc::now(),
            squawk: None,
            spi: false,
            position_source: PositionSource::default(),
            sensors: Vec::new(),
        }
    }

    /// Set track, speed and vertical rate.
    pub fn with_velocity(mut self, true_track_deg: f64, velocity_kt: f64, vertical_rate_fpm: f64) -> Self {
        self.true_track_deg = true_track_deg;
        self.velocity_kt = velocity_kt;
        self.vertical_rate_fpm = vertical_rate_fpm;
        self
    }

    /// Mark the aircraft as on the ground.
    pub fn grounded(mut self) -> Self {
        self.on_ground = true;
        self
    }

    /// Geometric altitude, falling back to barometric when the feed did not
    /// supply one.
    pub fn geo_altitude_ft(&self) -> f64 {
        self.geo_altitude_ft.unwrap_or(self.baro_altitude_ft)
    }

    /// Vertical rate with the on-ground invariant applied: a grounded
    /// aircraft never climbs, whatever the feed last reported.
    pub fn effective_vertical_rate_fpm(&self) -> f64 {
        if self.on_ground {
            0.0
        } else {
            self.vertical_rate_fpm
        }
    }
}

/// One flight state as delivered by the feed, before validation.
///
/// Feeds drop fields freely; everything kinematic is optional here and the
/// ingestion boundary decides what is acceptable. This type never crosses
/// into the detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFlightRecord {
    pub icao24: String,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub baro_altitude_ft: Option<f64>,
    #[serde(default)]
    pub geo_altitude_ft: Option<f64>,
    #[serde(default)]
    pub on_ground: bool,
    #[serde(default)]
    pub velocity_kt: Option<f64>,
    #[serde(default)]
    pub true_track_deg: Option<f64>,
    #[serde(default)]
    pub vertical_rate_fpm: Option<f64>,
    #[serde(default)]
    pub time_position: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_contact: Option<DateTime<Utc>>,
    #[serde(default)]
    pub squawk: Option<String>,
    #[serde(default)]
    pub spi: bool,
    #[serde(default)]
    pub position_source: PositionSource,
    #[serde(default)]
    pub sensors: Vec<u32>,
}

/// One predicted future sample for one flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub offset_minutes: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
}

/// Severity of a predicted separation violation.
///
/// Ordering is by urgency, so conflict lists sort with `Critical` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A predicted separation violation between two aircraft.
///
/// Records are recomputed from scratch every detection cycle; consumers must
/// not assume a record carries identity across cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub flight_a: String,
    pub flight_b: String,
    pub severity: Severity,
    /// Minutes until the point of minimum horizontal separation
    pub time_to_conflict_min: f64,
    pub min_horizontal_separation_nm: f64,
    /// Vertical separation at the offset of minimum horizontal separation
    pub min_vertical_separation_ft: f64,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightType {
    Arrival,
    Departure,
}

/// Request priority, ordered so `Emergency` compares greatest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Emergency,
}

/// A flight asking for a runway slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub flight_id: String,
    pub flight_type: FlightType,
    pub preferred_time: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    /// Remaining fuel as a percentage of capacity
    pub fuel_level_percent: f64,
}

/// Outcome of one scheduling request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub success: bool,
    pub runway_id: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub delay_minutes: Option<f64>,
    pub error: Option<String>,
}

impl ScheduleResult {
    pub(crate) fn assigned(runway_id: String, scheduled_time: DateTime<Utc>, delay_minutes: f64) -> Self {
        Self {
            success: true,
            runway_id: Some(runway_id),
            scheduled_time: Some(scheduled_time),
            delay_minutes: Some(delay_minutes),
            error: None,
        }
    }

    pub(crate) fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            runway_id: None,
            scheduled_time: None,
            delay_minutes: None,
            error: Some(error.into()),
        }
    }
}

/// A committed operation on a runway's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunwayOperation {
    pub flight_id: String,
    pub scheduled_time: DateTime<Utc>,
    pub flight_type: FlightType,
}
