//! In-memory flight store using DashMap.
//!
//! The store is the only owner and writer of flight state. The external
//! feed refreshes it once per ingest cycle; the detector and predictor read
//! an immutable snapshot, so feed writes never block or corrupt a detection
//! cycle in progress.

use std::sync::atomic::{AtomicU64, Ordering};

use advisor_core::models::{FlightState, RawFlightRecord};
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("record has empty icao24")]
    MissingId,
    #[error("flight {icao24}: missing required field {field}")]
    MissingField {
        icao24: String,
        field: &'static str,
    },
    #[error("flight {icao24}: latitude {value} out of range [-90, 90]")]
    LatitudeOutOfRange { icao24: String, value: f64 },
    #[error("flight {icao24}: longitude {value} out of range [-180, 180]")]
    LongitudeOutOfRange { icao24: String, value: f64 },
    #[error("flight {icao24}: negative velocity {value}")]
    NegativeVelocity { icao24: String, value: f64 },
    #[error("flight {icao24}: non-finite value in field {field}")]
    NonFinite {
        icao24: String,
        field: &'static str,
    },
}

/// Validate one feed record into a [`FlightState`].
///
/// This is the ingestion boundary: everything past it carries the field
/// guarantees the detector relies on. Malformed records are rejected here,
/// never deep inside detection logic.
pub fn validate(raw: RawFlightRecord) -> Result<FlightState, IngestError> {
    if raw.icao24.trim().is_empty() {
        return Err(IngestError::MissingId);
    }
    let icao24 = raw.icao24;

    let require = |value: Option<f64>, field: &'static str| -> Result<f64, IngestError> {
        let value = value.ok_or(IngestError::MissingField {
            icao24: icao24.clone(),
            field,
        })?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IngestError::NonFinite {
                icao24: icao24.clone(),
                field,
            })
        }
    };

    let latitude = require(raw.latitude, "latitude")?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(IngestError::LatitudeOutOfRange {
            icao24: icao24.clone(),
            value: latitude,
        });
    }
    let longitude = require(raw.longitude, "longitude")?;
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(IngestError::LongitudeOutOfRange {
            icao24: icao24.clone(),
            value: longitude,
        });
    }
    let baro_altitude_ft = require(raw.baro_altitude_ft, "baro_altitude_ft")?;
    let velocity_kt = require(raw.velocity_kt, "velocity_kt")?;
    if velocity_kt < 0.0 {
        return Err(IngestError::NegativeVelocity {
            icao24: icao24.clone(),
            value: velocity_kt,
        });
    }
    let true_track_deg = require(raw.true_track_deg, "true_track_deg")?.rem_euclid(360.0);
    let vertical_rate_fpm = require(raw.vertical_rate_fpm.or(Some(0.0)), "vertical_rate_fpm")?;

    Ok(FlightState {
        icao24,
        callsign: raw.callsign,
        origin_country: raw.origin_country.unwrap_or_default(),
        latitude,
        longitude,
        baro_altitude_ft,
        geo_altitude_ft: raw.geo_altitude_ft.filter(|v| v.is_finite()),
        on_ground: raw.on_ground,
        velocity_kt,
        true_track_deg,
        vertical_rate_fpm,
        time_position: raw.time_position,
        last_contact: raw.last_contact.unwrap_or_else(chrono::Utc::now),
        squawk: raw.squawk,
        spi: raw.spi,
        position_source: raw.position_source,
        sensors: raw.sensors,
    })
}

/// Versioned, read-mostly snapshot store of current flight state.
#[derive(Debug, Default)]
pub struct FlightStore {
    flights: DashMap<String, FlightState>,
    version: AtomicU64,
}

impl FlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert one feed record.
    pub fn ingest(&self, raw: RawFlightRecord) -> Result<(), IngestError> {
        let flight = validate(raw)?;
        self.flights.insert(flight.icao24.clone(), flight);
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Replace the store contents with one validated feed refresh.
    ///
    /// Invalid records are dropped and counted; the refresh still applies.
    /// Returns the number of rejected records.
    pub fn apply_refresh(&self, records: Vec<RawFlightRecord>) -> usize {
        let mut rejected = 0usize;
        let mut accepted = Vec::with_capacity(records.len());
        for raw in records {
            match validate(raw) {
                Ok(flight) => accepted.push(flight),
                Err(e) => {
                    rejected += 1;
                    tracing::debug!("rejected feed record: {e}");
                }
            }
        }

        self.flights.clear();
        for flight in accepted {
            self.flights.insert(flight.icao24.clone(), flight);
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        if rejected > 0 {
            tracing::warn!("feed refresh dropped {rejected} malformed record(s)");
        }
        rejected
    }

    /// Copy-on-read view for one detection cycle.
    pub fn snapshot(&self) -> Vec<FlightState> {
        self.flights.iter().map(|r| r.value().clone()).collect()
    }

    pub fn get(&self, icao24: &str) -> Option<FlightState> {
        self.flights.get(icao24).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Monotonic refresh counter; bumps on every mutation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record(icao24: &str) -> RawFlightRecord {
        RawFlightRecord {
            icao24: icao24.to_string(),
            latitude: Some(40.6413),
            longitude: Some(-73.7781),
            baro_altitude_ft: Some(31_000.0),
            velocity_kt: Some(420.0),
            true_track_deg: Some(92.0),
            vertical_rate_fpm: Some(-300.0),
            ..RawFlightRecord::default()
        }
    }

    #[test]
    fn valid_record_enters_store() {
        let store = FlightStore::new();
        store.ingest(valid_record("abc123")).unwrap();
        assert_eq!(store.len(), 1);
        let flight = store.get("abc123").unwrap();
        assert_eq!(flight.velocity_kt, 420.0);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let store = FlightStore::new();

        let mut bad_lat = valid_record("bad001");
        bad_lat.latitude = Some(95.0);
        assert!(matches!(
            store.ingest(bad_lat),
            Err(IngestError::LatitudeOutOfRange { .. })
        ));

        let mut bad_lon = valid_record("bad002");
        bad_lon.longitude = Some(-200.0);
        assert!(matches!(
            store.ingest(bad_lon),
            Err(IngestError::LongitudeOutOfRange { .. })
        ));

        assert!(store.is_empty());
    }

    #[test]
    fn missing_kinematics_are_rejected() {
        let store = FlightStore::new();
        let mut missing = valid_record("bad003");
        missing.velocity_kt = None;
        assert!(matches!(
            store.ingest(missing),
            Err(IngestError::MissingField { field: "velocity_kt", .. })
        ));

        let mut negative = valid_record("bad004");
        negative.velocity_kt = Some(-10.0);
        assert!(matches!(
            store.ingest(negative),
            Err(IngestError::NegativeVelocity { .. })
        ));
    }

    #[test]
    fn missing_vertical_rate_defaults_to_level() {
        let mut record = valid_record("lvl001");
        record.vertical_rate_fpm = None;
        let flight = validate(record).unwrap();
        assert_eq!(flight.vertical_rate_fpm, 0.0);
    }

    #[test]
    fn track_is_normalized_into_range() {
        let mut record = valid_record("trk001");
        record.true_track_deg = Some(450.0);
        let flight = validate(record).unwrap();
        assert!((flight.true_track_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn refresh_replaces_contents_and_bumps_version() {
        let store = FlightStore::new();
        store.ingest(valid_record("old001")).unwrap();
        let v1 = store.version();

        let mut bad = valid_record("bad001");
        bad.latitude = None;
        let rejected = store.apply_refresh(vec![valid_record("new001"), valid_record("new002"), bad]);

        assert_eq!(rejected, 1);
        assert_eq!(store.len(), 2);
        assert!(store.get("old001").is_none());
        assert!(store.version() > v1);
    }
}
