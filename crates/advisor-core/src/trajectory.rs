//! Short-horizon trajectory prediction by dead reckoning.

use crate::models::{FlightState, TrajectoryPoint};
use crate::spatial;

/// Predict future positions of a flight at fixed sample offsets.
///
/// Samples at offsets `0, step, 2*step, ...` up to and including
/// `horizon_minutes`. Each sample displaces the current position along the
/// aircraft's true track at its current ground speed and applies the
/// vertical rate to the barometric altitude.
///
/// A grounded aircraft yields a constant trajectory. A zero ground speed
/// keeps position fixed while altitude still follows the vertical rate.
pub fn predict(flight: &FlightState, horizon_minutes: f64, step_minutes: f64) -> Vec<TrajectoryPoint> {
    let mut points = Vec::new();
    let nm_per_min = flight.velocity_kt / 60.0;
    let vertical_rate = flight.effective_vertical_rate_fpm();

    let mut t = 0.0;
    loop {
        let (latitude, longitude) = if flight.on_ground || nm_per_min <= 0.0 {
            (flight.latitude, flight.longitude)
        } else {
            spatial::offset_by_bearing(
                flight.latitude,
                flight.longitude,
                nm_per_min * t,
                flight.true_track_deg,
            )
        };

        points.push(TrajectoryPoint {
            offset_minutes: t,
            latitude,
            longitude,
            altitude_ft: flight.baro_altitude_ft + vertical_rate * t,
        });

        if step_minutes <= 0.0 || t + step_minutes > horizon_minutes + 1e-9 {
            break;
        }
        t += step_minutes;
    }

    points
}
