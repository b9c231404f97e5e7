use serde::{Deserialize, Serialize};

/// Bearing of peak signal relative to vehicle forward, in degrees.
pub const DEFAULT_STRONGEST_BEARING_DEG: f64 = 45.0;

/// Reference ceiling altitude (400 ft).
pub const CEILING_ALTITUDE_M: f64 = 121.92;

/// Peak strength before altitude scaling.
pub const MAX_STRENGTH: f64 = 100.0;

/// Heading/altitude driven strength model.
///
/// Strength falls off linearly with angular distance from the strongest
/// bearing and scales with altitude relative to the ceiling. The altitude
/// ratio is not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalModel {
    pub strongest_bearing_deg: f64,
    pub ceiling_altitude_m: f64,
}

impl Default for SignalModel {
    fn default() -> Self {
        Self {
            strongest_bearing_deg: DEFAULT_STRONGEST_BEARING_DEG,
            ceiling_altitude_m: CEILING_ALTITUDE_M,
        }
    }
}

impl SignalModel {
    /// Tent response: 1.0 at the strongest bearing, 0.0 opposite it.
    pub fn bearing_ratio(&self, yaw_deg: f64) -> f64 {
        let mut heading = yaw_deg - self.strongest_bearing_deg;
        if heading < 0.0 {
            heading += 360.0;
        }

        if heading <= 180.0 {
            (180.0 - heading) / 180.0
        } else {
            (heading - 180.0) / 180.0
        }
    }

    pub fn altitude_ratio(&self, relative_altitude_m: f64) -> f64 {
        relative_altitude_m / self.ceiling_altitude_m
    }

    pub fn strength(&self, yaw_deg: f64, relative_altitude_m: f64) -> f64 {
        MAX_STRENGTH * self.bearing_ratio(yaw_deg) * self.altitude_ratio(relative_altitude_m)
    }
}
