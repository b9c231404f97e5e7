use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub relative_altitude_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub yaw_deg: f64,
}

/// Last-known vehicle position and attitude. `None` until the first push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Option<Position>,
    pub attitude: Option<Attitude>,
}

impl VehicleState {
    pub fn is_known(&self) -> bool {
        self.position.is_some() && self.attitude.is_some()
    }
}

/// Writer side of the telemetry feed, owned by the link's telemetry callbacks.
pub struct TelemetryPublisher {
    position: watch::Sender<Option<Position>>,
    attitude: watch::Sender<Option<Attitude>>,
}

impl TelemetryPublisher {
    pub fn on_position_update(&self, latitude_deg: f64, longitude_deg: f64, relative_altitude_m: f64) {
        self.position.send_replace(Some(Position {
            latitude_deg,
            longitude_deg,
            relative_altitude_m,
        }));
    }

    pub fn on_attitude_update(&self, yaw_deg: f64) {
        self.attitude.send_replace(Some(Attitude { yaw_deg }));
    }
}

/// Reader side of the telemetry feed. Only the latest value is kept.
#[derive(Clone)]
pub struct VehicleTelemetry {
    position: watch::Receiver<Option<Position>>,
    attitude: watch::Receiver<Option<Attitude>>,
}

impl VehicleTelemetry {
    pub fn snapshot(&self) -> VehicleState {
        VehicleState {
            position: *self.position.borrow(),
            attitude: *self.attitude.borrow(),
        }
    }
}

pub fn telemetry_channel() -> (TelemetryPublisher, VehicleTelemetry) {
    let (position_tx, position_rx) = watch::channel(None);
    let (attitude_tx, attitude_rx) = watch::channel(None);
    (
        TelemetryPublisher {
            position: position_tx,
            attitude: attitude_tx,
        },
        VehicleTelemetry {
            position: position_rx,
            attitude: attitude_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_unknown_until_both_feeds_arrive() {
        let (publisher, telemetry) = telemetry_channel();
        assert_eq!(telemetry.snapshot(), VehicleState::default());

        publisher.on_position_update(32.2, -110.9, 50.0);
        assert!(!telemetry.snapshot().is_known());

        publisher.on_attitude_update(90.0);
        let state = telemetry.snapshot();
        assert!(state.is_known());
        assert_eq!(state.attitude.unwrap().yaw_deg, 90.0);
    }

    #[test]
    fn only_latest_update_is_visible() {
        let (publisher, telemetry) = telemetry_channel();
        for yaw in [10.0, 20.0, 30.0] {
            publisher.on_attitude_update(yaw);
        }
        assert_eq!(telemetry.snapshot().attitude.unwrap().yaw_deg, 30.0);
    }
}
