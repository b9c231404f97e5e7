pub mod control;
pub mod engine;
pub mod signal;
pub mod vehicle;

pub use control::{control_channel, DetectionControl, PulseControl};
pub use engine::{PulseSimulator, SimulatorConfig, IDLE_INTERVAL_MS};
pub use signal::{SignalModel, CEILING_ALTITUDE_M, DEFAULT_STRONGEST_BEARING_DEG};
pub use vehicle::{
    telemetry_channel, Attitude, Position, TelemetryPublisher, VehicleState, VehicleTelemetry,
};
