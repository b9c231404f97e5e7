use serde::Serialize;
use tagsimcore::protocol::{PulseTelemetry, TagConfig};
use tagsimcore::simulation::VehicleState;
use tagsimcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use tagsimcore::{CommandHandler, PulseSimulator, SessionPhase};

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusModel {
    pub mode: String,
    pub phase: SessionPhase,
    pub tag: TagConfig,
    pub armed: bool,
    pub vehicle: VehicleState,
    pub last_pulse: Option<PulseTelemetry>,
    pub metrics: MetricsSnapshot,
}

impl StatusModel {
    pub fn capture(
        mode: &str,
        handler: &CommandHandler,
        engine: Option<&PulseSimulator>,
        metrics: &MetricsRecorder,
    ) -> Self {
        Self {
            mode: mode.to_string(),
            phase: handler.phase(),
            tag: handler.tag(),
            armed: engine.map(PulseSimulator::is_armed).unwrap_or(false),
            vehicle: engine.map(PulseSimulator::vehicle).unwrap_or_default(),
            last_pulse: engine.and_then(PulseSimulator::last_pulse),
            metrics: metrics.snapshot(),
        }
    }
}
