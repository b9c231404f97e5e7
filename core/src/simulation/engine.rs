use crate::link::VehicleLink;
use crate::prelude::PulseSource;
use crate::protocol::{encode, Message, PulseTelemetry, TagConfig};
use crate::simulation::control::DetectionControl;
use crate::simulation::signal::SignalModel;
use crate::simulation::vehicle::{VehicleState, VehicleTelemetry};
use crate::telemetry::{LogManager, MetricsRecorder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const IDLE_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub strongest_bearing_deg: f64,
    pub ceiling_altitude_m: f64,
    pub idle_interval_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        let model = SignalModel::default();
        Self {
            strongest_bearing_deg: model.strongest_bearing_deg,
            ceiling_altitude_m: model.ceiling_altitude_m,
            idle_interval_ms: IDLE_INTERVAL_MS,
        }
    }
}

impl SimulatorConfig {
    pub fn signal_model(&self) -> SignalModel {
        SignalModel {
            strongest_bearing_deg: self.strongest_bearing_deg,
            ceiling_altitude_m: self.ceiling_altitude_m,
        }
    }
}

/// Synthesises pulse telemetry from the vehicle's heading and altitude.
pub struct PulseSimulator {
    link: Arc<dyn VehicleLink>,
    vehicle: VehicleTelemetry,
    control: watch::Receiver<DetectionControl>,
    model: SignalModel,
    idle_interval: Duration,
    armed: bool,
    tag: TagConfig,
    generation: u64,
    confirmed: bool,
    emitted_this_generation: usize,
    last_pulse: Option<PulseTelemetry>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl PulseSimulator {
    pub fn new(
        link: Arc<dyn VehicleLink>,
        vehicle: VehicleTelemetry,
        control: watch::Receiver<DetectionControl>,
        config: SimulatorConfig,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            link,
            vehicle,
            control,
            model: config.signal_model(),
            idle_interval: Duration::from_millis(config.idle_interval_ms),
            armed: false,
            tag: TagConfig::default(),
            generation: 0,
            confirmed: true,
            emitted_this_generation: 0,
            last_pulse: None,
            metrics,
            logger: LogManager::new("pulse"),
        }
    }

    /// Adopts the most recent control snapshot from the session handler.
    fn sync_control(&mut self) {
        let control = *self.control.borrow_and_update();
        if control.generation != self.generation {
            self.emitted_this_generation = 0;
            self.generation = control.generation;
        }
        self.armed = control.armed;
        self.tag = control.tag;
    }

    fn ready(&self, vehicle: &VehicleState) -> bool {
        self.armed && vehicle.is_known() && self.tag.is_configured()
    }

    pub fn ready_to_simulate(&mut self) -> bool {
        self.sync_control();
        let vehicle = self.vehicle.snapshot();
        self.ready(&vehicle)
    }

    /// Runs one tick against the wall clock and returns the delay before the next.
    pub fn simulate_pulse(&mut self) -> Duration {
        self.simulate_pulse_at(now_seconds())
    }

    pub fn simulate_pulse_at(&mut self, timestamp: f64) -> Duration {
        self.sync_control();
        let vehicle = self.vehicle.snapshot();

        let (Some(position), Some(attitude)) = (vehicle.position, vehicle.attitude) else {
            return self.idle_interval;
        };
        if !self.ready(&vehicle) {
            return self.idle_interval;
        }

        let strength = self
            .model
            .strength(attitude.yaw_deg, position.relative_altitude_m);
        let pulse = PulseTelemetry::new(&self.tag, timestamp, strength, self.confirmed);
        self.confirmed = !self.confirmed;

        self.logger.record(&format!(
            "simulated pulse tag {} yaw {:.1} alt {:.1} strength {:.2} confirmed {}",
            pulse.tag_id, attitude.yaw_deg, position.relative_altitude_m, strength, pulse.confirmed
        ));

        match self.link.send(&encode(&Message::PulseTelemetry(pulse))) {
            Ok(()) => self.metrics.record_pulse(),
            Err(err) => {
                self.metrics.record_send_error();
                self.logger.warn(&format!("pulse send failed: {}", err));
            }
        }

        self.emitted_this_generation += 1;
        self.last_pulse = Some(pulse);

        Duration::from_millis(u64::from(self.tag.intra_pulse1_ms))
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn last_pulse(&self) -> Option<PulseTelemetry> {
        self.last_pulse
    }

    /// Generation of the armed session once it has produced a pulse.
    pub fn detecting_generation(&self) -> Option<u64> {
        (self.armed && self.emitted_this_generation > 0).then_some(self.generation)
    }

    pub fn vehicle(&self) -> VehicleState {
        self.vehicle.snapshot()
    }
}

impl PulseSource for PulseSimulator {
    fn next_pulse(&mut self) -> Duration {
        self.simulate_pulse()
    }
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::RecordingLink;
    use crate::protocol::decode;
    use crate::simulation::control::{control_channel, PulseControl};
    use crate::simulation::signal::CEILING_ALTITUDE_M;
    use crate::simulation::vehicle::{telemetry_channel, TelemetryPublisher};

    struct Harness {
        link: Arc<RecordingLink>,
        publisher: TelemetryPublisher,
        control: PulseControl,
        engine: PulseSimulator,
    }

    fn harness() -> Harness {
        let link = Arc::new(RecordingLink::new());
        let (publisher, telemetry) = telemetry_channel();
        let (control, rx) = control_channel();
        let engine = PulseSimulator::new(
            link.clone(),
            telemetry,
            rx,
            SimulatorConfig::default(),
            Arc::new(MetricsRecorder::new()),
        );
        Harness {
            link,
            publisher,
            control,
            engine,
        }
    }

    fn tag() -> TagConfig {
        TagConfig {
            id: 7,
            frequency_hz: 150_000_000,
            pulse_width_ms: 20,
            intra_pulse1_ms: 500,
            ..Default::default()
        }
    }

    fn sent_pulses(link: &RecordingLink) -> Vec<PulseTelemetry> {
        link.take()
            .iter()
            .filter_map(|frame| match decode(frame) {
                Ok(Some(Message::PulseTelemetry(pulse))) => Some(pulse),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn idle_until_every_precondition_holds() {
        let mut h = harness();
        assert_eq!(h.engine.simulate_pulse_at(0.0), Duration::from_millis(1000));

        h.control.start_pulses(tag());
        assert_eq!(h.engine.simulate_pulse_at(0.0), Duration::from_millis(1000));

        h.publisher.on_position_update(0.0, 0.0, CEILING_ALTITUDE_M);
        assert!(!h.engine.ready_to_simulate());

        h.publisher.on_attitude_update(45.0);
        assert!(h.engine.ready_to_simulate());
        assert!(h.link.is_empty());
    }

    #[test]
    fn armed_with_cleared_tag_is_not_ready() {
        let mut h = harness();
        h.publisher.on_position_update(0.0, 0.0, 50.0);
        h.publisher.on_attitude_update(0.0);
        h.control.start_pulses(TagConfig::default());
        assert!(!h.engine.ready_to_simulate());
        assert_eq!(h.engine.simulate_pulse_at(0.0), Duration::from_millis(1000));
    }

    #[test]
    fn ticks_alternate_confirmed_and_use_intra_pulse_interval() {
        let mut h = harness();
        h.publisher.on_position_update(0.0, 0.0, CEILING_ALTITUDE_M);
        h.publisher.on_attitude_update(45.0);
        h.control.start_pulses(tag());

        assert_eq!(h.engine.simulate_pulse_at(1.0), Duration::from_millis(500));
        assert_eq!(h.engine.simulate_pulse_at(1.5), Duration::from_millis(500));
        assert_eq!(h.engine.simulate_pulse_at(2.0), Duration::from_millis(500));

        let pulses = sent_pulses(&h.link);
        assert_eq!(pulses.len(), 3);
        assert_eq!(
            pulses.iter().map(|p| p.confirmed).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert!(pulses.iter().all(|p| p.strength == 100.0));
        assert_eq!(pulses[0].tag_id, 7);
        assert_eq!(pulses[0].frequency_hz, 150_000_000);
        assert_eq!(pulses[1].timestamp, 1.5);
    }

    #[test]
    fn stop_returns_engine_to_idle() {
        let mut h = harness();
        h.publisher.on_position_update(0.0, 0.0, 60.0);
        h.publisher.on_attitude_update(225.0);
        h.control.start_pulses(tag());
        h.engine.simulate_pulse_at(0.0);
        assert_eq!(h.engine.last_pulse().unwrap().strength, 0.0);
        assert_eq!(h.engine.detecting_generation(), Some(1));

        h.control.stop_pulses();
        assert_eq!(h.engine.simulate_pulse_at(1.0), Duration::from_millis(1000));
        assert_eq!(h.engine.detecting_generation(), None);
        assert_eq!(sent_pulses(&h.link).len(), 1);
    }

    #[test]
    fn tag_update_while_armed_is_adopted() {
        let mut h = harness();
        h.publisher.on_position_update(0.0, 0.0, CEILING_ALTITUDE_M);
        h.publisher.on_attitude_update(45.0);
        h.control.start_pulses(tag());
        h.control.update_tag(TagConfig {
            id: 8,
            intra_pulse1_ms: 250,
            ..tag()
        });

        assert_eq!(h.engine.simulate_pulse_at(0.0), Duration::from_millis(250));
        assert_eq!(h.engine.last_pulse().unwrap().tag_id, 8);
    }
}
