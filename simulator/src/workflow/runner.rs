use crate::generator::flight::FlightProfile;
use crate::link::UdpVehicleLink;
use crate::status_bridge::bridge::StatusBridge;
use crate::status_bridge::model::StatusModel;
use crate::workflow::config::HarnessConfig;
use anyhow::Context;
use clap::ValueEnum;
use log::{info, warn};
use std::sync::Arc;
use std::thread;
use tagsimcore::ingest::UdpPulseReceiver;
use tagsimcore::scheduler::Scheduler;
use tagsimcore::simulation::{control_channel, telemetry_channel, DetectionControl};
use tagsimcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use tagsimcore::{CommandHandler, PulseSimulator};
use tokio::sync::watch;

/// Where pulses come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Synthesise pulses from the vehicle's heading and altitude.
    SimulatePulse,
    /// Log raw pulse bytes received on the local UDP port.
    UdpPulse,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SimulatePulse => "simulate-pulse",
            Self::UdpPulse => "udp-pulse",
        }
    }
}

pub struct RunSummary {
    pub ticks: usize,
    pub metrics: MetricsSnapshot,
}

/// Everything both modes share once the link is up.
struct Session<'a> {
    link: Arc<UdpVehicleLink>,
    handler: Arc<CommandHandler>,
    control_rx: watch::Receiver<DetectionControl>,
    metrics: Arc<MetricsRecorder>,
    bridge: Option<&'a StatusBridge>,
}

#[derive(Clone)]
pub struct Runner {
    config: HarnessConfig,
}

impl Runner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn execute(
        &self,
        mode: Mode,
        scheduler: &Scheduler,
        bridge: Option<&StatusBridge>,
    ) -> anyhow::Result<RunSummary> {
        let metrics = Arc::new(MetricsRecorder::new());
        let link = UdpVehicleLink::bind(&self.config.link).context("starting vehicle link")?;
        info!(
            "vehicle link on {} -> ground station {}",
            link.local_addr()?,
            link.peer()
        );
        let (control, control_rx) = control_channel();
        let handler = Arc::new(CommandHandler::new(link.clone(), control, metrics.clone()));
        let receiver = link.spawn_receiver(handler.clone());

        let session = Session {
            link: link.clone(),
            handler,
            control_rx,
            metrics: metrics.clone(),
            bridge,
        };
        let ticks = match mode {
            Mode::SimulatePulse => self.simulate(scheduler, session),
            Mode::UdpPulse => self.ingest(scheduler, session),
        };

        scheduler.handle().stop();
        link.shutdown();
        if receiver.join().is_err() {
            warn!("vehicle link receiver panicked");
        }

        Ok(RunSummary {
            ticks: ticks?,
            metrics: metrics.snapshot(),
        })
    }

    fn simulate(&self, scheduler: &Scheduler, session: Session<'_>) -> anyhow::Result<usize> {
        let (publisher, vehicle) = telemetry_channel();
        let flight = FlightProfile::new(self.config.flight.clone()).spawn(publisher, scheduler.handle());
        let mut engine = PulseSimulator::new(
            session.link.clone(),
            vehicle,
            session.control_rx,
            self.config.simulation,
            session.metrics.clone(),
        );

        info!("Simulating pulses");
        let handler = &session.handler;
        let metrics = &session.metrics;
        let ticks = scheduler.run(&mut engine, |engine| {
            if let Some(generation) = engine.detecting_generation() {
                handler.mark_detecting(generation);
            }
            if let Some(bridge) = session.bridge {
                bridge.publish(StatusModel::capture(
                    Mode::SimulatePulse.as_str(),
                    handler,
                    Some(engine),
                    metrics,
                ));
            }
        });

        scheduler.handle().stop();
        if flight.join().is_err() {
            warn!("flight profile thread panicked");
        }
        Ok(ticks)
    }

    fn ingest(&self, scheduler: &Scheduler, session: Session<'_>) -> anyhow::Result<usize> {
        let mut receiver = UdpPulseReceiver::bind(self.config.udp_pulse.bind, session.metrics.clone())
            .context("starting external pulse receiver")?;

        let stop = receiver.stop_handle();
        let handle = scheduler.handle();
        let watcher = thread::spawn(move || {
            handle.wait_until_stopped();
            stop.stop();
        });

        info!("UDP pulses on {}", receiver.local_addr());
        let handler = &session.handler;
        let metrics = &session.metrics;
        let ticks = scheduler.run(&mut receiver, |_| {
            if let Some(bridge) = session.bridge {
                bridge.publish(StatusModel::capture(
                    Mode::UdpPulse.as_str(),
                    handler,
                    None,
                    metrics,
                ));
            }
        });

        scheduler.handle().stop();
        if watcher.join().is_err() {
            warn!("ingest stop watcher panicked");
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::flight::FlightConfig;
    use crate::workflow::config::LinkConfig;
    use std::net::{SocketAddr, UdpSocket};
    use std::time::Duration;
    use tagsimcore::protocol::{
        decode, encode, AckMessage, CommandId, Message, StartDetection, TagConfig,
    };
    use tagsimcore::simulation::{SimulatorConfig, CEILING_ALTITUDE_M};

    fn free_port() -> u16 {
        UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn recv_message(socket: &UdpSocket) -> Option<Message> {
        let mut buffer = [0u8; 2048];
        let (len, _) = socket.recv_from(&mut buffer).ok()?;
        decode(&buffer[..len]).ok().flatten()
    }

    #[test]
    fn mode_names_match_cli() {
        assert_eq!(Mode::SimulatePulse.as_str(), "simulate-pulse");
        assert_eq!(
            Mode::from_str("udp-pulse", false).unwrap(),
            Mode::UdpPulse
        );
        assert!(Mode::from_str("bogus", false).is_err());
    }

    #[test]
    fn simulate_mode_acks_and_streams_pulses() {
        let ground = UdpSocket::bind("127.0.0.1:0").unwrap();
        ground
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let payload_addr = SocketAddr::from(([127, 0, 0, 1], free_port()));

        let config = HarnessConfig {
            link: LinkConfig {
                bind: payload_addr,
                ground_station: ground.local_addr().unwrap(),
            },
            simulation: SimulatorConfig {
                idle_interval_ms: 20,
                ..Default::default()
            },
            flight: FlightConfig {
                altitude_m: CEILING_ALTITUDE_M,
                altitude_noise_m: 0.0,
                yaw_rate_deg_s: 0.0,
                initial_yaw_deg: 45.0,
                update_ms: 10,
                ..Default::default()
            },
            ..Default::default()
        };

        let scheduler = Scheduler::new();
        let stop = scheduler.handle();
        let runner = Runner::new(config);
        let worker = thread::spawn(move || runner.execute(Mode::SimulatePulse, &scheduler, None));

        let tag = TagConfig {
            id: 7,
            frequency_hz: 150_000_000,
            intra_pulse1_ms: 30,
            ..Default::default()
        };
        let mut acked = false;
        for _ in 0..25 {
            ground
                .send_to(&encode(&Message::TagConfig(tag)), payload_addr)
                .unwrap();
            if let Some(Message::Ack(ack)) = recv_message(&ground) {
                assert_eq!(ack, AckMessage::new(CommandId::TagConfig, true));
                acked = true;
                break;
            }
        }
        assert!(acked, "payload never acked the tag config");

        ground
            .send_to(
                &encode(&Message::StartDetection(StartDetection {
                    requested_tag_id: 7,
                })),
                payload_addr,
            )
            .unwrap();

        let mut first_pulse = None;
        for _ in 0..50 {
            match recv_message(&ground) {
                Some(Message::PulseTelemetry(pulse)) => {
                    first_pulse = Some(pulse);
                    break;
                }
                _ => continue,
            }
        }

        stop.stop();
        let summary = worker.join().unwrap().unwrap();

        let pulse = first_pulse.expect("no pulse telemetry received");
        assert_eq!(pulse.tag_id, 7);
        assert_eq!(pulse.strength, 100.0);
        assert!(pulse.confirmed);
        assert!(summary.ticks > 0);
        assert!(summary.metrics.acks_sent >= 2);
    }

    #[test]
    fn udp_mode_forwards_external_bytes_and_stops() {
        let pulse_addr = SocketAddr::from(([127, 0, 0, 1], free_port()));
        let config = HarnessConfig {
            link: LinkConfig {
                bind: SocketAddr::from(([127, 0, 0, 1], 0)),
                ..Default::default()
            },
            udp_pulse: crate::workflow::config::UdpPulseConfig { bind: pulse_addr },
            ..Default::default()
        };

        let scheduler = Scheduler::new();
        let stop = scheduler.handle();
        let runner = Runner::new(config);
        let worker = thread::spawn(move || runner.execute(Mode::UdpPulse, &scheduler, None));

        let stimulus = UdpSocket::bind("127.0.0.1:0").unwrap();
        thread::sleep(Duration::from_millis(100));
        stimulus.send_to(&[10, 20, 30], pulse_addr).unwrap();
        thread::sleep(Duration::from_millis(100));

        stop.stop();
        let summary = worker.join().unwrap().unwrap();
        assert_eq!(summary.metrics.bytes_ingested, 3);
    }
}
