//! Command dispatcher and session state machine.
//!
//! ```text
//! Idle ──StartTagsSession──▶ ReceivingTags ──EndTagsSession──▶ TagsReady
//!  │                          │ TagConfig (id≠0)                  │
//!  └──TagConfig (id≠0)────────┼──────────────────────────────────▶│
//!                             └──StartDetection(id == live id)──▶ Armed ──first pulse──▶ Detecting
//! any ──StopDetection──▶ Idle (tag id cleared)
//! ```
//!
//! Every recognised inbound command produces exactly one ack. Guard failures
//! leave the session untouched.

use crate::link::VehicleLink;
use crate::prelude::CodecError;
use crate::protocol::{decode, encode, AckMessage, Message, TagConfig};
use crate::session::phase::SessionPhase;
use crate::simulation::PulseControl;
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct SessionState {
    phase: SessionPhase,
    tag: TagConfig,
    tags_received: usize,
    generation: u64,
}

/// Owns the live tag and session phase and answers every command with an ack.
pub struct CommandHandler {
    state: Mutex<SessionState>,
    link: Arc<dyn VehicleLink>,
    pulses: PulseControl,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl CommandHandler {
    pub fn new(link: Arc<dyn VehicleLink>, pulses: PulseControl, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            link,
            pulses,
            metrics,
            logger: LogManager::new("session"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn tag(&self) -> TagConfig {
        self.lock().tag
    }

    pub fn on_tag_config(&self, tag: TagConfig) -> bool {
        self.tag_config(&mut self.lock(), tag)
    }

    pub fn on_start_detection(&self, requested_tag_id: u32) -> bool {
        self.start_detection(&mut self.lock(), requested_tag_id)
    }

    pub fn on_stop_detection(&self) -> bool {
        self.stop_detection(&mut self.lock())
    }

    pub fn on_start_tags_session(&self) -> bool {
        self.start_tags_session(&mut self.lock())
    }

    pub fn on_end_tags_session(&self) -> bool {
        self.end_tags_session(&mut self.lock())
    }

    /// Moves an armed session to `Detecting` once the engine has emitted for it.
    pub fn mark_detecting(&self, generation: u64) {
        let mut state = self.lock();
        if state.phase == SessionPhase::Armed && state.generation == generation {
            state.phase = SessionPhase::Detecting;
            self.logger
                .record(&format!("detecting pulses for tag {}", state.tag.id));
        }
    }

    fn tag_config(&self, state: &mut SessionState, tag: TagConfig) -> bool {
        if !tag.is_configured() {
            self.logger.warn("tag config rejected: invalid tag id of 0");
            return false;
        }

        self.logger.record(&format!(
            "tag config: id {} freq {:.3} MHz intra-pulse {}/{} ms",
            tag.id,
            tag.frequency_mhz(),
            tag.intra_pulse1_ms,
            tag.intra_pulse2_ms
        ));

        state.tag = tag;
        state.tags_received += 1;
        if state.phase == SessionPhase::Idle {
            state.phase = SessionPhase::TagsReady;
        }
        self.pulses.update_tag(tag);
        true
    }

    fn start_detection(&self, state: &mut SessionState, requested_tag_id: u32) -> bool {
        if requested_tag_id == 0 || requested_tag_id != state.tag.id {
            self.logger.warn(&format!(
                "start detection rejected: requested tag {} known tag {}",
                requested_tag_id, state.tag.id
            ));
            return false;
        }

        state.generation = self.pulses.start_pulses(state.tag);
        state.phase = SessionPhase::Armed;
        self.logger.record(&format!(
            "detection started for tag {} at {:.3} MHz",
            state.tag.id,
            state.tag.frequency_mhz()
        ));
        true
    }

    fn stop_detection(&self, state: &mut SessionState) -> bool {
        state.tag = state.tag.cleared();
        state.tags_received = 0;
        state.phase = SessionPhase::Idle;
        self.pulses.stop_pulses();
        self.logger.record("detection stopped");
        true
    }

    fn start_tags_session(&self, state: &mut SessionState) -> bool {
        if state.phase.detection_running() {
            self.logger
                .warn("start tags session rejected: detection is running");
            return false;
        }
        if state.phase.tags_session_open() {
            self.logger
                .warn("start tags session rejected: session already open");
            return false;
        }

        state.phase = SessionPhase::ReceivingTags;
        state.tags_received = 0;
        self.logger.record("tags session opened");
        true
    }

    fn end_tags_session(&self, state: &mut SessionState) -> bool {
        if !state.phase.tags_session_open() {
            self.logger.warn("end tags session rejected: no session open");
            return false;
        }

        if state.tags_received > 0 {
            state.phase = SessionPhase::TagsReady;
        } else {
            // An empty session leaves nothing to arm, even a tag from before it opened.
            state.tag = state.tag.cleared();
            state.phase = SessionPhase::Idle;
            self.pulses.update_tag(state.tag);
        }
        self.logger.record(&format!(
            "tags session closed with {} tag(s), phase {:?}",
            state.tags_received, state.phase
        ));
        true
    }

    fn dispatch(&self, state: &mut SessionState, message: Message) -> Option<bool> {
        let success = match message {
            Message::TagConfig(tag) => self.tag_config(state, tag),
            Message::StartDetection(start) => self.start_detection(state, start.requested_tag_id),
            Message::StopDetection => self.stop_detection(state),
            Message::StartTagsSession => self.start_tags_session(state),
            Message::EndTagsSession => self.end_tags_session(state),
            Message::Ack(_) | Message::PulseTelemetry(_) => return None,
        };
        Some(success)
    }

    /// Decodes one inbound envelope, applies it and sends the ack.
    ///
    /// Returns the ack that was sent, or `None` when the envelope was
    /// unrecognised, malformed or not a command.
    pub fn handle_envelope(&self, envelope: &[u8]) -> Option<AckMessage> {
        let message = match decode(envelope) {
            Ok(Some(message)) => message,
            Ok(None) => {
                self.metrics.record_dropped_frame();
                self.logger.trace("ignoring unrecognised command id");
                return None;
            }
            Err(err) => {
                self.report_malformed(err);
                return None;
            }
        };

        let command = message.command_id();
        if !command.is_inbound_command() {
            self.logger
                .trace(&format!("ignoring outbound-only message {:?}", command));
            return None;
        }
        let mut state = self.lock();
        let success = self.dispatch(&mut state, message)?;
        let ack = AckMessage::new(command, success);
        self.send_ack(ack);
        Some(ack)
    }

    fn report_malformed(&self, err: CodecError) {
        self.metrics.record_dropped_frame();
        self.logger.warn(&format!("dropping malformed envelope: {}", err));
    }

    fn send_ack(&self, ack: AckMessage) {
        self.logger.record(&format!(
            "ack command {} result {}",
            ack.command_id, ack.result as u32
        ));
        self.metrics.record_ack(ack.result.is_success());
        if let Err(err) = self.link.send(&encode(&Message::Ack(ack))) {
            self.metrics.record_send_error();
            self.logger.warn(&format!("ack send failed: {}", err));
        }
    }
}
