use crate::protocol::command::CommandId;
use crate::protocol::tag::TagConfig;
use serde::{Deserialize, Serialize};

/// Outcome reported in an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum AckResult {
    Failure = 0,
    Success = 1,
}

impl AckResult {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Response to a processed command, matched by command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    pub command_id: u32,
    pub result: AckResult,
}

impl AckMessage {
    pub fn new(command: CommandId, success: bool) -> Self {
        Self {
            command_id: command.as_u32(),
            result: AckResult::from_success(success),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartDetection {
    pub requested_tag_id: u32,
}

/// Detected (or synthesised) pulse sent to the ground station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseTelemetry {
    pub tag_id: u32,
    pub frequency_hz: u32,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub strength: f64,
    pub confirmed: bool,
    pub group_index: u32,
}

impl PulseTelemetry {
    pub fn new(tag: &TagConfig, timestamp: f64, strength: f64, confirmed: bool) -> Self {
        Self {
            tag_id: tag.id,
            frequency_hz: tag.frequency_hz,
            timestamp,
            strength,
            confirmed,
            group_index: 0,
        }
    }
}

/// Every message that can travel inside an envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Ack(AckMessage),
    TagConfig(TagConfig),
    StartDetection(StartDetection),
    StopDetection,
    PulseTelemetry(PulseTelemetry),
    StartTagsSession,
    EndTagsSession,
}

impl Message {
    pub fn command_id(&self) -> CommandId {
        match self {
            Self::Ack(_) => CommandId::Ack,
            Self::TagConfig(_) => CommandId::TagConfig,
            Self::StartDetection(_) => CommandId::StartDetection,
            Self::StopDetection => CommandId::StopDetection,
            Self::PulseTelemetry(_) => CommandId::PulseTelemetry,
            Self::StartTagsSession => CommandId::StartTagsSession,
            Self::EndTagsSession => CommandId::EndTagsSession,
        }
    }
}
