use serde::{Deserialize, Serialize};

/// Command identifiers carried in the envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum CommandId {
    Ack = 1,
    TagConfig = 2,
    StartDetection = 3,
    StopDetection = 4,
    PulseTelemetry = 5,
    StartTagsSession = 6,
    EndTagsSession = 7,
}

impl CommandId {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Ack),
            2 => Some(Self::TagConfig),
            3 => Some(Self::StartDetection),
            4 => Some(Self::StopDetection),
            5 => Some(Self::PulseTelemetry),
            6 => Some(Self::StartTagsSession),
            7 => Some(Self::EndTagsSession),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Fixed payload size that follows the header for this command.
    pub fn payload_len(self) -> usize {
        match self {
            Self::Ack => 8,
            Self::TagConfig => 40,
            Self::StartDetection => 4,
            Self::StopDetection | Self::StartTagsSession | Self::EndTagsSession => 0,
            Self::PulseTelemetry => 32,
        }
    }

    /// Outbound-only identifiers are never dispatched to the session handler.
    pub fn is_inbound_command(self) -> bool {
        !matches!(self, Self::Ack | Self::PulseTelemetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_match_wire_values() {
        for raw in 1..=7 {
            let id = CommandId::from_u32(raw).unwrap();
            assert_eq!(id.as_u32(), raw);
        }
        assert_eq!(CommandId::from_u32(0), None);
        assert_eq!(CommandId::from_u32(8), None);
    }

    #[test]
    fn outbound_ids_are_not_commands() {
        assert!(!CommandId::Ack.is_inbound_command());
        assert!(!CommandId::PulseTelemetry.is_inbound_command());
        assert!(CommandId::TagConfig.is_inbound_command());
    }
}
