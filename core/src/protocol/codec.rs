//! Fixed-layout envelope codec.
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────────┐
//! │ Command id (4B)  │ Payload (fixed size per command) │
//! │ LE u32           │ LE fields in declaration order   │
//! └──────────────────┴─────────────────────────────────┘
//! ```
//!
//! The header can be peeked without touching the payload. A frame whose
//! total length does not match the size fixed for its command is rejected.

use crate::prelude::{CodecError, CodecResult};
use crate::protocol::command::CommandId;
use crate::protocol::messages::{AckMessage, AckResult, Message, PulseTelemetry, StartDetection};
use crate::protocol::tag::TagConfig;

pub const HEADER_LEN: usize = 4;

/// A payload with a fixed binary layout.
pub trait WirePayload: Sized {
    const COMMAND: CommandId;

    fn encode_payload(&self, out: &mut Vec<u8>);
    fn decode_payload(payload: &[u8]) -> CodecResult<Self>;
}

/// Sequential little-endian reader over a payload of already-validated length.
struct FieldReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn new(command: CommandId, bytes: &'a [u8]) -> CodecResult<Self> {
        let expected = command.payload_len();
        if bytes.len() != expected {
            return Err(CodecError::Length {
                command: command.as_u32(),
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, offset: 0 })
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut raw = [0u8; N];
        raw.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        raw
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    fn f64(&mut self) -> f64 {
        f64::from_le_bytes(self.take())
    }

    fn flag(&mut self, name: &str) -> CodecResult<bool> {
        match self.u32() {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidField(format!("{name}={other}"))),
        }
    }
}

impl WirePayload for AckMessage {
    const COMMAND: CommandId = CommandId::Ack;

    fn encode_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.command_id.to_le_bytes());
        out.extend_from_slice(&(self.result as u32).to_le_bytes());
    }

    fn decode_payload(payload: &[u8]) -> CodecResult<Self> {
        let mut reader = FieldReader::new(Self::COMMAND, payload)?;
        let command_id = reader.u32();
        let result = if reader.flag("result")? {
            AckResult::Success
        } else {
            AckResult::Failure
        };
        Ok(Self { command_id, result })
    }
}

impl WirePayload for TagConfig {
    const COMMAND: CommandId = CommandId::TagConfig;

    fn encode_payload(&self, out: &mut Vec<u8>) {
        for field in [
            self.id,
            self.frequency_hz,
            self.pulse_width_ms,
            self.intra_pulse1_ms,
            self.intra_pulse2_ms,
            self.intra_pulse_uncertainty_ms,
            self.intra_pulse_jitter_ms,
            self.matched_filter_length,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&self.false_alarm_probability.to_le_bytes());
        out.extend_from_slice(&self.max_pulse_magnitude.to_le_bytes());
    }

    fn decode_payload(payload: &[u8]) -> CodecResult<Self> {
        let mut reader = FieldReader::new(Self::COMMAND, payload)?;
        Ok(Self {
            id: reader.u32(),
            frequency_hz: reader.u32(),
            pulse_width_ms: reader.u32(),
            intra_pulse1_ms: reader.u32(),
            intra_pulse2_ms: reader.u32(),
            intra_pulse_uncertainty_ms: reader.u32(),
            intra_pulse_jitter_ms: reader.u32(),
            matched_filter_length: reader.u32(),
            false_alarm_probability: reader.f32(),
            max_pulse_magnitude: reader.f32(),
        })
    }
}

impl WirePayload for StartDetection {
    const COMMAND: CommandId = CommandId::StartDetection;

    fn encode_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.requested_tag_id.to_le_bytes());
    }

    fn decode_payload(payload: &[u8]) -> CodecResult<Self> {
        let mut reader = FieldReader::new(Self::COMMAND, payload)?;
        Ok(Self {
            requested_tag_id: reader.u32(),
        })
    }
}

impl WirePayload for PulseTelemetry {
    const COMMAND: CommandId = CommandId::PulseTelemetry;

    fn encode_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.tag_id.to_le_bytes());
        out.extend_from_slice(&self.frequency_hz.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.strength.to_le_bytes());
        out.extend_from_slice(&u32::from(self.confirmed).to_le_bytes());
        out.extend_from_slice(&self.group_index.to_le_bytes());
    }

    fn decode_payload(payload: &[u8]) -> CodecResult<Self> {
        let mut reader = FieldReader::new(Self::COMMAND, payload)?;
        Ok(Self {
            tag_id: reader.u32(),
            frequency_hz: reader.u32(),
            timestamp: reader.f64(),
            strength: reader.f64(),
            confirmed: reader.flag("confirmed")?,
            group_index: reader.u32(),
        })
    }
}

fn read_header(bytes: &[u8]) -> CodecResult<u32> {
    let header: [u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|raw| raw.try_into().ok())
        .ok_or(CodecError::Truncated(bytes.len()))?;
    Ok(u32::from_le_bytes(header))
}

/// Reads the command id from the header without decoding the payload.
///
/// `Ok(None)` means the id is not one this protocol recognises.
pub fn peek_command_id(bytes: &[u8]) -> CodecResult<Option<CommandId>> {
    read_header(bytes).map(CommandId::from_u32)
}

/// Decodes a full envelope. Unrecognised command ids yield `Ok(None)`.
pub fn decode(bytes: &[u8]) -> CodecResult<Option<Message>> {
    let Some(command) = peek_command_id(bytes)? else {
        return Ok(None);
    };
    let payload = &bytes[HEADER_LEN..];

    let message = match command {
        CommandId::Ack => Message::Ack(AckMessage::decode_payload(payload)?),
        CommandId::TagConfig => Message::TagConfig(TagConfig::decode_payload(payload)?),
        CommandId::StartDetection => {
            Message::StartDetection(StartDetection::decode_payload(payload)?)
        }
        CommandId::PulseTelemetry => {
            Message::PulseTelemetry(PulseTelemetry::decode_payload(payload)?)
        }
        CommandId::StopDetection | CommandId::StartTagsSession | CommandId::EndTagsSession => {
            FieldReader::new(command, payload)?;
            match command {
                CommandId::StopDetection => Message::StopDetection,
                CommandId::StartTagsSession => Message::StartTagsSession,
                _ => Message::EndTagsSession,
            }
        }
    };

    Ok(Some(message))
}

/// Encodes a message into a complete envelope.
pub fn encode(message: &Message) -> Vec<u8> {
    let command = message.command_id();
    let mut out = Vec::with_capacity(HEADER_LEN + command.payload_len());
    out.extend_from_slice(&command.as_u32().to_le_bytes());

    match message {
        Message::Ack(ack) => ack.encode_payload(&mut out),
        Message::TagConfig(tag) => tag.encode_payload(&mut out),
        Message::StartDetection(start) => start.encode_payload(&mut out),
        Message::PulseTelemetry(pulse) => pulse.encode_payload(&mut out),
        Message::StopDetection | Message::StartTagsSession | Message::EndTagsSession => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tag() -> TagConfig {
        TagConfig {
            id: 7,
            frequency_hz: 150_000_000,
            pulse_width_ms: 20,
            intra_pulse1_ms: 500,
            intra_pulse2_ms: 520,
            intra_pulse_uncertainty_ms: 10,
            intra_pulse_jitter_ms: 2,
            matched_filter_length: 4,
            false_alarm_probability: 0.01,
            max_pulse_magnitude: 120.0,
        }
    }

    #[test]
    fn encoded_lengths_match_schema() {
        assert_eq!(encode(&Message::TagConfig(sample_tag())).len(), 44);
        assert_eq!(encode(&Message::StopDetection).len(), 4);
        let ack = AckMessage::new(CommandId::StopDetection, true);
        assert_eq!(encode(&Message::Ack(ack)).len(), 12);
    }

    #[test]
    fn header_is_little_endian_command_id() {
        let bytes = encode(&Message::StartDetection(StartDetection {
            requested_tag_id: 7,
        }));
        assert_eq!(&bytes[..4], &[3, 0, 0, 0]);
        assert_eq!(&bytes[4..], &[7, 0, 0, 0]);
        assert_eq!(
            peek_command_id(&bytes).unwrap(),
            Some(CommandId::StartDetection)
        );
    }

    #[test]
    fn tag_config_survives_encoding() {
        let message = Message::TagConfig(sample_tag());
        assert_eq!(decode(&encode(&message)).unwrap(), Some(message));
    }

    #[test]
    fn unknown_command_is_not_an_error() {
        let bytes = 42u32.to_le_bytes();
        assert_eq!(peek_command_id(&bytes).unwrap(), None);
        assert_eq!(decode(&bytes).unwrap(), None);
    }

    #[test]
    fn short_header_is_truncated() {
        assert_eq!(decode(&[2, 0]), Err(CodecError::Truncated(2)));
    }

    #[test]
    fn undersized_payload_is_rejected() {
        let mut bytes = encode(&Message::TagConfig(sample_tag()));
        bytes.truncate(20);
        assert_eq!(
            decode(&bytes),
            Err(CodecError::Length {
                command: 2,
                expected: 40,
                actual: 16,
            })
        );
    }

    #[test]
    fn trailing_bytes_on_empty_command_are_rejected() {
        let mut bytes = encode(&Message::StopDetection);
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(CodecError::Length { .. })));
    }

    #[test]
    fn confirmed_flag_must_be_boolean() {
        let pulse = PulseTelemetry::new(&sample_tag(), 1.0, 50.0, true);
        let mut bytes = encode(&Message::PulseTelemetry(pulse));
        bytes[HEADER_LEN + 24] = 2;
        assert!(matches!(decode(&bytes), Err(CodecError::InvalidField(_))));
    }
}
