//! Wire protocol spoken between the payload and the ground station.

pub mod codec;
pub mod command;
pub mod messages;
pub mod tag;

pub use codec::{decode, encode, peek_command_id, WirePayload, HEADER_LEN};
pub use command::CommandId;
pub use messages::{AckMessage, AckResult, Message, PulseTelemetry, StartDetection};
pub use tag::TagConfig;
