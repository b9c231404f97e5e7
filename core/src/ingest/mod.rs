pub mod udp;

pub use udp::{default_bind_address, IngestError, StopHandle, UdpPulseReceiver, UDP_PULSE_PORT};
