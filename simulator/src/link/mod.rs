pub mod udp;

pub use udp::UdpVehicleLink;
