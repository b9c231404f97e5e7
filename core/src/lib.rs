//! Payload-side core of the radio-tag tracking ground-test harness.
//!
//! The crate speaks the payload command protocol over an abstract vehicle
//! link, keeps the detection session state, and synthesises pulse telemetry
//! from the vehicle's heading and altitude.

pub mod ingest;
pub mod link;
pub mod prelude;
pub mod protocol;
pub mod scheduler;
pub mod session;
pub mod simulation;
pub mod telemetry;

pub use link::VehicleLink;
pub use prelude::{CodecError, LinkError, PulseSource};
pub use session::{CommandHandler, SessionPhase};
pub use simulation::PulseSimulator;
