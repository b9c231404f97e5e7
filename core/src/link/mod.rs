//! Seam between the payload core and whatever carries envelopes to the
//! ground station.

use crate::prelude::LinkError;
use std::sync::Mutex;

/// Outbound half of the vehicle link.
///
/// Inbound envelopes and telemetry are pushed into the core by the link
/// owner (see [`crate::session::CommandHandler::handle_envelope`] and
/// [`crate::simulation::TelemetryPublisher`]).
pub trait VehicleLink: Send + Sync {
    fn send(&self, envelope: &[u8]) -> Result<(), LinkError>;
}

/// Link that keeps every sent envelope in memory.
#[derive(Default)]
pub struct RecordingLink {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the envelopes sent so far.
    pub fn take(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VehicleLink for RecordingLink {
    fn send(&self, envelope: &[u8]) -> Result<(), LinkError> {
        self.sent
            .lock()
            .map_err(|_| LinkError::Closed)?
            .push(envelope.to_vec());
        Ok(())
    }
}
