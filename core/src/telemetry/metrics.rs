use serde::Serialize;
use std::sync::Mutex;

/// Shared counters for protocol and pulse activity.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub acks_sent: usize,
    pub command_failures: usize,
    pub frames_dropped: usize,
    pub pulses_emitted: usize,
    pub bytes_ingested: usize,
    pub send_errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_ack(&self, success: bool) {
        self.update(|m| {
            m.acks_sent += 1;
            if !success {
                m.command_failures += 1;
            }
        });
    }

    pub fn record_dropped_frame(&self) {
        self.update(|m| m.frames_dropped += 1);
    }

    pub fn record_pulse(&self) {
        self.update(|m| m.pulses_emitted += 1);
    }

    pub fn record_ingested(&self, bytes: usize) {
        self.update(|m| m.bytes_ingested += bytes);
    }

    pub fn record_send_error(&self) {
        self.update(|m| m.send_errors += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
