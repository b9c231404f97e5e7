use std::time::Duration;

/// Errors raised while framing or parsing envelopes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("envelope too short: {0} bytes")]
    Truncated(usize),
    #[error("command {command} expects {expected} payload bytes, got {actual}")]
    Length {
        command: u32,
        expected: usize,
        actual: usize,
    },
    #[error("invalid field value: {0}")]
    InvalidField(String),
}

/// Errors raised by a vehicle link while sending.
#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    #[error("link closed")]
    Closed,
    #[error("link i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// A source of pulses driven by the foreground scheduler.
///
/// Each call performs one unit of work and reports how long the caller
/// should wait before the next call.
pub trait PulseSource {
    fn next_pulse(&mut self) -> Duration;

    /// Whether the source has been shut down and the loop should exit.
    fn finished(&self) -> bool {
        false
    }
}
