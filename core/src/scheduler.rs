//! Foreground loop that drives a [`PulseSource`] and sleeps for the
//! interval the source asks for.

use crate::prelude::PulseSource;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Requests the scheduler loop to exit, interrupting any sleep in progress.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    signal: Arc<StopSignal>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        let mut stopped = self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.signal.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `interval` unless stopped first. Returns `false` once stopped.
    pub fn wait(&self, interval: Duration) -> bool {
        let stopped = self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .signal
            .wake
            .wait_timeout_while(stopped, interval, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        !*stopped
    }

    /// Blocks the calling thread until [`stop`](Self::stop) is called.
    pub fn wait_until_stopped(&self) {
        let stopped = self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _stopped = self
            .signal
            .wake
            .wait_while(stopped, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

#[derive(Default)]
pub struct Scheduler {
    handle: SchedulerHandle,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Runs until stopped or the source reports it is finished.
    ///
    /// `after_tick` sees the source after every call, before the sleep.
    /// Returns the number of ticks performed.
    pub fn run<S, F>(&self, source: &mut S, mut after_tick: F) -> usize
    where
        S: PulseSource,
        F: FnMut(&S),
    {
        let mut ticks = 0;
        while !self.handle.is_stopped() && !source.finished() {
            let interval = source.next_pulse();
            ticks += 1;
            after_tick(source);
            if !self.handle.wait(interval) {
                break;
            }
        }
        ticks
    }
}
