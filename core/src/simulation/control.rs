use crate::protocol::TagConfig;
use tokio::sync::watch;

/// Snapshot of what the session handler wants the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionControl {
    pub armed: bool,
    pub tag: TagConfig,
    /// Bumped on every arm so pulse reports can be tied to one session.
    pub generation: u64,
}

/// Session-handler side of the control channel.
pub struct PulseControl {
    tx: watch::Sender<DetectionControl>,
}

impl PulseControl {
    pub fn start_pulses(&self, tag: TagConfig) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|control| {
            control.armed = true;
            control.tag = tag;
            control.generation += 1;
            generation = control.generation;
        });
        generation
    }

    pub fn stop_pulses(&self) {
        self.tx.send_modify(|control| {
            control.armed = false;
            control.tag = control.tag.cleared();
        });
    }

    /// Replaces the tag without touching the armed state.
    pub fn update_tag(&self, tag: TagConfig) {
        self.tx.send_modify(|control| control.tag = tag);
    }
}

pub fn control_channel() -> (PulseControl, watch::Receiver<DetectionControl>) {
    let (tx, rx) = watch::channel(DetectionControl::default());
    (PulseControl { tx }, rx)
}
