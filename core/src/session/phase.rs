use serde::{Deserialize, Serialize};

/// Where the payload is in its command session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    ReceivingTags,
    TagsReady,
    Armed,
    Detecting,
}

impl SessionPhase {
    pub fn detection_running(self) -> bool {
        matches!(self, Self::Armed | Self::Detecting)
    }

    pub fn tags_session_open(self) -> bool {
        self == Self::ReceivingTags
    }
}
