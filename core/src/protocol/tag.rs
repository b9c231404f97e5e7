use serde::{Deserialize, Serialize};

/// Pulse signature of the RF tag being tracked.
///
/// An `id` of zero marks the configuration as absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TagConfig {
    pub id: u32,
    pub frequency_hz: u32,
    pub pulse_width_ms: u32,
    pub intra_pulse1_ms: u32,
    pub intra_pulse2_ms: u32,
    pub intra_pulse_uncertainty_ms: u32,
    pub intra_pulse_jitter_ms: u32,
    /// Matched filter length (k).
    pub matched_filter_length: u32,
    pub false_alarm_probability: f32,
    pub max_pulse_magnitude: f32,
}

impl TagConfig {
    pub fn is_configured(&self) -> bool {
        self.id != 0
    }

    /// Returns a copy with the id reset, which is how detection stop clears a tag.
    pub fn cleared(mut self) -> Self {
        self.id = 0;
        self
    }

    pub fn frequency_mhz(&self) -> f64 {
        f64::from(self.frequency_hz) / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tag_is_unconfigured() {
        assert!(!TagConfig::default().is_configured());
    }

    #[test]
    fn cleared_keeps_signature_but_drops_id() {
        let tag = TagConfig {
            id: 7,
            frequency_hz: 150_000_000,
            intra_pulse1_ms: 500,
            ..Default::default()
        };
        let cleared = tag.cleared();
        assert!(!cleared.is_configured());
        assert_eq!(cleared.intra_pulse1_ms, 500);
        assert_eq!(tag.frequency_mhz(), 150.0);
    }
}
