use crate::generator::flight::FlightConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tagsimcore::ingest::default_bind_address;
use tagsimcore::simulation::SimulatorConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Local address the payload listens on for ground-station envelopes.
    pub bind: SocketAddr,
    /// Initial ground-station address; replaced by the sender of the first inbound envelope.
    pub ground_station: SocketAddr,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 14560)),
            ground_station: SocketAddr::from(([127, 0, 0, 1], 14550)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpPulseConfig {
    pub bind: SocketAddr,
}

impl Default for UdpPulseConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub bind: SocketAddr,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub link: LinkConfig,
    pub simulation: SimulatorConfig,
    pub udp_pulse: UdpPulseConfig,
    pub flight: FlightConfig,
    pub status: StatusConfig,
}

impl HarnessConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading harness config {}", path_ref.display()))?;
        let config: HarnessConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing harness config {}", path_ref.display()))?;
        Ok(config)
    }
}
