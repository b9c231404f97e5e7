use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tagsimcore::scheduler::SchedulerHandle;
use tagsimcore::simulation::{Attitude, Position, TelemetryPublisher};

/// Synthetic vehicle motion standing in for autopilot telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    /// Yaw sweep rate; the vehicle spins in place so every bearing is visited.
    pub yaw_rate_deg_s: f64,
    pub initial_yaw_deg: f64,
    pub update_ms: u64,
    /// Peak altitude jitter in meters.
    pub altitude_noise_m: f64,
    pub seed: u64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            latitude_deg: 32.2319,
            longitude_deg: -110.9501,
            altitude_m: 100.0,
            yaw_rate_deg_s: 10.0,
            initial_yaw_deg: 0.0,
            update_ms: 100,
            altitude_noise_m: 0.5,
            seed: 0,
        }
    }
}

pub struct FlightProfile {
    config: FlightConfig,
    rng: StdRng,
    yaw_deg: f64,
}

/// Wraps into the autopilot's `[-180, 180)` yaw convention.
fn wrap_yaw(yaw_deg: f64) -> f64 {
    (yaw_deg + 180.0).rem_euclid(360.0) - 180.0
}

impl FlightProfile {
    pub fn new(config: FlightConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            yaw_deg: wrap_yaw(config.initial_yaw_deg),
            config,
        }
    }

    /// Advances the profile by `dt` seconds and returns the new sample.
    pub fn step(&mut self, dt: f64) -> (Position, Attitude) {
        self.yaw_deg = wrap_yaw(self.yaw_deg + self.config.yaw_rate_deg_s * dt);

        let noise = self.config.altitude_noise_m.abs();
        let jitter = if noise > 0.0 {
            self.rng.gen_range(-noise..noise)
        } else {
            0.0
        };

        (
            Position {
                latitude_deg: self.config.latitude_deg,
                longitude_deg: self.config.longitude_deg,
                relative_altitude_m: self.config.altitude_m + jitter,
            },
            Attitude {
                yaw_deg: self.yaw_deg,
            },
        )
    }

    /// Publishes samples at the configured period until the scheduler stops.
    pub fn spawn(mut self, publisher: TelemetryPublisher, stop: SchedulerHandle) -> JoinHandle<()> {
        let period = Duration::from_millis(self.config.update_ms.max(1));
        thread::spawn(move || loop {
            let (position, attitude) = self.step(period.as_secs_f64());
            publisher.on_position_update(
                position.latitude_deg,
                position.longitude_deg,
                position.relative_altitude_m,
            );
            publisher.on_attitude_update(attitude.yaw_deg);
            debug!(
                "flight yaw {:.1} alt {:.2}",
                attitude.yaw_deg, position.relative_altitude_m
            );
            if !stop.wait(period) {
                break;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagsimcore::simulation::telemetry_channel;

    #[test]
    fn yaw_wraps_into_autopilot_range() {
        assert_eq!(wrap_yaw(190.0), -170.0);
        assert_eq!(wrap_yaw(-190.0), 170.0);
        assert_eq!(wrap_yaw(45.0), 45.0);
    }

    #[test]
    fn profile_sweeps_yaw_at_configured_rate() {
        let mut profile = FlightProfile::new(FlightConfig {
            yaw_rate_deg_s: 90.0,
            altitude_noise_m: 0.0,
            ..Default::default()
        });
        let (_, first) = profile.step(0.5);
        let (position, second) = profile.step(0.5);
        assert_eq!(first.yaw_deg, 45.0);
        assert_eq!(second.yaw_deg, 90.0);
        assert_eq!(position.relative_altitude_m, 100.0);
    }

    #[test]
    fn seeded_noise_is_repeatable_and_bounded() {
        let config = FlightConfig {
            seed: 42,
            altitude_noise_m: 2.0,
            ..Default::default()
        };
        let mut a = FlightProfile::new(config.clone());
        let mut b = FlightProfile::new(config);
        for _ in 0..20 {
            let (pa, _) = a.step(0.1);
            let (pb, _) = b.step(0.1);
            assert_eq!(pa, pb);
            assert!((pa.relative_altitude_m - 100.0).abs() <= 2.0);
        }
    }

    #[test]
    fn spawned_profile_feeds_telemetry_until_stopped() {
        let (publisher, telemetry) = telemetry_channel();
        let stop = SchedulerHandle::default();
        let worker = FlightProfile::new(FlightConfig::default()).spawn(publisher, stop.clone());

        thread::sleep(Duration::from_millis(50));
        stop.stop();
        worker.join().unwrap();
        assert!(telemetry.snapshot().is_known());
    }
}
