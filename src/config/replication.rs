use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Master/slave liveness and propagation timings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplicationConfig {
    /// Slaves silent for longer than this are dropped by the sweep
    #[serde(default = "default_slave_grace_time_in_secs")]
    pub slave_grace_time_in_secs: u64,

    /// Bound on a single ping round-trip
    #[serde(default = "default_ping_timeout_in_ms")]
    pub ping_timeout_in_ms: u64,

    /// Period of the master's liveness sweep
    #[serde(default = "default_sweep_interval_in_secs")]
    pub sweep_interval_in_secs: u64,

    /// Period of the slave's refresh from the master
    #[serde(default = "default_refresh_interval_in_secs")]
    pub refresh_interval_in_secs: u64,

    /// Upper bound of the random delay added to every refresh period
    #[serde(default = "default_refresh_jitter_in_ms")]
    pub refresh_jitter_in_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            slave_grace_time_in_secs: default_slave_grace_time_in_secs(),
            ping_timeout_in_ms: default_ping_timeout_in_ms(),
            sweep_interval_in_secs: default_sweep_interval_in_secs(),
            refresh_interval_in_secs: default_refresh_interval_in_secs(),
            refresh_jitter_in_ms: default_refresh_jitter_in_ms(),
        }
    }
}

impl ReplicationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ping_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "ping_timeout_in_ms must be > 0".into(),
            )));
        }
        if self.sweep_interval_in_secs == 0 || self.refresh_interval_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "sweep and refresh intervals must be > 0".into(),
            )));
        }
        if self.slave_grace_time_in_secs < self.sweep_interval_in_secs {
            return Err(Error::Config(ConfigError::Message(format!(
                "slave_grace_time_in_secs ({}) must be >= sweep_interval_in_secs ({})",
                self.slave_grace_time_in_secs, self.sweep_interval_in_secs
            ))));
        }
        Ok(())
    }

    pub fn grace_time(&self) -> Duration {
        Duration::from_secs(self.slave_grace_time_in_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_in_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_in_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_in_secs)
    }
}

fn default_slave_grace_time_in_secs() -> u64 {
    600
}
fn default_ping_timeout_in_ms() -> u64 {
    10_000
}
fn default_sweep_interval_in_secs() -> u64 {
    60
}
fn default_refresh_interval_in_secs() -> u64 {
    300
}
fn default_refresh_jitter_in_ms() -> u64 {
    5_000
}
