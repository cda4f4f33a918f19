use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::tree::validate_name;
use crate::Error;
use crate::Result;

/// Identity and role of a configuration server
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Name of the configuration this server serves; every commit must
    /// carry the same name
    ///
    /// Default: `default_name()` (Default)
    #[serde(default = "default_name")]
    pub name: String,

    /// URL peers use to reach this server
    #[serde(default = "default_url")]
    pub url: String,

    /// Only the master accepts commits
    #[serde(default = "default_is_master")]
    pub is_master: bool,

    /// Master URL, used by slaves to register and refresh
    #[serde(default = "default_url")]
    pub master_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            url: default_url(),
            is_master: default_is_master(),
            master_url: default_url(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if let Err(reason) = validate_name(&self.name) {
            return Err(Error::Config(ConfigError::Message(format!(
                "server.name {:?} is not usable: {}",
                self.name, reason
            ))));
        }
        if self.url.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("server.url cannot be empty".into())));
        }
        if !self.is_master && self.master_url.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "server.master_url is required on slaves".into(),
            )));
        }
        if !self.is_master && self.master_url == self.url {
            return Err(Error::Config(ConfigError::Message(
                "a slave cannot use its own url as master_url".into(),
            )));
        }
        Ok(())
    }
}

fn default_name() -> String {
    "Default".to_string()
}
fn default_url() -> String {
    "dips://localhost:9135/Configuration/Server".to_string()
}
fn default_is_master() -> bool {
    true
}
