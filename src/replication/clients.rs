use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// What a peer says about itself when pinged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingInfo {
    /// Service role, [`CONFIGURATION_SERVER_ROLE`](crate::constants::CONFIGURATION_SERVER_ROLE)
    /// for configuration servers
    pub name: String,
    pub version: String,
}

/// Calls the master makes to its slaves.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SlaveClient: Send + Sync + 'static {
    async fn ping(
        &self,
        url: &str,
    ) -> Result<PingInfo>;

    /// Asks the slave to pull the current configuration now
    async fn request_refresh(
        &self,
        url: &str,
    ) -> Result<()>;
}

/// Calls a slave makes to its master.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MasterClient: Send + Sync + 'static {
    async fn get_version(
        &self,
        master_url: &str,
    ) -> Result<String>;

    /// Compressed current snapshot
    async fn fetch(
        &self,
        master_url: &str,
    ) -> Result<Vec<u8>>;

    async fn publish_slave(
        &self,
        master_url: &str,
        slave_url: &str,
    ) -> Result<()>;
}

/// Stand-in for a missing transport: every call fails as unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedPeers;

impl DisconnectedPeers {
    fn unreachable(url: &str) -> crate::Error {
        crate::NetworkError::Unreachable {
            url: url.to_string(),
            reason: "no transport configured".to_string(),
        }
        .into()
    }
}

#[async_trait]
impl SlaveClient for DisconnectedPeers {
    async fn ping(
        &self,
        url: &str,
    ) -> Result<PingInfo> {
        Err(Self::unreachable(url))
    }

    async fn request_refresh(
        &self,
        url: &str,
    ) -> Result<()> {
        Err(Self::unreachable(url))
    }
}

#[async_trait]
impl MasterClient for DisconnectedPeers {
    async fn get_version(
        &self,
        master_url: &str,
    ) -> Result<String> {
        Err(Self::unreachable(master_url))
    }

    async fn fetch(
        &self,
        master_url: &str,
    ) -> Result<Vec<u8>> {
        Err(Self::unreachable(master_url))
    }

    async fn publish_slave(
        &self,
        master_url: &str,
        _slave_url: &str,
    ) -> Result<()> {
        Err(Self::unreachable(master_url))
    }
}
