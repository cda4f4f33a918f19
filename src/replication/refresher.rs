use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::with_timeout;
use super::MasterClient;
use crate::storage::ConfigSnapshot;
use crate::storage::VersionedStore;
use crate::CommitError;
use crate::ReplicationConfig;
use crate::Result;

/// Slave-side loop keeping the local store in line with the master.
pub struct SlaveRefresher {
    store: Arc<VersionedStore>,
    client: Arc<dyn MasterClient>,
    master_url: String,
    settings: ReplicationConfig,
}

impl SlaveRefresher {
    pub fn new(
        store: Arc<VersionedStore>,
        client: Arc<dyn MasterClient>,
        master_url: impl Into<String>,
        settings: ReplicationConfig,
    ) -> Self {
        Self {
            store,
            client,
            master_url: master_url.into(),
            settings,
        }
    }

    /// Announces this slave, then installs the master's snapshot when its
    /// version differs from ours. Returns whether a snapshot was installed.
    pub async fn refresh_once(&self) -> Result<bool> {
        let master = self.master_url.as_str();
        let timeout = self.settings.ping_timeout();

        // Best effort
        if let Err(e) = with_timeout(master, timeout, self.client.publish_slave(master, self.store.url())).await {
            warn!("could not announce {} to {}: {}", self.store.url(), master, e);
        }

        let remote_version = with_timeout(master, timeout, self.client.get_version(master)).await?;
        if remote_version == self.store.version() {
            debug!("already at master version {}", remote_version);
            return Ok(false);
        }

        let buf = with_timeout(master, timeout, self.client.fetch(master)).await?;
        let snapshot = ConfigSnapshot::from_compressed(&buf)?;
        if snapshot.name() != self.store.name() {
            return Err(CommitError::NameMismatch {
                local: self.store.name().to_string(),
                remote: snapshot.name().to_string(),
            }
            .into());
        }
        Ok(self.store.install(snapshot))
    }

    /// Refreshes periodically until `shutdown` fires.
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        info!("refreshing from master {}", self.master_url);
        loop {
            if let Err(e) = self.refresh_once().await {
                warn!("refresh from {} failed: {}", self.master_url, e);
            }
            tokio::select! {
                _ = tokio::time::sleep(self.next_delay()) => {}
                _ = shutdown.changed() => {
                    info!("slave refresher stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Refresh interval plus a random jitter
    fn next_delay(&self) -> Duration {
        let jitter = match self.settings.refresh_jitter_in_ms {
            0 => 0,
            max => rand::thread_rng().gen_range(0..=max),
        };
        self.settings.refresh_interval() + Duration::from_millis(jitter)
    }
}
