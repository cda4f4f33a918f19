use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::with_timeout;
use super::SlaveClient;
use crate::commit::persist_backup;
use crate::constants::CONFIGURATION_SERVER_ROLE;
use crate::constants::MASTER_SERVER_OPTION;
use crate::constants::SERVERS_OPTION;
use crate::storage::BackupArchive;
use crate::storage::ConfigSnapshot;
use crate::storage::VersionedStore;
use crate::ReplicationConfig;
use crate::Result;
use crate::REGISTERED_SLAVES;

/// Committer recorded on backups of server-list rewrites
const REPLICATION_COMMITTER: &str = "replication";

/// Master-side registry of slaves, keyed by URL, with the time each one
/// last announced itself.
///
/// Liveness is purely time based: a slave is dropped once it has not
/// announced itself for the grace period. Pings happen outside the store
/// lock; only the server-list rewrite goes through [`VersionedStore::update`].
pub struct ReplicationController {
    pub(crate) store: Arc<VersionedStore>,
    pub(crate) archive: Arc<dyn BackupArchive>,
    client: Arc<dyn SlaveClient>,
    pub(crate) slaves: DashMap<String, Instant>,
    settings: ReplicationConfig,
}

impl ReplicationController {
    pub fn new(
        store: Arc<VersionedStore>,
        archive: Arc<dyn BackupArchive>,
        client: Arc<dyn SlaveClient>,
        settings: ReplicationConfig,
    ) -> Self {
        Self {
            store,
            archive,
            client,
            slaves: DashMap::new(),
            settings,
        }
    }

    /// Records `url` as alive when it answers a ping as a configuration
    /// server. Unreachable or foreign peers are ignored without error.
    /// Returns whether the slave was accepted.
    pub async fn register_slave(
        &self,
        url: &str,
    ) -> bool {
        if !self.store.is_master() {
            debug!("ignoring slave {} on a non-master server", url);
            return false;
        }
        match with_timeout(url, self.settings.ping_timeout(), self.client.ping(url)).await {
            Ok(info) if info.name == CONFIGURATION_SERVER_ROLE => {}
            Ok(info) => {
                debug!("ignoring {}: it identifies itself as {}", url, info.name);
                return false;
            }
            Err(e) => {
                debug!("ignoring {}: {}", url, e);
                return false;
            }
        }

        let is_new = self.slaves.insert(url.to_string(), Instant::now()).is_none();
        REGISTERED_SLAVES.set(self.slaves.len() as i64);
        if is_new {
            info!("registered new slave {}", url);
            if let Err(e) = self.write_server_list().await {
                warn!("could not publish server list after registering {}: {}", url, e);
            }
        }
        true
    }

    /// Drops slaves silent for longer than the grace period. When any was
    /// dropped, or `force_write` is set, rewrites the server list with a
    /// version bump. Returns whether the list was rewritten.
    pub async fn check_slaves_status(
        &self,
        force_write: bool,
    ) -> Result<bool> {
        let grace = self.settings.grace_time();
        let now = Instant::now();
        let mut removed = Vec::new();
        self.slaves.retain(|url, last_seen| {
            let alive = now.duration_since(*last_seen) <= grace;
            if !alive {
                removed.push(url.clone());
            }
            alive
        });
        REGISTERED_SLAVES.set(self.slaves.len() as i64);

        if !removed.is_empty() {
            info!("dropping slaves silent for more than {:?}: {:?}", grace, removed);
        }
        if removed.is_empty() && !force_write {
            return Ok(false);
        }
        self.write_server_list().await?;
        Ok(true)
    }

    /// Master startup: publishes the server list unconditionally.
    pub async fn initialize(&self) -> Result<()> {
        self.check_slaves_status(true).await.map(|_| ())
    }

    /// Registered slave URLs, sorted
    pub fn slave_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.slaves.iter().map(|e| e.key().clone()).collect();
        urls.sort();
        urls
    }

    /// Asks every registered slave to refresh, concurrently. Failures are
    /// logged; returns how many slaves acknowledged.
    pub async fn force_slaves_update(&self) -> usize {
        let urls = self.slave_urls();
        let timeout = self.settings.ping_timeout();
        let results = join_all(urls.iter().map(|url| async move {
            (url, with_timeout(url, timeout, self.client.request_refresh(url)).await)
        }))
        .await;

        let mut refreshed = 0;
        for (url, result) in results {
            match result {
                Ok(()) => refreshed += 1,
                Err(e) => warn!("slave {} did not refresh: {}", url, e),
            }
        }
        debug!("{}/{} slave(s) refreshed", refreshed, urls.len());
        refreshed
    }

    /// Writes the master URL followed by the registered slaves into the
    /// server-list option, bumping the version.
    ///
    /// The registry is read under the store lock, so the last rewrite to
    /// publish always lists every registration that preceded it.
    async fn write_server_list(&self) -> Result<()> {
        let master = self.store.url().to_string();
        let mut servers = String::new();
        let published = self.store.update(|current| {
            let mut list = vec![master.clone()];
            list.extend(self.slave_urls());
            servers = list.join(", ");

            let mut tree = current.tree().clone();
            tree.set_option(SERVERS_OPTION, &servers)?;
            tree.set_option(MASTER_SERVER_OPTION, &master)?;
            Ok(tree)
        })?;
        info!("server list is now [{}] at version {}", servers, published.version());
        self.persist(published).await;
        Ok(())
    }

    /// Backup of a server-list rewrite, written off the async workers
    async fn persist(
        &self,
        published: Arc<ConfigSnapshot>,
    ) -> bool {
        let archive = self.archive.clone();
        let name = self.store.name().to_string();
        let task = tokio::task::spawn_blocking(move || {
            persist_backup(archive.as_ref(), &name, &published, REPLICATION_COMMITTER)
        });
        match task.await {
            Ok(persisted) => persisted,
            Err(e) => {
                error!("backup task for version {} failed: {}", self.store.version(), e);
                false
            }
        }
    }
}
