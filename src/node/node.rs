//! A running configuration server.
//!
//! On the master, [`Node::run`] publishes the server list once, then sweeps
//! silent slaves periodically. On a slave it drives the refresher. Both
//! stop when the shutdown signal fires and flush the current version to
//! the backup archive.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::replication::ReplicationController;
use crate::replication::SlaveRefresher;
use crate::service::ConfigurationService;
use crate::service::ServiceFailure;
use crate::service::ServiceRequest;
use crate::service::ServiceResponse;
use crate::storage::BackupArchive;
use crate::storage::VersionedStore;
use crate::Result;
use crate::ServiceSettings;

/// Committer recorded on the backup written at shutdown
const SHUTDOWN_COMMITTER: &str = "shutdown";

pub struct Node {
    pub(crate) settings: Arc<ServiceSettings>,
    pub(crate) store: Arc<VersionedStore>,
    pub(crate) archive: Arc<dyn BackupArchive>,
    pub(crate) controller: Arc<ReplicationController>,
    pub(crate) refresher: Option<SlaveRefresher>,
    pub(crate) service: Arc<ConfigurationService>,
    pub(crate) ready: AtomicBool,
    pub(crate) shutdown_signal: watch::Receiver<()>,
}

impl Node {
    pub fn service(&self) -> Arc<ConfigurationService> {
        self.service.clone()
    }

    pub fn store(&self) -> &Arc<VersionedStore> {
        &self.store
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub async fn handle(
        &self,
        request: ServiceRequest,
    ) -> std::result::Result<ServiceResponse, ServiceFailure> {
        self.service.handle(request).await
    }

    /// Slave only: pulls the master's snapshot now. Returns whether a newer
    /// one was installed.
    pub async fn refresh(&self) -> Result<bool> {
        match &self.refresher {
            Some(refresher) => refresher.refresh_once().await,
            None => Ok(false),
        }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.refresher {
            None => self.run_master().await?,
            Some(refresher) => {
                self.set_ready(true);
                refresher.run(self.shutdown_signal.clone()).await?;
            }
        }
        self.set_ready(false);
        self.teardown();
        Ok(())
    }

    async fn run_master(&self) -> Result<()> {
        self.controller.initialize().await?;
        self.set_ready(true);
        info!("master {} serving version {}", self.store.url(), self.store.version());

        let mut shutdown = self.shutdown_signal.clone();
        let period = self.settings.replication.sweep_interval();
        let mut sweep = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = sweep.tick() => {
                    if let Err(e) = self.controller.check_slaves_status(false).await {
                        warn!("slave sweep failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("master loop stopped");
                    return Ok(());
                }
            }
        }
    }

    fn teardown(&self) {
        match self.store.flush(self.archive.as_ref(), SHUTDOWN_COMMITTER) {
            Ok(Some(path)) => info!("flushed current version to {:?}", path),
            Ok(None) => {}
            Err(e) => error!("could not flush version {}: {}", self.store.version(), e),
        }
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn server_is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
