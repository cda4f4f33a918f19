//! Builder assembling a configuration server [`Node`].
//!
//! [`NodeBuilder`] wires settings, backup archive, RPC clients, the
//! versioned store, replication controller, commit protocol and request
//! service. Every component has a default; setters override them.
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let node = NodeBuilder::new(None, shutdown_rx)?
//!     .slave_client(my_transport.clone())
//!     .build()?
//!     .start_metrics_server(shutdown_tx.subscribe())
//!     .ready()?;
//! tokio::spawn(async move { node.run().await });
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use tracing::warn;

use super::Node;
use crate::commit::CommitProtocol;
use crate::metrics;
use crate::replication::DisconnectedPeers;
use crate::replication::MasterClient;
use crate::replication::ReplicationController;
use crate::replication::SlaveClient;
use crate::replication::SlaveRefresher;
use crate::service::ConfigurationService;
use crate::storage::BackupArchive;
use crate::storage::FileBackupArchive;
use crate::storage::VersionedStore;
use crate::Error;
use crate::Result;
use crate::ServiceSettings;

pub struct NodeBuilder {
    pub(super) settings: ServiceSettings,
    pub(super) archive: Option<Arc<dyn BackupArchive>>,
    pub(super) slave_client: Option<Arc<dyn SlaveClient>>,
    pub(super) master_client: Option<Arc<dyn MasterClient>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) node: Option<Arc<Node>>,
}

impl NodeBuilder {
    /// Loads and validates settings (defaults, `CONFIG_PATH`, environment),
    /// layering `config_path` on top when given.
    pub fn new(
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let mut settings = ServiceSettings::new()?;
        if let Some(p) = config_path {
            info!("with_override_config from: {}", p);
            settings = settings.with_override_config(p)?;
        }
        Ok(Self::init(settings.validate()?, shutdown_signal))
    }

    pub fn init(
        settings: ServiceSettings,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            settings,
            archive: None,
            slave_client: None,
            master_client: None,
            shutdown_signal,
            node: None,
        }
    }

    /// Replaces the file-based backup archive
    pub fn archive(
        mut self,
        archive: Arc<dyn BackupArchive>,
    ) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Transport used by the master to reach its slaves
    pub fn slave_client(
        mut self,
        client: Arc<dyn SlaveClient>,
    ) -> Self {
        self.slave_client = Some(client);
        self
    }

    /// Transport used by a slave to reach its master
    pub fn master_client(
        mut self,
        client: Arc<dyn MasterClient>,
    ) -> Self {
        self.master_client = Some(client);
        self
    }

    pub fn settings(
        mut self,
        settings: ServiceSettings,
    ) -> Self {
        self.settings = settings;
        self
    }

    /// Restores the store from the archive and assembles the node.
    pub fn build(mut self) -> Result<Self> {
        let settings = Arc::new(self.settings.clone());
        let is_master = settings.server.is_master;

        let archive = self.archive.take().unwrap_or_else(|| {
            Arc::new(FileBackupArchive::new(settings.storage.backup_dir.clone())) as Arc<dyn BackupArchive>
        });
        let store = Arc::new(VersionedStore::load(&settings.server, archive.as_ref())?);

        let slave_client = self.slave_client.take().unwrap_or_else(|| {
            if is_master {
                warn!("no slave transport configured, slaves cannot be reached");
            }
            Arc::new(DisconnectedPeers) as Arc<dyn SlaveClient>
        });
        let controller = Arc::new(ReplicationController::new(
            store.clone(),
            archive.clone(),
            slave_client,
            settings.replication.clone(),
        ));
        let protocol = Arc::new(CommitProtocol::new(
            store.clone(),
            archive.clone(),
            settings.commit.clone(),
        ));
        let service = Arc::new(ConfigurationService::new(
            protocol,
            controller.clone(),
            settings.commit.clone(),
        ));

        let refresher = if is_master {
            None
        } else {
            let client = self.master_client.take().unwrap_or_else(|| {
                warn!("no master transport configured, this slave will not refresh");
                Arc::new(DisconnectedPeers) as Arc<dyn MasterClient>
            });
            Some(SlaveRefresher::new(
                store.clone(),
                client,
                settings.server.master_url.clone(),
                settings.replication.clone(),
            ))
        };

        info!(
            "built {} node for configuration {} at version {}",
            if is_master { "master" } else { "slave" },
            store.name(),
            store.version()
        );
        self.node = Some(Arc::new(Node {
            settings,
            store,
            archive,
            controller,
            refresher,
            service,
            ready: AtomicBool::new(false),
            shutdown_signal: self.shutdown_signal.clone(),
        }));
        Ok(self)
    }

    /// Serves `/metrics` when enabled in the monitoring settings.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if self.settings.monitoring.prometheus_enabled {
            let port = self.settings.monitoring.prometheus_port;
            tokio::spawn(async move {
                metrics::start_server(port, shutdown_signal).await;
            });
        }
        self
    }

    /// Returns the built node.
    ///
    /// # Errors
    /// Returns `Error::Fatal` if `build()` has not run
    pub fn ready(self) -> Result<Arc<Node>> {
        self.node
            .ok_or_else(|| Error::Fatal("node was not built before ready()".to_string()))
    }
}
