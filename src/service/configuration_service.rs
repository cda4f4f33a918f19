use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::ServiceFailure;
use super::ServiceRequest;
use super::ServiceResponse;
use crate::commit::CommitOutcome;
use crate::commit::CommitProtocol;
use crate::constants::CONFIGURATION_SERVER_ROLE;
use crate::replication::PingInfo;
use crate::replication::ReplicationController;
use crate::storage::VersionedStore;
use crate::CommitConfig;
use crate::Error;
use crate::Result;

pub struct ConfigurationService {
    protocol: Arc<CommitProtocol>,
    controller: Arc<ReplicationController>,
    settings: CommitConfig,
}

impl ConfigurationService {
    pub fn new(
        protocol: Arc<CommitProtocol>,
        controller: Arc<ReplicationController>,
        settings: CommitConfig,
    ) -> Self {
        Self {
            protocol,
            controller,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<VersionedStore> {
        self.protocol.store()
    }

    pub async fn handle(
        &self,
        request: ServiceRequest,
    ) -> std::result::Result<ServiceResponse, ServiceFailure> {
        let name = request.name();
        debug!("handling {}", name);
        self.dispatch(request).await.map_err(|e| {
            warn!("{} failed: {}", name, e);
            ServiceFailure::from(e)
        })
    }

    async fn dispatch(
        &self,
        request: ServiceRequest,
    ) -> Result<ServiceResponse> {
        match request {
            ServiceRequest::Commit(commit) => {
                let protocol = self.protocol.clone();
                let outcome = run_blocking(move || protocol.commit(commit)).await?;
                self.after_commit(&outcome).await;
                Ok(ServiceResponse::Committed(outcome))
            }
            ServiceRequest::Fetch => {
                let snapshot = self.store().snapshot();
                Ok(ServiceResponse::Snapshot {
                    version: snapshot.version().to_string(),
                    buffer: snapshot.compressed()?,
                })
            }
            ServiceRequest::GetVersion => Ok(ServiceResponse::Version(self.store().version())),
            ServiceRequest::Ping => Ok(ServiceResponse::Pong(PingInfo {
                name: CONFIGURATION_SERVER_ROLE.to_string(),
                version: self.store().version(),
            })),
            ServiceRequest::PublishSlave { url } => {
                self.controller.register_slave(&url).await;
                Ok(ServiceResponse::SlavePublished)
            }
            ServiceRequest::CommitHistory { limit } => {
                Ok(ServiceResponse::History(self.protocol.commit_history(limit)?))
            }
            ServiceRequest::VersionContents { version } => {
                Ok(ServiceResponse::Contents(self.protocol.version_contents(&version)?))
            }
            ServiceRequest::Rollback { version, committer } => {
                let protocol = self.protocol.clone();
                let outcome =
                    run_blocking(move || protocol.rollback_to_version(&version, committer.as_deref())).await?;
                self.after_commit(&outcome).await;
                Ok(ServiceResponse::Committed(outcome))
            }
        }
    }

    async fn after_commit(
        &self,
        outcome: &CommitOutcome,
    ) {
        if self.settings.auto_slave_sync {
            let refreshed = self.controller.force_slaves_update().await;
            debug!("version {} pushed to {} slave(s)", outcome.version, refreshed);
        }
    }
}

/// Tree comparison and backup I/O stay off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Fatal(format!("commit task failed: {}", e)))?
}
