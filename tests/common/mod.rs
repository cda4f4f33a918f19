use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use d_config::CommitOutcome;
use d_config::CommitRequest;
use d_config::ConfigSnapshot;
use d_config::ConfigTree;
use d_config::MasterClient;
use d_config::NetworkError;
use d_config::Node;
use d_config::NodeBuilder;
use d_config::PingInfo;
use d_config::Result;
use d_config::ServiceFailure;
use d_config::ServiceRequest;
use d_config::ServiceResponse;
use d_config::ServiceSettings;
use d_config::SlaveClient;
use parking_lot::RwLock;
use tempfile::TempDir;
use tokio::sync::watch;

pub const CONFIG_NAME: &str = "Production";
pub const MASTER_URL: &str = "dips://master:9135/Configuration/Server";

pub fn slave_url(i: usize) -> String {
    format!("dips://slave-{}:9135/Configuration/Server", i)
}

/// Routes RPCs straight into the target node's service.
#[derive(Default)]
pub struct InProcessTransport {
    nodes: RwLock<HashMap<String, Arc<Node>>>,
}

impl InProcessTransport {
    pub fn attach(
        &self,
        node: Arc<Node>,
    ) {
        self.nodes.write().insert(node.store().url().to_string(), node);
    }

    pub fn detach(
        &self,
        url: &str,
    ) {
        self.nodes.write().remove(url);
    }

    fn node(
        &self,
        url: &str,
    ) -> Result<Arc<Node>> {
        self.nodes.read().get(url).cloned().ok_or_else(|| {
            NetworkError::Unreachable {
                url: url.to_string(),
                reason: "no such node".to_string(),
            }
            .into()
        })
    }

    async fn call(
        &self,
        url: &str,
        request: ServiceRequest,
    ) -> Result<ServiceResponse> {
        let node = self.node(url)?;
        node.handle(request).await.map_err(|failure| {
            NetworkError::Unreachable {
                url: url.to_string(),
                reason: failure.message,
            }
            .into()
        })
    }
}

fn unexpected(
    url: &str,
    response: ServiceResponse,
) -> d_config::Error {
    NetworkError::Unreachable {
        url: url.to_string(),
        reason: format!("unexpected response {:?}", response),
    }
    .into()
}

#[async_trait]
impl SlaveClient for InProcessTransport {
    async fn ping(
        &self,
        url: &str,
    ) -> Result<PingInfo> {
        match self.call(url, ServiceRequest::Ping).await? {
            ServiceResponse::Pong(info) => Ok(info),
            other => Err(unexpected(url, other)),
        }
    }

    async fn request_refresh(
        &self,
        url: &str,
    ) -> Result<()> {
        self.node(url)?.refresh().await.map(|_| ())
    }
}

#[async_trait]
impl MasterClient for InProcessTransport {
    async fn get_version(
        &self,
        master_url: &str,
    ) -> Result<String> {
        match self.call(master_url, ServiceRequest::GetVersion).await? {
            ServiceResponse::Version(version) => Ok(version),
            other => Err(unexpected(master_url, other)),
        }
    }

    async fn fetch(
        &self,
        master_url: &str,
    ) -> Result<Vec<u8>> {
        match self.call(master_url, ServiceRequest::Fetch).await? {
            ServiceResponse::Snapshot { buffer, .. } => Ok(buffer),
            other => Err(unexpected(master_url, other)),
        }
    }

    async fn publish_slave(
        &self,
        master_url: &str,
        slave_url: &str,
    ) -> Result<()> {
        self.call(
            master_url,
            ServiceRequest::PublishSlave {
                url: slave_url.to_string(),
            },
        )
        .await
        .map(|_| ())
    }
}

pub struct Cluster {
    pub dir: TempDir,
    pub transport: Arc<InProcessTransport>,
    pub master: Arc<Node>,
    pub slaves: Vec<Arc<Node>>,
    pub shutdown_tx: watch::Sender<()>,
}

pub fn settings(
    dir: &TempDir,
    url: &str,
    auto_merge: bool,
) -> ServiceSettings {
    let mut settings = ServiceSettings::default();
    settings.server.name = CONFIG_NAME.to_string();
    settings.server.url = url.to_string();
    settings.server.is_master = url == MASTER_URL;
    settings.server.master_url = MASTER_URL.to_string();
    settings.commit.auto_merge = auto_merge;
    settings.storage.backup_dir = dir.path().join(url.replace([':', '/'], "_"));
    settings
}

pub fn build_node(
    settings: ServiceSettings,
    transport: &Arc<InProcessTransport>,
    shutdown_rx: watch::Receiver<()>,
) -> Arc<Node> {
    let node = NodeBuilder::init(settings, shutdown_rx)
        .slave_client(transport.clone())
        .master_client(transport.clone())
        .build()
        .unwrap()
        .ready()
        .unwrap();
    transport.attach(node.clone());
    node
}

/// Master plus `slave_count` slaves, wired in process. Nothing runs until
/// a test drives it.
pub fn start_cluster(
    slave_count: usize,
    auto_merge: bool,
) -> Cluster {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(InProcessTransport::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let master = build_node(settings(&dir, MASTER_URL, auto_merge), &transport, shutdown_rx.clone());
    let slaves = (0..slave_count)
        .map(|i| build_node(settings(&dir, &slave_url(i), auto_merge), &transport, shutdown_rx.clone()))
        .collect();

    Cluster {
        dir,
        transport,
        master,
        slaves,
        shutdown_tx,
    }
}

/// Working copy of whatever `node` currently serves
pub fn checkout(node: &Node) -> ConfigTree {
    node.store().snapshot().tree().clone()
}

pub async fn commit(
    master: &Node,
    tree: &ConfigTree,
    committer: &str,
) -> std::result::Result<CommitOutcome, ServiceFailure> {
    let request = CommitRequest {
        buffer: ConfigSnapshot::new(tree.clone()).compressed().unwrap(),
        committer: Some(committer.to_string()),
        force_version: false,
    };
    match master.handle(ServiceRequest::Commit(request)).await? {
        ServiceResponse::Committed(outcome) => Ok(outcome),
        other => panic!("unexpected response {:?}", other),
    }
}
