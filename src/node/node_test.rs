use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::constants::CONFIGURATION_SERVER_ROLE;
use crate::constants::SERVERS_OPTION;
use crate::replication::MockMasterClient;
use crate::replication::MockSlaveClient;
use crate::replication::PingInfo;
use crate::service::ServiceRequest;
use crate::service::ServiceResponse;
use crate::storage::BackupArchive;
use crate::test_utils::slave_config;
use crate::test_utils::snapshot_at;
use crate::test_utils::MASTER_URL;
use crate::test_utils::TEST_NAME;
use crate::Node;
use crate::NodeBuilder;
use crate::ServiceSettings;

const SLAVE: &str = "dips://slave:9135/Configuration/Server";

fn master_settings(backup_dir: &Path) -> ServiceSettings {
    let mut settings = ServiceSettings::default();
    settings.server.name = TEST_NAME.to_string();
    settings.server.url = MASTER_URL.to_string();
    settings.storage.backup_dir = backup_dir.to_path_buf();
    settings.replication.slave_grace_time_in_secs = 600;
    settings.replication.sweep_interval_in_secs = 60;
    settings
}

async fn wait_until_ready(node: &Node) {
    while !node.server_is_ready() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_master_publishes_itself_and_flushes_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = NodeBuilder::init(master_settings(dir.path()), shutdown_rx)
        .build()
        .unwrap()
        .ready()
        .unwrap();

    let handle = tokio::spawn({
        let node = node.clone();
        async move { node.run().await }
    });
    wait_until_ready(&node).await;

    let snapshot = node.store().snapshot();
    assert!(snapshot.is_initialized());
    assert_eq!(snapshot.tree().get_option(SERVERS_OPTION).ok(), Some(MASTER_URL));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(!node.server_is_ready());
    assert!(node
        .archive
        .find_version(TEST_NAME, &node.store().version())
        .unwrap()
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_master_sweeps_silent_slaves() {
    let dir = tempfile::tempdir().unwrap();
    let mut client = MockSlaveClient::new();
    client.expect_ping().returning(|_| {
        Ok(PingInfo {
            name: CONFIGURATION_SERVER_ROLE.to_string(),
            version: String::new(),
        })
    });
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = NodeBuilder::init(master_settings(dir.path()), shutdown_rx)
        .slave_client(Arc::new(client))
        .build()
        .unwrap()
        .ready()
        .unwrap();
    let handle = tokio::spawn({
        let node = node.clone();
        async move { node.run().await }
    });
    wait_until_ready(&node).await;

    let response = node
        .handle(ServiceRequest::PublishSlave { url: SLAVE.to_string() })
        .await
        .unwrap();
    assert_eq!(response, ServiceResponse::SlavePublished);
    assert_eq!(node.controller.slave_urls(), vec![SLAVE.to_string()]);

    tokio::time::sleep(Duration::from_secs(700)).await;

    assert!(node.controller.slave_urls().is_empty());
    let servers = node.store().snapshot().tree().get_option(SERVERS_OPTION).ok().map(str::to_string);
    assert_eq!(servers.as_deref(), Some(MASTER_URL));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slave_pulls_master_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let master_version = "2026-10-18 10:00:00.000000";
    let mut client = MockMasterClient::new();
    client.expect_publish_slave().returning(|_, _| Ok(()));
    client
        .expect_get_version()
        .returning(move |_| Ok(master_version.to_string()));
    client.expect_fetch().returning(move |_| {
        Ok(snapshot_at(&[("/DIRAC/Setup", "Production")], master_version)
            .compressed()
            .unwrap())
    });

    let mut settings = master_settings(dir.path());
    settings.server = slave_config(SLAVE);
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = NodeBuilder::init(settings, shutdown_rx)
        .master_client(Arc::new(client))
        .build()
        .unwrap()
        .ready()
        .unwrap();
    let handle = tokio::spawn({
        let node = node.clone();
        async move { node.run().await }
    });
    wait_until_ready(&node).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(node.store().version(), master_version);
    let err = node
        .handle(ServiceRequest::Commit(Default::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, crate::FailureKind::NotMaster);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
