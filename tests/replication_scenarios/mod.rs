use std::sync::Arc;
use std::time::Duration;

use d_config::constants::SERVERS_OPTION;
use d_config::Error;
use d_config::NetworkError;
use tokio::sync::watch;

use crate::common::build_node;
use crate::common::checkout;
use crate::common::commit;
use crate::common::settings;
use crate::common::start_cluster;
use crate::common::InProcessTransport;
use crate::common::MASTER_URL;

fn servers(node: &d_config::Node) -> String {
    node.store()
        .snapshot()
        .tree()
        .get_option(SERVERS_OPTION)
        .unwrap_or_default()
        .to_string()
}

#[tokio::test(start_paused = true)]
async fn test_silent_slave_is_dropped_after_grace_period() {
    let cluster = start_cluster(1, true);
    let master = cluster.master.clone();
    let running = tokio::spawn(async move { master.run().await });
    tokio::task::yield_now().await;

    let slave = &cluster.slaves[0];
    slave.refresh().await.unwrap();
    assert!(servers(&cluster.master).contains(slave.store().url()));

    // within the grace period the slave stays listed
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(servers(&cluster.master).contains(slave.store().url()));

    tokio::time::sleep(Duration::from_secs(400)).await;
    assert_eq!(servers(&cluster.master), MASTER_URL);

    cluster.shutdown_tx.send(()).unwrap();
    running.await.unwrap().unwrap();
    assert!(!cluster.master.server_is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_announcing_slave_stays_listed() {
    let cluster = start_cluster(1, true);
    let master = cluster.master.clone();
    let running = tokio::spawn(async move { master.run().await });
    tokio::task::yield_now().await;

    let slave = &cluster.slaves[0];
    for _ in 0..4 {
        slave.refresh().await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
    }
    assert!(servers(&cluster.master).contains(slave.store().url()));

    cluster.shutdown_tx.send(()).unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_slave_keeps_its_copy_when_master_is_unreachable() {
    let cluster = start_cluster(1, true);
    let mut tree = checkout(&cluster.master);
    tree.set_option("/DIRAC/Setup", "Production").unwrap();
    commit(&cluster.master, &tree, "admin").await.unwrap();

    let slave = &cluster.slaves[0];
    slave.refresh().await.unwrap();
    let before = slave.store().snapshot();

    cluster.transport.detach(MASTER_URL);
    let err = slave.refresh().await.unwrap_err();

    assert!(matches!(err, Error::Network(NetworkError::Unreachable { .. })), "{:?}", err);
    assert_eq!(slave.store().snapshot(), before);
}

#[tokio::test]
async fn test_master_restarts_from_newest_backup() {
    let cluster = start_cluster(0, true);
    let mut tree = checkout(&cluster.master);
    tree.set_option("/DIRAC/Setup", "Production").unwrap();
    let outcome = commit(&cluster.master, &tree, "admin").await.unwrap();

    let transport = Arc::new(InProcessTransport::default());
    let (_tx, rx) = watch::channel(());
    let restarted = build_node(settings(&cluster.dir, MASTER_URL, true), &transport, rx);

    assert_eq!(restarted.store().version(), outcome.version);
    assert_eq!(
        restarted.store().snapshot().tree().get_option("/DIRAC/Setup").ok(),
        Some("Production")
    );
}

#[tokio::test]
async fn test_shutdown_flushes_unbacked_version() {
    let cluster = start_cluster(1, true);
    let mut tree = checkout(&cluster.master);
    tree.set_option("/DIRAC/Setup", "Production").unwrap();
    commit(&cluster.master, &tree, "admin").await.unwrap();

    let slave = cluster.slaves[0].clone();
    slave.refresh().await.unwrap();
    let version = slave.store().version();

    let running = tokio::spawn(async move { slave.run().await });
    tokio::task::yield_now().await;
    cluster.shutdown_tx.send(()).unwrap();
    running.await.unwrap().unwrap();

    // slave backups live in their own directory
    let transport = Arc::new(InProcessTransport::default());
    let (_tx, rx) = watch::channel(());
    let restarted = build_node(
        settings(&cluster.dir, cluster.slaves[0].store().url(), true),
        &transport,
        rx,
    );
    assert_eq!(restarted.store().version(), version);
}
