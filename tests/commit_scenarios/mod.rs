use d_config::constants::SERVERS_OPTION;
use d_config::FailureKind;

use crate::common::checkout;
use crate::common::commit;
use crate::common::start_cluster;
use crate::common::MASTER_URL;

/// Master seeded by an administrator, both slaves registered and in sync.
async fn seeded_cluster(auto_merge: bool) -> crate::common::Cluster {
    let cluster = start_cluster(2, auto_merge);
    let mut tree = checkout(&cluster.master);
    tree.set_option("/DIRAC/Setup", "Production").unwrap();
    commit(&cluster.master, &tree, "admin").await.unwrap();

    for slave in &cluster.slaves {
        slave.refresh().await.unwrap();
    }
    // the second registration moved the master past what slave 0 holds
    cluster.slaves[0].refresh().await.unwrap();
    cluster
}

#[tokio::test]
async fn test_slaves_register_and_follow_the_master() {
    let cluster = seeded_cluster(true).await;
    let master_version = cluster.master.store().version();

    for slave in &cluster.slaves {
        assert_eq!(slave.store().version(), master_version);
        assert_eq!(
            slave.store().snapshot().tree().get_option("/DIRAC/Setup").ok(),
            Some("Production")
        );
    }
    let servers = cluster.master.store().snapshot().tree().get_option(SERVERS_OPTION).unwrap().to_string();
    assert!(servers.starts_with(MASTER_URL));
    for slave in &cluster.slaves {
        assert!(servers.contains(slave.store().url()), "{}", servers);
    }
}

#[tokio::test]
async fn test_commit_is_pushed_to_every_slave() {
    let cluster = seeded_cluster(true).await;

    let mut tree = checkout(&cluster.slaves[0]);
    tree.set_option("/Systems/WMS/Port", "9130").unwrap();
    let outcome = commit(&cluster.master, &tree, "alice").await.unwrap();

    assert!(!outcome.merged);
    assert!(outcome.persisted);
    for slave in &cluster.slaves {
        assert_eq!(slave.store().version(), outcome.version);
        assert_eq!(
            slave.store().snapshot().tree().get_option("/Systems/WMS/Port").ok(),
            Some("9130")
        );
    }
}

#[tokio::test]
async fn test_disjoint_edits_from_stale_copies_are_merged() {
    let cluster = seeded_cluster(true).await;
    let mut first = checkout(&cluster.slaves[0]);
    let mut second = checkout(&cluster.slaves[1]);

    first.set_option("/Resources/Sites/X/CE", "ce01").unwrap();
    let v1 = commit(&cluster.master, &first, "slave-0").await.unwrap();

    second.set_option("/Resources/Sites/Y/CE", "ce02").unwrap();
    let v2 = commit(&cluster.master, &second, "slave-1").await.unwrap();

    assert!(v2.merged);
    assert!(v2.version > v1.version);
    let current = cluster.master.store().snapshot();
    assert_eq!(current.tree().get_option("/Resources/Sites/X/CE").ok(), Some("ce01"));
    assert_eq!(current.tree().get_option("/Resources/Sites/Y/CE").ok(), Some("ce02"));
    assert_eq!(cluster.slaves[1].store().version(), v2.version);
}

#[tokio::test]
async fn test_overlapping_edits_from_stale_copies_are_rejected() {
    let cluster = seeded_cluster(true).await;
    let mut first = checkout(&cluster.slaves[0]);
    let mut second = checkout(&cluster.slaves[1]);

    first.set_option("/DIRAC/Setup", "Certification").unwrap();
    let v1 = commit(&cluster.master, &first, "slave-0").await.unwrap();

    second.set_option("/DIRAC/Setup", "Development").unwrap();
    let failure = commit(&cluster.master, &second, "slave-1").await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::CannotAutoMerge);
    assert!(failure.message.contains("/DIRAC/Setup"), "{}", failure.message);
    let current = cluster.master.store().snapshot();
    assert_eq!(current.version(), v1.version);
    assert_eq!(current.tree().get_option("/DIRAC/Setup").ok(), Some("Certification"));
}

#[tokio::test]
async fn test_stale_commit_without_auto_merge_changes_nothing() {
    let cluster = seeded_cluster(false).await;
    let mut first = checkout(&cluster.slaves[0]);
    let mut second = checkout(&cluster.slaves[1]);

    first.set_option("/Resources/Sites/X/CE", "ce01").unwrap();
    commit(&cluster.master, &first, "slave-0").await.unwrap();
    let before = cluster.master.store().snapshot();

    second.set_option("/Resources/Sites/Y/CE", "ce02").unwrap();
    let failure = commit(&cluster.master, &second, "slave-1").await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::VersionMismatch);
    assert_eq!(cluster.master.store().snapshot(), before);
}

#[tokio::test]
async fn test_versions_strictly_increase() {
    let cluster = seeded_cluster(true).await;
    let mut previous = cluster.master.store().version();

    for i in 0..5 {
        let mut tree = checkout(&cluster.master);
        tree.set_option("/Systems/Counter", &i.to_string()).unwrap();
        let outcome = commit(&cluster.master, &tree, "loop").await.unwrap();
        assert!(outcome.version > previous, "{} <= {}", outcome.version, previous);
        previous = outcome.version;
    }
}

#[tokio::test]
async fn test_slave_refuses_commits() {
    let cluster = seeded_cluster(true).await;
    let slave = &cluster.slaves[0];
    let before = slave.store().snapshot();

    let mut tree = checkout(slave);
    tree.set_option("/DIRAC/Setup", "Certification").unwrap();
    let failure = commit(slave, &tree, "alice").await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::NotMaster);
    assert_eq!(slave.store().snapshot(), before);
}
