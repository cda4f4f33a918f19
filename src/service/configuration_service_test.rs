use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::commit::CommitProtocol;
use crate::commit::CommitRequest;
use crate::constants::CONFIGURATION_SERVER_ROLE;
use crate::replication::MockSlaveClient;
use crate::replication::PingInfo;
use crate::replication::ReplicationController;
use crate::storage::BackupArchive;
use crate::storage::ConfigSnapshot;
use crate::test_utils::master_store;
use crate::test_utils::snapshot_at;
use crate::test_utils::temp_archive;
use crate::test_utils::TEST_NAME;
use crate::CommitConfig;
use crate::FailureKind;
use crate::ReplicationConfig;

const V0: &str = "2026-10-18 09:00:00.000000";
const SLAVE: &str = "dips://slave:9135/Configuration/Server";

fn service_with(
    client: MockSlaveClient,
    settings: CommitConfig,
) -> (TempDir, ConfigurationService) {
    let (dir, archive) = temp_archive();
    let snapshot = snapshot_at(&[("/DIRAC/Setup", "Production")], V0);
    archive
        .write_backup(TEST_NAME, "init", V0, &snapshot.compressed().unwrap())
        .unwrap();
    let store = master_store(snapshot);
    let protocol = Arc::new(CommitProtocol::new(store.clone(), archive.clone(), settings.clone()));
    let controller = Arc::new(ReplicationController::new(
        store,
        archive,
        Arc::new(client),
        ReplicationConfig::default(),
    ));
    (dir, ConfigurationService::new(protocol, controller, settings))
}

fn quiet_service() -> (TempDir, ConfigurationService) {
    service_with(
        MockSlaveClient::new(),
        CommitConfig {
            auto_merge: true,
            auto_slave_sync: false,
        },
    )
}

async fn fetch(service: &ConfigurationService) -> ConfigSnapshot {
    match service.handle(ServiceRequest::Fetch).await.unwrap() {
        ServiceResponse::Snapshot { version, buffer } => {
            let snapshot = ConfigSnapshot::from_compressed(&buffer).unwrap();
            assert_eq!(snapshot.version(), version);
            snapshot
        }
        other => panic!("unexpected response {:?}", other),
    }
}

fn commit_request(
    snapshot: &ConfigSnapshot,
    edit: impl FnOnce(&mut crate::tree::ConfigTree),
) -> ServiceRequest {
    let mut tree = snapshot.tree().clone();
    edit(&mut tree);
    ServiceRequest::Commit(CommitRequest {
        buffer: ConfigSnapshot::new(tree).compressed().unwrap(),
        committer: Some("tester".to_string()),
        force_version: false,
    })
}

#[tokio::test]
async fn test_ping_and_version() {
    let (_dir, service) = quiet_service();

    assert_eq!(
        service.handle(ServiceRequest::Ping).await.unwrap(),
        ServiceResponse::Pong(PingInfo {
            name: CONFIGURATION_SERVER_ROLE.to_string(),
            version: V0.to_string(),
        })
    );
    assert_eq!(
        service.handle(ServiceRequest::GetVersion).await.unwrap(),
        ServiceResponse::Version(V0.to_string())
    );
}

#[tokio::test]
async fn test_fetch_edit_commit_cycle() {
    let (_dir, service) = quiet_service();
    let snapshot = fetch(&service).await;

    let response = service
        .handle(commit_request(&snapshot, |tree| {
            tree.set_option("/DIRAC/Setup", "Certification").unwrap();
        }))
        .await
        .unwrap();

    let ServiceResponse::Committed(outcome) = response else {
        panic!("unexpected response {:?}", response);
    };
    let current = fetch(&service).await;
    assert_eq!(current.version(), outcome.version);
    assert_eq!(current.tree().get_option("/DIRAC/Setup").ok(), Some("Certification"));
}

#[tokio::test]
async fn test_rejections_are_structured() {
    let (_dir, service) = quiet_service();
    let stale = fetch(&service).await;
    service
        .handle(commit_request(&stale, |tree| {
            tree.set_option("/DIRAC/Setup", "Certification").unwrap();
        }))
        .await
        .unwrap();

    let failure = service
        .handle(commit_request(&stale, |tree| {
            tree.set_option("/DIRAC/Setup", "Development").unwrap();
        }))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::CannotAutoMerge);
    assert_eq!(failure.message, "Cannot AutoMerge: Option /DIRAC/Setup has been modified");

    let failure = service
        .handle(ServiceRequest::Commit(CommitRequest {
            buffer: vec![1, 2, 3],
            ..Default::default()
        }))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::ParseError);
}

#[tokio::test]
async fn test_commit_pushes_to_registered_slaves() {
    let mut client = MockSlaveClient::new();
    client.expect_ping().returning(|_| {
        Ok(PingInfo {
            name: CONFIGURATION_SERVER_ROLE.to_string(),
            version: V0.to_string(),
        })
    });
    client.expect_request_refresh().times(1).returning(|url| {
        assert_eq!(url, SLAVE);
        Ok(())
    });
    let (_dir, service) = service_with(client, CommitConfig::default());

    assert_eq!(
        service
            .handle(ServiceRequest::PublishSlave { url: SLAVE.to_string() })
            .await
            .unwrap(),
        ServiceResponse::SlavePublished
    );
    let snapshot = fetch(&service).await;
    assert!(snapshot.tree().get_option(crate::constants::SERVERS_OPTION).unwrap().contains(SLAVE));

    service
        .handle(commit_request(&snapshot, |tree| {
            tree.set_option("/Systems/WMS/Port", "9130").unwrap();
        }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_history_contents_and_rollback() {
    let (_dir, service) = quiet_service();
    let snapshot = fetch(&service).await;
    service
        .handle(commit_request(&snapshot, |tree| {
            tree.set_option("/DIRAC/Setup", "Certification").unwrap();
        }))
        .await
        .unwrap();

    let ServiceResponse::History(history) =
        service.handle(ServiceRequest::CommitHistory { limit: 10 }).await.unwrap()
    else {
        panic!("expected history");
    };
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].committer, "tester");
    assert_eq!(history[1].version, V0);

    let ServiceResponse::Contents(buffer) = service
        .handle(ServiceRequest::VersionContents {
            version: V0.to_string(),
        })
        .await
        .unwrap()
    else {
        panic!("expected contents");
    };
    assert_eq!(ConfigSnapshot::from_compressed(&buffer).unwrap().version(), V0);

    service
        .handle(ServiceRequest::Rollback {
            version: V0.to_string(),
            committer: Some("admin".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(fetch(&service).await.tree().get_option("/DIRAC/Setup").ok(), Some("Production"));

    let failure = service
        .handle(ServiceRequest::VersionContents {
            version: "1999-01-01 00:00:00.000000".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::NotFound);
}
