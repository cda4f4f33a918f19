//! Builders shared by the unit tests of every module

use std::sync::Arc;

use tempfile::TempDir;

use crate::constants::NAME_OPTION;
use crate::storage::ConfigSnapshot;
use crate::storage::FileBackupArchive;
use crate::storage::VersionedStore;
use crate::tree::ConfigTree;
use crate::ServerConfig;

pub(crate) const TEST_NAME: &str = "Test";
pub(crate) const MASTER_URL: &str = "dips://master:9135/Configuration/Server";

/// Tree holding the given `(option path, value)` pairs, in order
pub(crate) fn tree_from(options: &[(&str, &str)]) -> ConfigTree {
    let mut tree = ConfigTree::new();
    for (path, value) in options {
        tree.set_option(path, *value).unwrap();
    }
    tree
}

/// Named tree, the way a client would download it
pub(crate) fn named_tree(options: &[(&str, &str)]) -> ConfigTree {
    let mut tree = tree_from(options);
    tree.set_option(NAME_OPTION, TEST_NAME).unwrap();
    tree
}

pub(crate) fn snapshot_at(
    options: &[(&str, &str)],
    version: &str,
) -> ConfigSnapshot {
    ConfigSnapshot::with_version(named_tree(options), version).unwrap()
}

pub(crate) fn master_config() -> ServerConfig {
    ServerConfig {
        name: TEST_NAME.to_string(),
        url: MASTER_URL.to_string(),
        is_master: true,
        master_url: MASTER_URL.to_string(),
    }
}

pub(crate) fn slave_config(url: &str) -> ServerConfig {
    ServerConfig {
        name: TEST_NAME.to_string(),
        url: url.to_string(),
        is_master: false,
        master_url: MASTER_URL.to_string(),
    }
}

/// Backup archive rooted in a fresh temporary directory; keep the
/// [`TempDir`] alive for the duration of the test.
pub(crate) fn temp_archive() -> (TempDir, Arc<FileBackupArchive>) {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(FileBackupArchive::new(dir.path()));
    (dir, archive)
}

pub(crate) fn master_store(snapshot: ConfigSnapshot) -> Arc<VersionedStore> {
    Arc::new(VersionedStore::new(&master_config(), snapshot))
}
