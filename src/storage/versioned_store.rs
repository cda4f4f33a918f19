use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;

use super::BackupArchive;
use super::ConfigSnapshot;
use crate::time::next_version;
use crate::tree::ConfigTree;
use crate::Result;
use crate::ServerConfig;

/// Owner of the current configuration tree and its version counter.
///
/// Readers get the published [`ConfigSnapshot`] without locking; the
/// pointer is swapped atomically so they observe either the previous or
/// the next snapshot, never a mix. Writers serialize on one mutex that
/// covers tree replacement and version bump together.
pub struct VersionedStore {
    current: ArcSwap<ConfigSnapshot>,
    write_lock: Mutex<()>,
    name: String,
    url: String,
    is_master: bool,
}

impl std::fmt::Debug for VersionedStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("name", &self.name)
            .field("version", &self.current.load().version())
            .field("is_master", &self.is_master)
            .finish()
    }
}

impl VersionedStore {
    pub fn new(
        server: &ServerConfig,
        snapshot: ConfigSnapshot,
    ) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            write_lock: Mutex::new(()),
            name: server.name.clone(),
            url: server.url.clone(),
            is_master: server.is_master,
        }
    }

    /// Process start: restores the newest backup of this configuration, or
    /// starts from an uninitialized tree when the archive holds none.
    pub fn load(
        server: &ServerConfig,
        archive: &dyn BackupArchive,
    ) -> Result<Self> {
        let snapshot = match archive.latest(&server.name)? {
            Some(buf) => {
                let snapshot = ConfigSnapshot::from_compressed(&buf)?;
                info!(
                    "restored configuration {} at version {}",
                    server.name,
                    snapshot.version()
                );
                snapshot
            }
            None => {
                info!("no backup found for {}, starting empty", server.name);
                ConfigSnapshot::empty(&server.name)?
            }
        };
        Ok(Self::new(server, snapshot))
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> String {
        self.current.load().version().to_string()
    }

    /// Configuration name this server serves
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    /// Runs the critical section of a write.
    ///
    /// `build` receives the snapshot current under the lock and returns the
    /// tree to publish. On success the tree is stamped with a version
    /// strictly greater than the current one and swapped in. When `build`
    /// fails nothing changes.
    pub fn update<F>(
        &self,
        build: F,
    ) -> Result<Arc<ConfigSnapshot>>
    where
        F: FnOnce(&ConfigSnapshot) -> Result<ConfigTree>,
    {
        let _guard = self.write_lock.lock();
        let current = self.current.load_full();
        let tree = build(&current)?;
        let version = next_version(current.version());
        let next = Arc::new(ConfigSnapshot::with_version(tree, &version)?);
        self.current.store(next.clone());
        debug!("published version {} (was {})", version, current.version());
        Ok(next)
    }

    /// Slave side: adopts a snapshot fetched from the master as is.
    /// Returns false when the version is already current.
    pub fn install(
        &self,
        snapshot: ConfigSnapshot,
    ) -> bool {
        let _guard = self.write_lock.lock();
        if self.current.load().version() == snapshot.version() {
            return false;
        }
        info!("installing version {}", snapshot.version());
        self.current.store(Arc::new(snapshot));
        true
    }

    /// Teardown: makes sure the current version has a backup.
    pub fn flush(
        &self,
        archive: &dyn BackupArchive,
        committer: &str,
    ) -> Result<Option<PathBuf>> {
        let snapshot = self.snapshot();
        if !snapshot.is_initialized() || archive.find_version(&self.name, snapshot.version())?.is_some() {
            return Ok(None);
        }
        let path = archive.write_backup(&self.name, committer, snapshot.version(), &snapshot.compressed()?)?;
        info!("flushed version {} to {:?}", snapshot.version(), path);
        Ok(Some(path))
    }
}
