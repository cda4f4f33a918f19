use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::DEFAULT_COMMITTER;
use crate::constants::MASTER_SERVER_OPTION;
use crate::constants::NAME_OPTION;
use crate::constants::SERVERS_OPTION;
use crate::merge::MergeCoordinator;
use crate::storage::BackupArchive;
use crate::storage::BackupEntry;
use crate::storage::ConfigSnapshot;
use crate::storage::VersionedStore;
use crate::CommitConfig;
use crate::CommitError;
use crate::MergeError;
use crate::Result;
use crate::AUTO_MERGE_CONFLICTS;
use crate::BACKUP_WRITE_FAILURES;
use crate::COMMIT_LATENCY_METRIC;
use crate::COMMIT_RESULTS;

/// Attempts for a merge-enabled commit overtaken by another one before apply
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Stages a commit walks through; every transition is traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Receive,
    CheckMasterRole,
    LoadRemote,
    VersionCompare,
    DirectApply,
    AutoMerge,
    NameCheck,
    Apply,
    Persist,
    Respond,
}

#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    /// Compressed textual tree as produced by [`ConfigSnapshot::compressed`]
    pub buffer: Vec<u8>,
    pub committer: Option<String>,
    /// Administrative overwrite: the remote tree replaces the current one
    /// whatever version it was based on
    pub force_version: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub version: String,
    /// Whether the tree was reconciled by a three-way merge
    pub merged: bool,
    /// False when the backup could not be written; the commit still stands
    pub persisted: bool,
}

/// Accepts new configuration trees on the master.
///
/// All checks happen before the store is touched, and the store applies
/// tree and version together, so a rejected commit leaves no trace.
pub struct CommitProtocol {
    store: Arc<VersionedStore>,
    archive: Arc<dyn BackupArchive>,
    merger: MergeCoordinator,
    settings: CommitConfig,
}

impl CommitProtocol {
    pub fn new(
        store: Arc<VersionedStore>,
        archive: Arc<dyn BackupArchive>,
        settings: CommitConfig,
    ) -> Self {
        let merger = MergeCoordinator::new(archive.clone(), store.name());
        Self {
            store,
            archive,
            merger,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<VersionedStore> {
        &self.store
    }

    pub fn commit(
        &self,
        request: CommitRequest,
    ) -> Result<CommitOutcome> {
        let started = Instant::now();
        let mut result = self.try_commit(&request);
        let mut attempt = 1;
        while attempt < MAX_COMMIT_ATTEMPTS && self.settings.auto_merge && is_overtaken(&result) {
            attempt += 1;
            debug!("commit overtaken by another one, attempt {}", attempt);
            result = self.try_commit(&request);
        }
        COMMIT_LATENCY_METRIC.observe(started.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(outcome) => {
                let label = if outcome.merged { "merged" } else { "direct" };
                COMMIT_RESULTS.with_label_values(&[label]).inc();
                info!(
                    "configuration {} committed at version {} ({})",
                    self.store.name(),
                    outcome.version,
                    label
                );
            }
            Err(e) => {
                let kind = format!("{:?}", e.kind());
                COMMIT_RESULTS.with_label_values(&[kind.as_str()]).inc();
                warn!("commit rejected: {}", e);
            }
        }
        result
    }

    fn try_commit(
        &self,
        request: &CommitRequest,
    ) -> Result<CommitOutcome> {
        let mut state = CommitState::Receive;

        advance(&mut state, CommitState::CheckMasterRole);
        if !self.store.is_master() {
            return Err(CommitError::NotMaster.into());
        }

        advance(&mut state, CommitState::LoadRemote);
        let local = self.store.snapshot();
        let mut remote = ConfigSnapshot::from_compressed(&request.buffer)?;
        if request.force_version {
            debug!("forcing remote version {} to {}", remote.version(), local.version());
            remote = ConfigSnapshot::with_version(remote.into_tree(), local.version())?;
        }

        advance(&mut state, CommitState::VersionCompare);
        let (tree, merged) = if remote.version() == local.version() {
            advance(&mut state, CommitState::DirectApply);
            (remote.into_tree(), false)
        } else if !self.settings.auto_merge {
            return Err(CommitError::VersionMismatch {
                local: local.version().to_string(),
                remote: remote.version().to_string(),
            }
            .into());
        } else {
            advance(&mut state, CommitState::AutoMerge);
            let merged = self
                .merger
                .merge(local.tree(), remote.tree(), remote.version())
                .map_err(|e| {
                    if matches!(e, MergeError::Conflict(_)) {
                        AUTO_MERGE_CONFLICTS.inc();
                    }
                    CommitError::CannotAutoMerge(e.to_string())
                })?;
            (merged, true)
        };

        advance(&mut state, CommitState::NameCheck);
        let remote_name = tree.get_option(NAME_OPTION).unwrap_or_default();
        if remote_name != self.store.name() {
            return Err(CommitError::NameMismatch {
                local: self.store.name().to_string(),
                remote: remote_name.to_string(),
            }
            .into());
        }

        advance(&mut state, CommitState::Apply);
        let base = local.version().to_string();
        let published = self.store.update(move |current| {
            if current.version() != base {
                return Err(CommitError::ConcurrentCommit {
                    expected: base,
                    current: current.version().to_string(),
                }
                .into());
            }
            Ok(tree)
        })?;

        advance(&mut state, CommitState::Persist);
        let committer = committer_or_default(request.committer.as_deref());
        let persisted = persist_backup(self.archive.as_ref(), self.store.name(), &published, committer);

        advance(&mut state, CommitState::Respond);
        Ok(CommitOutcome {
            version: published.version().to_string(),
            merged,
            persisted,
        })
    }

    /// Backups of this configuration, newest first, at most `limit`.
    pub fn commit_history(
        &self,
        limit: usize,
    ) -> Result<Vec<BackupEntry>> {
        let mut entries = self.archive.list(self.store.name())?;
        entries.truncate(limit);
        Ok(entries)
    }

    /// Compressed tree recorded for a past `version`.
    pub fn version_contents(
        &self,
        version: &str,
    ) -> Result<Vec<u8>> {
        self.archive
            .find_version(self.store.name(), version)?
            .ok_or_else(|| CommitError::UnknownVersion(version.to_string()).into())
    }

    /// Publishes the tree of a past `version` as a new version.
    ///
    /// The current server list and master URL are kept; they describe the
    /// live deployment, not the configuration being restored.
    pub fn rollback_to_version(
        &self,
        version: &str,
        committer: Option<&str>,
    ) -> Result<CommitOutcome> {
        if !self.store.is_master() {
            return Err(CommitError::NotMaster.into());
        }
        let restored = ConfigSnapshot::from_compressed(&self.version_contents(version)?)?;
        let published = self.store.update(|current| {
            let mut tree = restored.into_tree();
            for path in [MASTER_SERVER_OPTION, SERVERS_OPTION] {
                match current.tree().get_option(path).ok() {
                    Some(value) => tree.set_option(path, value)?,
                    None => {
                        let _ = tree.delete_option(path);
                    }
                }
            }
            Ok(tree)
        })?;
        info!("rolled {} back to {} as version {}", self.store.name(), version, published.version());

        let persisted = persist_backup(
            self.archive.as_ref(),
            self.store.name(),
            &published,
            committer_or_default(committer),
        );
        Ok(CommitOutcome {
            version: published.version().to_string(),
            merged: false,
            persisted,
        })
    }
}

/// Writes the backup of a freshly published snapshot. A failure does not
/// undo the in-memory commit; merges based on this version will then fail
/// to find their ancestor.
pub(crate) fn persist_backup(
    archive: &dyn BackupArchive,
    name: &str,
    snapshot: &ConfigSnapshot,
    committer: &str,
) -> bool {
    let written = snapshot
        .compressed()
        .and_then(|data| archive.write_backup(name, committer, snapshot.version(), &data));
    match written {
        Ok(path) => {
            debug!("backup of {} written to {:?}", snapshot.version(), path);
            true
        }
        Err(e) => {
            BACKUP_WRITE_FAILURES.inc();
            error!(
                "version {} of {} is live but its backup failed: {}. Merges against it will not find their ancestor",
                snapshot.version(),
                name,
                e
            );
            false
        }
    }
}

fn is_overtaken(result: &Result<CommitOutcome>) -> bool {
    matches!(result, Err(crate::Error::Commit(CommitError::ConcurrentCommit { .. })))
}

fn committer_or_default(committer: Option<&str>) -> &str {
    match committer {
        Some(c) if !c.trim().is_empty() => c,
        _ => DEFAULT_COMMITTER,
    }
}

fn advance(
    state: &mut CommitState,
    next: CommitState,
) {
    debug!("commit {:?} -> {:?}", state, next);
    *state = next;
}
