use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::check_conflicts;
use crate::diff::apply_modifications;
use crate::diff::get_modifications;
use crate::storage::BackupArchive;
use crate::storage::ConfigSnapshot;
use crate::tree::ConfigTree;
use crate::MergeError;

/// Stages of a single merge attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Start,
    FetchAncestor,
    ComputeDiffs,
    CheckConflict,
    Apply,
    Reject,
}

/// Reconciles a client tree branched from an older version with the
/// server's current tree, using the archived snapshot of that older version
/// as the common ancestor.
pub struct MergeCoordinator {
    archive: Arc<dyn BackupArchive>,
    name: String,
}

impl MergeCoordinator {
    pub fn new(
        archive: Arc<dyn BackupArchive>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            archive,
            name: name.into(),
        }
    }

    /// Returns the merged tree; neither input is modified.
    pub fn merge(
        &self,
        server_tree: &ConfigTree,
        client_tree: &ConfigTree,
        client_version: &str,
    ) -> Result<ConfigTree, MergeError> {
        let mut state = MergeState::Start;
        advance(&mut state, MergeState::FetchAncestor);
        let ancestor = match self.fetch_ancestor(client_version) {
            Ok(ancestor) => ancestor,
            Err(e) => {
                advance(&mut state, MergeState::Reject);
                warn!("merge aborted: {}", e);
                return Err(e);
            }
        };
        merge_from(&mut state, &ancestor, server_tree, client_tree)
    }

    fn fetch_ancestor(
        &self,
        version: &str,
    ) -> Result<ConfigTree, MergeError> {
        let unreadable = |e| MergeError::AncestorUnreadable {
            version: version.to_string(),
            source: Box::new(e),
        };
        let buf = self
            .archive
            .find_version(&self.name, version)
            .map_err(unreadable)?
            .ok_or_else(|| MergeError::AncestorNotFound {
                version: version.to_string(),
            })?;
        let snapshot = ConfigSnapshot::from_compressed(&buf).map_err(unreadable)?;
        Ok(snapshot.into_tree())
    }
}

/// Three-way merge against an ancestor already at hand.
pub fn merge_with_ancestor(
    ancestor: &ConfigTree,
    server_tree: &ConfigTree,
    client_tree: &ConfigTree,
) -> Result<ConfigTree, MergeError> {
    let mut state = MergeState::FetchAncestor;
    merge_from(&mut state, ancestor, server_tree, client_tree)
}

fn merge_from(
    state: &mut MergeState,
    ancestor: &ConfigTree,
    server_tree: &ConfigTree,
    client_tree: &ConfigTree,
) -> Result<ConfigTree, MergeError> {
    advance(state, MergeState::ComputeDiffs);
    let server_mods = get_modifications(ancestor, server_tree);
    let client_mods = get_modifications(ancestor, client_tree);

    advance(state, MergeState::CheckConflict);
    let replay = match check_conflicts(&client_mods, &server_mods, "") {
        Ok(replay) => replay,
        Err(conflict) => {
            advance(state, MergeState::Reject);
            warn!("merge conflict: {}", conflict);
            return Err(MergeError::Conflict(conflict));
        }
    };

    advance(state, MergeState::Apply);
    let mut merged = server_tree.clone();
    if let Err(e) = apply_modifications(&mut merged, &replay) {
        advance(state, MergeState::Reject);
        warn!("merged modifications did not apply: {}", e);
        return Err(e.into());
    }
    info!(
        "merged {} client modification(s) over {} server modification(s)",
        client_mods.len(),
        server_mods.len()
    );
    Ok(merged)
}

fn advance(
    state: &mut MergeState,
    next: MergeState,
) {
    debug!("merge {:?} -> {:?}", state, next);
    *state = next;
}
