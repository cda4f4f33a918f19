//! Replicated, versioned hierarchical configuration store.
//!
//! One master accepts commits of whole configuration trees and stamps each
//! accepted state with a strictly increasing version. Slaves replicate the
//! master's snapshots and forward edits back to it. A commit based on an
//! older version is reconciled with a three-way structural merge against
//! the archived snapshot of that version, or rejected when the edits
//! overlap.
//!
//! - [`ConfigTree`]: sections, options and their textual codec
//! - [`get_modifications`] / [`apply_modifications`]: structural diff and patch
//! - [`MergeCoordinator`]: three-way merge with conservative conflict detection
//! - [`VersionedStore`] / [`BackupArchive`]: live state and version history
//! - [`CommitProtocol`]: master-side commit pipeline
//! - [`ReplicationController`] / [`SlaveRefresher`]: master/slave replication
//! - [`ConfigurationService`] / [`NodeBuilder`]: request surface and wiring

mod commit;
mod config;
mod diff;
mod errors;
mod merge;
mod metrics;
mod node;
mod replication;
mod service;
mod storage;
mod tree;

pub mod constants;
pub mod utils;

pub use commit::*;
pub use crate::config::*;
pub use diff::*;
pub use errors::*;
pub use merge::*;
pub use metrics::*;
pub use node::*;
pub use replication::*;
pub use service::*;
pub use storage::*;
pub use tree::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
