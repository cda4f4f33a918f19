//! Versioned storage of the configuration tree.
//!
//! - [`VersionedStore`]: the live, lock-protected tree plus version counter
//! - [`ConfigSnapshot`]: immutable published state, (de)compressible
//! - [`BackupArchive`]: one compressed backup per committed version, also
//!   serving as the ancestor store of the three-way merge

mod backup_archive;
mod backup_path_manager;
mod snapshot;
mod versioned_store;

pub use backup_archive::*;
pub use snapshot::*;
pub use versioned_store::*;
