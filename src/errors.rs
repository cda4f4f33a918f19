//! Configuration Service Error Hierarchy
//!
//! Defines the error types of the replicated configuration store,
//! categorized by layer: tree manipulation, diff replay, merge, commit
//! protocol, persistence and peer communication.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structural failures on the configuration tree
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Modification replay failures
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// Three-way merge failures
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Commit protocol rejections
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Infrastructure-level failures (disk, compression)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Peer communication failures
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Service settings loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Path {0} does not exist")]
    NotFound(String),

    #[error("Path {0} already exists")]
    AlreadyExists(String),

    /// Empty segment, reserved character or operation on the root
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Malformed textual representation
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// A modification could not be replayed because its target is
    /// missing or already present.
    #[error("Cannot apply {action} on {path}: {reason}")]
    ApplyConflict {
        action: &'static str,
        path: String,
        reason: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The snapshot the client branched from is not in the backup archive
    #[error("Could not retrieve original committer's version {version}")]
    AncestorNotFound { version: String },

    /// Overlapping independent edits
    #[error("{0}")]
    Conflict(String),

    /// Client modifications did not replay onto the server tree
    #[error(transparent)]
    Apply(#[from] DiffError),

    /// Ancestor snapshot exists but could not be read
    #[error("Could not load ancestor version {version}: {source}")]
    AncestorUnreadable {
        version: String,
        #[source]
        source: Box<Error>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Configuration modification is not allowed in this server")]
    NotMaster,

    #[error("Local and remote versions differ ({local} vs {remote}). Cannot commit.")]
    VersionMismatch { local: String, remote: String },

    #[error("Cannot AutoMerge: {0}")]
    CannotAutoMerge(String),

    #[error("Names differ: Server is {local} and remote is {remote}")]
    NameMismatch { local: String, remote: String },

    /// Another commit was published between version check and apply
    #[error("Configuration moved from {expected} to {current} during commit")]
    ConcurrentCommit { expected: String, current: String },

    #[error("Version {0} is not in the backup archive")]
    UnknownVersion(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures during backup operations
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compressed buffer could not be inflated or is not UTF-8
    #[error("Compression failure: {0}")]
    Compression(String),

    /// Backup archive failures not tied to a single I/O call
    #[error("Backup operation failed: {0}")]
    Backup(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Request to {url} timed out after {duration:?}")]
    Timeout { url: String, duration: Duration },

    #[error("Peer {url} unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// Ping answered by something that is not a configuration server
    #[error("Peer {url} identifies itself as {name}")]
    NotConfigurationServer { url: String, name: String },
}

/// Failure classification surfaced across the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotMaster,
    VersionMismatch,
    CannotAutoMerge,
    NameMismatch,
    ParseError,
    ApplyConflict,
    NotFound,
    Storage,
    Network,
    Config,
    Internal,
}

impl Error {
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Tree(TreeError::Parse { .. }) => FailureKind::ParseError,
            Error::Tree(TreeError::NotFound(_)) => FailureKind::NotFound,
            Error::Tree(_) => FailureKind::ApplyConflict,
            Error::Diff(_) => FailureKind::ApplyConflict,
            Error::Merge(_) => FailureKind::CannotAutoMerge,
            Error::Commit(e) => match e {
                CommitError::NotMaster => FailureKind::NotMaster,
                CommitError::VersionMismatch { .. } | CommitError::ConcurrentCommit { .. } => {
                    FailureKind::VersionMismatch
                }
                CommitError::CannotAutoMerge(_) => FailureKind::CannotAutoMerge,
                CommitError::NameMismatch { .. } => FailureKind::NameMismatch,
                CommitError::UnknownVersion(_) => FailureKind::NotFound,
            },
            Error::Storage(StorageError::Compression(_)) => FailureKind::ParseError,
            Error::Storage(_) => FailureKind::Storage,
            Error::Network(_) => FailureKind::Network,
            Error::Config(_) => FailureKind::Config,
            Error::Fatal(_) => FailureKind::Internal,
        }
    }
}

// ============== Conversion Implementations ============== //
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(StorageError::IoError(e))
    }
}
