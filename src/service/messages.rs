use crate::commit::CommitOutcome;
use crate::commit::CommitRequest;
use crate::replication::PingInfo;
use crate::storage::BackupEntry;
use crate::Error;
use crate::FailureKind;

#[derive(Debug, Clone)]
pub enum ServiceRequest {
    Commit(CommitRequest),
    /// Current compressed snapshot
    Fetch,
    GetVersion,
    Ping,
    /// A slave announcing itself to the master
    PublishSlave {
        url: String,
    },
    CommitHistory {
        limit: usize,
    },
    VersionContents {
        version: String,
    },
    Rollback {
        version: String,
        committer: Option<String>,
    },
}

impl ServiceRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceRequest::Commit(_) => "commit",
            ServiceRequest::Fetch => "fetch",
            ServiceRequest::GetVersion => "get_version",
            ServiceRequest::Ping => "ping",
            ServiceRequest::PublishSlave { .. } => "publish_slave",
            ServiceRequest::CommitHistory { .. } => "commit_history",
            ServiceRequest::VersionContents { .. } => "version_contents",
            ServiceRequest::Rollback { .. } => "rollback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceResponse {
    Committed(CommitOutcome),
    Snapshot { version: String, buffer: Vec<u8> },
    Version(String),
    Pong(PingInfo),
    SlavePublished,
    History(Vec<BackupEntry>),
    Contents(Vec<u8>),
}

/// Failure as reported to callers: a classification plus the message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServiceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<Error> for ServiceFailure {
    fn from(e: Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
