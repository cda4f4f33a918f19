//! Master-side commit pipeline: validation, merge, publication, backup.

mod commit_protocol;
pub use commit_protocol::*;
