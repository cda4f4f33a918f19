//! Master/slave replication.
//!
//! On the master, [`ReplicationController`] keeps the registry of live
//! slaves and mirrors it into the server-list option. On slaves,
//! [`SlaveRefresher`] announces the slave and pulls newer snapshots.
//! The RPC transport is external and reached through [`SlaveClient`] and
//! [`MasterClient`].

mod clients;
mod refresher;
mod replication_controller;

pub use clients::*;
pub use refresher::*;
pub use replication_controller::*;


use std::future::Future;
use std::time::Duration;

use crate::NetworkError;
use crate::Result;

/// Bounds an RPC to `url` by `duration`.
pub(crate) async fn with_timeout<T>(
    url: &str,
    duration: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(duration, call).await {
        Ok(result) => result,
        Err(_) => Err(NetworkError::Timeout {
            url: url.to_string(),
            duration,
        }
        .into()),
    }
}
