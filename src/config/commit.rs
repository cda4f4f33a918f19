use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommitConfig {
    /// Reconcile version-mismatched commits with a three-way merge instead
    /// of rejecting them
    #[serde(default = "default_auto_merge")]
    pub auto_merge: bool,

    /// Ask registered slaves to refresh after every successful commit
    #[serde(default = "default_auto_slave_sync")]
    pub auto_slave_sync: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            auto_merge: default_auto_merge(),
            auto_slave_sync: default_auto_slave_sync(),
        }
    }
}

impl CommitConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn default_auto_merge() -> bool {
    true
}
fn default_auto_slave_sync() -> bool {
    true
}
