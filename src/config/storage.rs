use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory of `<name>.<committer>@<version>.zip` backups
    ///
    /// Default: `default_backup_dir()` (/tmp/d-config/backups)
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
        }
    }
}

impl StorageConfig {
    /// Ensures the backup directory path is valid and writable
    pub fn validate(&self) -> Result<()> {
        if self.backup_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message("backup_dir path cannot be empty".into())));
        }

        #[cfg(not(test))]
        {
            use std::fs;
            if !self.backup_dir.exists() {
                fs::create_dir_all(&self.backup_dir).map_err(|e| {
                    Error::Config(ConfigError::Message(format!(
                        "Failed to create backup_dir at {}: {}",
                        self.backup_dir.display(),
                        e
                    )))
                })?;
            }

            let test_file = self.backup_dir.join(".permission_test");
            fs::write(&test_file, b"test").map_err(|e| {
                Error::Config(ConfigError::Message(format!(
                    "No write permission in backup_dir {}: {}",
                    self.backup_dir.display(),
                    e
                )))
            })?;
            fs::remove_file(&test_file).ok();
        }

        Ok(())
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("/tmp/d-config/backups")
}
