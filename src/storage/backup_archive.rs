use std::path::Path;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::warn;

use super::backup_path_manager::version_from_tag;
use super::backup_path_manager::BackupPathManager;
use crate::file_io::write_atomically;
use crate::Result;
use crate::StorageError;

/// One committed version kept in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub committer: String,
    pub version: String,
    pub path: PathBuf,
}

/// Store of compressed snapshots, one per committed version.
///
/// Used both as a crash-restart source (newest backup) and as the ancestor
/// store of the three-way merge.
#[cfg_attr(test, automock)]
pub trait BackupArchive: Send + Sync + 'static {
    /// Persists `data` for `version`; returns where it landed
    fn write_backup(
        &self,
        name: &str,
        committer: &str,
        version: &str,
        data: &[u8],
    ) -> Result<PathBuf>;

    /// Compressed snapshot recorded for `version`. When several backups
    /// match, the first in reverse file-name order wins.
    fn find_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<Vec<u8>>>;

    /// Compressed snapshot of the newest version
    fn latest(
        &self,
        name: &str,
    ) -> Result<Option<Vec<u8>>>;

    /// Backups of `name`, newest version first
    fn list(
        &self,
        name: &str,
    ) -> Result<Vec<BackupEntry>>;
}

/// [`BackupArchive`] over a directory of `<name>.<committer>@<version>.zip`
/// files.
#[derive(Debug, Clone)]
pub struct FileBackupArchive {
    paths: BackupPathManager,
}

impl FileBackupArchive {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths: BackupPathManager::new(base_dir.into()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.paths.base_dir
    }

    /// File names of `name` backups, unordered
    fn file_names(
        &self,
        name: &str,
    ) -> Result<Vec<String>> {
        let dir = &self.paths.base_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(dir).map_err(|e| StorageError::PathError {
            path: dir.clone(),
            source: e,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(file_name) = entry.file_name().into_string() else {
                warn!("skipping non UTF-8 backup file name {:?}", entry.file_name());
                continue;
            };
            if self.paths.parse_backup_filename(name, &file_name).is_some() {
                names.push(file_name);
            }
        }
        Ok(names)
    }

    fn read(
        &self,
        file_name: &str,
    ) -> Result<Vec<u8>> {
        let path = self.paths.base_dir.join(file_name);
        std::fs::read(&path).map_err(|e| StorageError::PathError { path, source: e }.into())
    }
}

impl BackupArchive for FileBackupArchive {
    fn write_backup(
        &self,
        name: &str,
        committer: &str,
        version: &str,
        data: &[u8],
    ) -> Result<PathBuf> {
        let final_path = self.paths.final_backup_path(name, committer, version);
        let temp_path = self.paths.temp_backup_path(name, committer, version);
        write_atomically(&temp_path, &final_path, data)?;
        Ok(final_path)
    }

    fn find_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<Vec<u8>>> {
        let marker = self.paths.version_marker(version);
        let mut candidates: Vec<String> =
            self.file_names(name)?.into_iter().filter(|f| f.contains(&marker)).collect();
        candidates.sort();
        candidates.reverse();
        debug!(?candidates, "backups matching version {}", version);

        match candidates.first() {
            Some(file_name) => Ok(Some(self.read(file_name)?)),
            None => Ok(None),
        }
    }

    fn latest(
        &self,
        name: &str,
    ) -> Result<Option<Vec<u8>>> {
        match self.list(name)?.first() {
            Some(entry) => Ok(Some(
                std::fs::read(&entry.path).map_err(|e| StorageError::PathError {
                    path: entry.path.clone(),
                    source: e,
                })?,
            )),
            None => Ok(None),
        }
    }

    fn list(
        &self,
        name: &str,
    ) -> Result<Vec<BackupEntry>> {
        let mut parsed: Vec<(String, String, String)> = self
            .file_names(name)?
            .into_iter()
            .filter_map(|file_name| {
                let (committer, tag) = self.paths.parse_backup_filename(name, &file_name)?;
                Some((tag, file_name, committer))
            })
            .collect();
        parsed.sort();
        parsed.reverse();

        Ok(parsed
            .into_iter()
            .map(|(tag, file_name, committer)| BackupEntry {
                committer,
                version: version_from_tag(&tag),
                path: self.paths.base_dir.join(file_name),
            })
            .collect())
    }
}
