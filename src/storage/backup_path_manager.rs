use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::constants::BACKUP_EXTENSION;
use crate::constants::BACKUP_TEMP_PREFIX;
use crate::constants::VERSION_FORMAT;
use crate::time::version_tag;

const TAG_FORMAT: &str = "%Y%m%d%H%M%S%.6f";

/// Centralized manager for backup file naming.
///
/// Backups are named `<configurationName>.<committer>@<versionTag>.zip`
/// where the tag is the version stripped of `-`, `:` and blanks.
#[derive(Debug, Clone)]
pub(crate) struct BackupPathManager {
    /// Base directory where backups are stored
    pub(crate) base_dir: PathBuf,
    /// Prefix for temporary working files
    pub(crate) temp_prefix: String,
}

impl BackupPathManager {
    pub(crate) fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            temp_prefix: BACKUP_TEMP_PREFIX.to_string(),
        }
    }

    pub(crate) fn file_name(
        &self,
        name: &str,
        committer: &str,
        version: &str,
    ) -> String {
        format!(
            "{}.{}@{}.{}",
            name,
            sanitize(committer),
            version_tag(version),
            BACKUP_EXTENSION
        )
    }

    pub(crate) fn final_backup_path(
        &self,
        name: &str,
        committer: &str,
        version: &str,
    ) -> PathBuf {
        self.base_dir.join(self.file_name(name, committer, version))
    }

    /// Working path renamed onto the final path once fully written
    pub(crate) fn temp_backup_path(
        &self,
        name: &str,
        committer: &str,
        version: &str,
    ) -> PathBuf {
        self.base_dir.join(format!(
            "{}{}",
            self.temp_prefix,
            self.file_name(name, committer, version)
        ))
    }

    /// Marker searched in file names when looking a version up
    pub(crate) fn version_marker(
        &self,
        version: &str,
    ) -> String {
        format!("@{}", version_tag(version))
    }

    /// Extracts `(committer, version tag)` from a backup file name of
    /// configuration `name`. Temporary files never match.
    pub(crate) fn parse_backup_filename(
        &self,
        name: &str,
        filename: &str,
    ) -> Option<(String, String)> {
        if filename.starts_with(&self.temp_prefix) {
            return None;
        }
        let stripped = filename
            .strip_prefix(name)?
            .strip_prefix('.')?
            .strip_suffix(BACKUP_EXTENSION)?
            .strip_suffix('.')?;
        let (committer, tag) = stripped.rsplit_once('@')?;
        // a dotted committer means the file belongs to `<name>.<suffix>`
        if tag.is_empty() || committer.contains('.') {
            return None;
        }
        Some((committer.to_string(), tag.to_string()))
    }
}

/// Rebuilds the version string a tag was derived from. Tags that do not
/// come from a date stamp (e.g. `0`) are returned unchanged.
pub(crate) fn version_from_tag(tag: &str) -> String {
    NaiveDateTime::parse_from_str(tag, TAG_FORMAT)
        .map(|t| t.format(VERSION_FORMAT).to_string())
        .unwrap_or_else(|_| tag.to_string())
}

fn sanitize(committer: &str) -> String {
    committer
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
