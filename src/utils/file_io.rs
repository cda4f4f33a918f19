use std::fs::create_dir_all;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::debug;
use tracing::error;

use crate::Result;
use crate::StorageError;

pub fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create directory {:?}: {:?}", parent_dir, e);
                return Err(StorageError::PathError {
                    path: parent_dir.to_path_buf(),
                    source: e,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Writes `buf` to `temp_path`, syncs it, then renames it onto `final_path`
/// so readers never observe a partially written file.
pub fn write_atomically(
    temp_path: &Path,
    final_path: &Path,
    buf: &[u8],
) -> Result<()> {
    create_parent_dir_if_not_exist(final_path)?;
    let write = || -> std::io::Result<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(buf)?;
        file.sync_all()?;
        std::fs::rename(temp_path, final_path)
    };
    if let Err(e) = write() {
        let _ = std::fs::remove_file(temp_path);
        return Err(StorageError::PathError {
            path: final_path.to_path_buf(),
            source: e,
        }
        .into());
    }
    debug!("written {} bytes to {:?}", buf.len(), final_path);
    Ok(())
}
