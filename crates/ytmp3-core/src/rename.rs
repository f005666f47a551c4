//! Optional renaming of downloaded files to their track title

use crate::metadata::sanitize_filename;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Rename `path` to `<sanitized title>.mp3` in the same directory.
///
/// Never overwrites: if the target exists or the rename fails, the original
/// path is returned unchanged.
pub fn rename_to_title(path: &Path, title: &str) -> PathBuf {
    let desired_name = format!("{}.mp3", sanitize_filename(title, true));
    let desired = path.with_file_name(&desired_name);
    let current_name = path.file_name().unwrap_or_default().to_string_lossy();

    if desired == path {
        return path.to_path_buf();
    }

    if desired.exists() {
        warn!(
            "Target file '{}' already exists. Not renaming. Using: '{}'",
            desired_name, current_name
        );
        return path.to_path_buf();
    }

    info!("Renaming '{}' to '{}'", current_name, desired_name);
    match std::fs::rename(path, &desired) {
        Ok(()) => desired,
        Err(e) => {
            warn!(
                "Could not rename file: {}. Using original name: '{}'",
                e, current_name
            );
            path.to_path_buf()
        }
    }
}
