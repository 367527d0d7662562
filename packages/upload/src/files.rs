//! Recursive listing of the files to upload.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Lists every regular file below `root`, at any depth.
///
/// Directories are descended into but never returned. Returned paths are
/// absolute. Order follows the filesystem's directory iteration order.
///
/// # Errors
///
/// Returns the first I/O error hit while reading a directory or entry.
pub fn list_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let root = std::path::absolute(root)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(&root).min_depth(1).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    log::debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}
