//! Recursive file discovery under a catalog root.

use std::path::{Path, PathBuf};

use sdv_core::MalformedPathError;
use walkdir::WalkDir;

use crate::error::CatalogError;

/// Every regular file under `root`, sorted by location string.
///
/// Symlinks are not followed. Any walk error (missing root, unreadable
/// directory) fails the whole discovery; a partially walked corpus would
/// silently drop files.
pub(crate) fn files_under(root: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !root.is_dir() {
        return Err(CatalogError::Walk {
            root: root.to_path_buf(),
            detail: "not a directory".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| CatalogError::Walk {
            root: root.to_path_buf(),
            detail: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    files.sort_by_cached_key(|p| location_string(p));
    Ok(files)
}

/// The location string used for parsing, ordering and diagnostics.
pub(crate) fn location_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `path` relative to the walk root, so identity parsing never reads
/// segments of the root itself.
pub(crate) fn relative_location(root: &Path, path: &Path) -> String {
    location_string(path.strip_prefix(root).unwrap_or(path))
}

/// Run `parse` over the root-relative location; errors name the full path.
pub(crate) fn parse_relative<T>(
    root: &Path,
    path: &Path,
    parse: impl FnOnce(&str) -> Result<T, MalformedPathError>,
) -> Result<T, MalformedPathError> {
    parse(&relative_location(root, path)).map_err(|mut e| {
        e.location = location_string(path);
        e
    })
}
