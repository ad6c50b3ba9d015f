//! Directory scanner for discovering spreadsheet sources

use crate::error::Result;
use crate::table::is_excluded;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name prefix of spreadsheet lock files
const LOCK_FILE_PREFIX: &str = "~$";

/// Whether `path` is a spreadsheet source: right extension, not excluded
///
/// The extension comparison ignores case. Files whose name starts with the
/// exclusion marker, and editor lock files, are not sources.
pub fn is_source_file(path: &Path, extension: &str) -> bool {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension));

    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    has_extension && !is_excluded(file_name) && !file_name.starts_with(LOCK_FILE_PREFIX)
}

/// Table name for a source file: its trimmed file stem
pub fn table_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Recursively collect source files under `root`, sorted by path
pub fn scan_sources(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && is_source_file(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}
