//! Writing generated artifacts to disk
//!
//! Every file is written whole into a temporary file next to its destination
//! and then renamed over it, so readers never observe a half-written file.

use crate::error::{Error, Result};
use crate::table::Row;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Serialize rows as the JSON record list: pretty-printed, trailing newline
pub fn rows_to_json(rows: &[Row]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(rows)?;
    json.push('\n');
    Ok(json)
}

/// Parse a JSON record list written by [`emit_rows`]
pub fn rows_from_json(json: &str) -> Result<Vec<Row>> {
    Ok(serde_json::from_str(json)?)
}

/// Write the record list for a table to `path`
pub fn emit_rows(rows: &[Row], path: &Path) -> Result<()> {
    let json = rows_to_json(rows)?;
    write_atomic(path, json.as_bytes())
}

/// Read back a record list from `path`
pub fn read_rows_file(path: &Path) -> Result<Vec<Row>> {
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    rows_from_json(&content)
}

/// Replace the contents of `path`, creating parent directories as needed
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let write_error = |source: std::io::Error| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(write_error)?;

    let mut file = NamedTempFile::new_in(&dir).map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Delete a file; a file that is already gone is not an error
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
