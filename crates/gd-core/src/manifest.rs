//! The result manifest: every successfully parsed table and what it produced
//!
//! The manifest is owned by the caller and mutated through `&mut`. Every
//! mutation is persisted before it returns, so the in-memory entries and the
//! file on disk agree between calls.

use crate::config::OutputLayout;
use crate::emit::{remove_file_if_exists, write_atomic};
use crate::error::{Error, Result};
use crate::table::TableKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Table kind as recorded in the manifest
///
/// A manifest written by another version may carry a kind this build has no
/// parser for; it is kept verbatim so the entry can still be listed and removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedKind {
    Known(TableKind),
    Unrecognized(String),
}

impl RecordedKind {
    /// The kind to build a parser for, if this build knows it
    pub fn known(&self) -> Option<TableKind> {
        match self {
            RecordedKind::Known(kind) => Some(*kind),
            RecordedKind::Unrecognized(_) => None,
        }
    }

    /// Like [`known`](Self::known), but an unknown kind is an error for `table`
    pub fn require(&self, table: &str) -> Result<TableKind> {
        match self {
            RecordedKind::Known(kind) => Ok(*kind),
            RecordedKind::Unrecognized(kind) => Err(Error::UnrecognizedKind {
                table: table.to_string(),
                kind: kind.clone(),
            }),
        }
    }
}

impl From<TableKind> for RecordedKind {
    fn from(kind: TableKind) -> Self {
        RecordedKind::Known(kind)
    }
}

impl fmt::Display for RecordedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordedKind::Known(kind) => write!(f, "{kind}"),
            RecordedKind::Unrecognized(kind) => write!(f, "{kind}"),
        }
    }
}

/// Manifest entry for one parsed table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub kind: RecordedKind,
    pub name: String,
    /// Spreadsheet the table was parsed from
    pub source_path: PathBuf,
    /// Generated source files (the data file of a Convert table is not listed)
    pub output_paths: Vec<PathBuf>,
}

impl ParseResult {
    /// Create a new entry for a table of a known kind
    pub fn new(
        kind: TableKind,
        name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        output_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            source_path: source_path.into(),
            output_paths,
        }
    }

    /// Every file this entry owns on disk: outputs plus, for Convert, the data file
    pub fn owned_files(&self, layout: &OutputLayout) -> Vec<PathBuf> {
        let mut files = self.output_paths.clone();
        if self.kind == RecordedKind::Known(TableKind::Convert) {
            files.push(layout.data_path(&self.name));
        }
        files
    }
}

/// Persistent, name-ordered set of parse results
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, ParseResult>,
}

impl Manifest {
    /// Create an empty manifest backed by `path` without touching the disk
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the manifest from `path`, or start empty if the file does not exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest = Self::new(path);
        if !manifest.path.exists() {
            return Ok(manifest);
        }

        let content = fs::read_to_string(&manifest.path).map_err(|e| Error::FileRead {
            path: manifest.path.clone(),
            source: e,
        })?;
        let results: Vec<ParseResult> = serde_json::from_str(&content)?;
        for result in results {
            manifest.entries.insert(result.name.clone(), result);
        }

        Ok(manifest)
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the entry for `result.name`, then persist
    ///
    /// Returns the replaced entry. If persisting fails the previous in-memory
    /// state is restored.
    pub fn add(&mut self, result: ParseResult) -> Result<Option<ParseResult>> {
        let name = result.name.clone();
        let previous = self.entries.insert(name.clone(), result);

        if let Err(e) = self.persist() {
            match previous {
                Some(entry) => {
                    self.entries.insert(name, entry);
                }
                None => {
                    self.entries.remove(&name);
                }
            }
            return Err(e);
        }

        Ok(previous)
    }

    /// Remove the named entries, delete the files they own, then persist
    ///
    /// Names not in the manifest are skipped. If deleting a file fails, the
    /// entries removed so far are persisted and the error is returned.
    pub fn remove<S: AsRef<str>>(
        &mut self,
        names: &[S],
        layout: &OutputLayout,
    ) -> Result<Vec<ParseResult>> {
        let mut removed = Vec::new();
        let mut outcome = Ok(());

        for name in names {
            let name = name.as_ref();
            let Some(entry) = self.entries.get(name) else {
                warn!(table = name, "not in manifest, nothing to remove");
                continue;
            };

            if let Err(e) = delete_files(&entry.owned_files(layout)) {
                outcome = Err(e);
                break;
            }
            if let Some(entry) = self.entries.remove(name) {
                info!(table = name, kind = %entry.kind, "removed");
                removed.push(entry);
            }
        }

        self.persist()?;
        outcome.map(|()| removed)
    }

    /// Serialize every entry and overwrite the backing file
    pub fn persist(&self) -> Result<()> {
        write_atomic(&self.path, self.to_json()?.as_bytes())
    }

    /// The persisted form: a pretty-printed JSON array ordered by name
    pub fn to_json(&self) -> Result<String> {
        let entries: Vec<&ParseResult> = self.entries.values().collect();
        let mut json = serde_json::to_string_pretty(&entries)?;
        json.push('\n');
        Ok(json)
    }

    /// Get an entry by table name
    pub fn get(&self, name: &str) -> Option<&ParseResult> {
        self.entries.get(name)
    }

    /// Entries ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &ParseResult> {
        self.entries.values()
    }

    /// Table names in order
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Delete files, ignoring ones that are already gone
pub(crate) fn delete_files(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        if remove_file_if_exists(path)? {
            info!(path = %path.display(), "deleted");
        }
    }
    Ok(())
}
