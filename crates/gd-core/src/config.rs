//! Pipeline configuration, loaded from `gdgen.toml`

use crate::error::{Error, Result};
use crate::table::TableKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "gdgen.toml";

/// Main configuration for the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Manifest of every successfully parsed table
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    /// Root directory for generated source files
    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,

    /// Directory for emitted JSON record lists
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Extension of generated source files
    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    /// Extension of spreadsheet source files
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Directory whose files override the built-in templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,

    /// Source directories per table kind
    #[serde(default)]
    pub sources: SourceDirs,
}

/// Where each kind of table is authored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDirs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert: Option<PathBuf>,

    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<PathBuf>,
}

impl SourceDirs {
    /// Source directory configured for `kind`
    pub fn dir_for(&self, kind: TableKind) -> Option<&Path> {
        match kind {
            TableKind::Convert => self.convert.as_deref(),
            TableKind::Enum => self.enumeration.as_deref(),
            TableKind::Variable => self.variable.as_deref(),
        }
    }
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("gdgen-manifest.json")
}

fn default_script_dir() -> PathBuf {
    PathBuf::from("Generated/Scripts")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("Generated/Data")
}

fn default_script_extension() -> String {
    "cs".to_string()
}

fn default_source_extension() -> String {
    "csv".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: default_manifest_path(),
            script_dir: default_script_dir(),
            data_dir: default_data_dir(),
            script_extension: default_script_extension(),
            source_extension: default_source_extension(),
            template_dir: None,
            sources: SourceDirs {
                convert: Some(PathBuf::from("Sheets/Convert")),
                enumeration: Some(PathBuf::from("Sheets/Enum")),
                variable: Some(PathBuf::from("Sheets/Variable")),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolved_against(base))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        crate::emit::write_atomic(path, content.as_bytes())
    }

    /// Make every relative path relative to `base`
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.manifest_path);
        resolve(&mut self.script_dir);
        resolve(&mut self.data_dir);
        for dir in [
            &mut self.template_dir,
            &mut self.sources.convert,
            &mut self.sources.enumeration,
            &mut self.sources.variable,
        ]
        .into_iter()
        .flatten()
        {
            resolve(dir);
        }
        self
    }

    /// Output locations derived from this configuration
    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            script_dir: self.script_dir.clone(),
            data_dir: self.data_dir.clone(),
            script_extension: self.script_extension.clone(),
        }
    }
}

/// Deterministic output paths for generated artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub script_dir: PathBuf,
    pub data_dir: PathBuf,
    pub script_extension: String,
}

impl OutputLayout {
    /// Generated source for a table: `<script_dir>/<Kind>/<name>.<ext>`
    pub fn script_path(&self, kind: TableKind, name: &str) -> PathBuf {
        self.script_dir
            .join(kind.name())
            .join(format!("{name}.{}", self.script_extension))
    }

    /// Record list of a Convert table: `<data_dir>/<name>.json`
    pub fn data_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source_extension, "csv");
        assert_eq!(config.script_extension, "cs");
        assert!(config.template_dir.is_none());
        assert!(config.sources.dir_for(TableKind::Enum).is_some());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("script_extension = \"txt\"\n[sources]\nenum = \"enums\"\n").unwrap();

        assert_eq!(config.script_extension, "txt");
        assert_eq!(config.data_dir, PathBuf::from("Generated/Data"));
        assert_eq!(config.sources.dir_for(TableKind::Enum), Some(Path::new("enums")));
        assert_eq!(config.sources.dir_for(TableKind::Convert), None);
    }

    #[test]
    fn test_save_and_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        Config::default().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.manifest_path, dir.path().join("gdgen-manifest.json"));
        assert_eq!(
            loaded.sources.dir_for(TableKind::Convert),
            Some(dir.path().join("Sheets/Convert").as_path())
        );
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "script_dir = [").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout {
            script_dir: PathBuf::from("out/scripts"),
            data_dir: PathBuf::from("out/data"),
            script_extension: "cs".into(),
        };

        assert_eq!(
            layout.script_path(TableKind::Enum, "Rarity"),
            PathBuf::from("out/scripts/Enum/Rarity.cs")
        );
        assert_eq!(layout.data_path("Item"), PathBuf::from("out/data/Item.json"));
    }
}
