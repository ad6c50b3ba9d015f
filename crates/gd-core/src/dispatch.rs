//! Batch dispatch: route source files to parsers, write outputs, update the manifest
//!
//! One table failing never stops a batch; its error is logged and recorded in
//! the [`BatchReport`]. The manifest is only touched after a table's whole
//! pipeline has succeeded. Failing to persist the manifest aborts the batch.

use crate::config::{Config, OutputLayout, SourceDirs};
use crate::emit::write_atomic;
use crate::error::{Error, Result};
use crate::grid::{CsvGridSource, GridSource};
use crate::manifest::{delete_files, Manifest, ParseResult, RecordedKind};
use crate::parser::{enum_members_of, parser_for};
use crate::scanner::{is_source_file, scan_sources, table_name};
use crate::table::{Table, TableKind};
use crate::template::TemplateSet;
use crate::types::TypeRegistry;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Order in which kinds are parsed so enumerations exist before they are used
pub const BUILD_ORDER: [TableKind; 3] = [TableKind::Enum, TableKind::Variable, TableKind::Convert];

/// External collaborators told about finished batches
pub trait Host {
    /// Generated files changed on disk
    fn refresh_assets(&mut self) {}

    /// Open editors showing table data should reload
    fn refresh_open_editors(&mut self) {}
}

/// A host that ignores refresh signals
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {}

impl<H: Host + ?Sized> Host for &mut H {
    fn refresh_assets(&mut self) {
        (**self).refresh_assets();
    }

    fn refresh_open_editors(&mut self) {
        (**self).refresh_open_editors();
    }
}

/// A table that could not be parsed
#[derive(Debug)]
pub struct TableFailure {
    pub table: String,
    pub source_path: PathBuf,
    pub error: Error,
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Manifest entries written, in processing order
    pub parsed: Vec<ParseResult>,
    /// Tables that failed; none of them touched the manifest
    pub failures: Vec<TableFailure>,
    /// Files that are not spreadsheet sources
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    /// Whether every table in the batch was parsed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Append another report's results
    pub fn merge(&mut self, other: BatchReport) {
        self.parsed.extend(other.parsed);
        self.failures.extend(other.failures);
        self.skipped.extend(other.skipped);
    }
}

struct Built {
    result: ParseResult,
    enum_members: Option<Vec<String>>,
    rows: usize,
}

/// Runs parse batches against a borrowed manifest
pub struct Dispatcher<'a> {
    manifest: &'a mut Manifest,
    registry: TypeRegistry,
    registry_seeded: bool,
    templates: TemplateSet,
    layout: OutputLayout,
    source_extension: String,
    grids: Box<dyn GridSource + 'a>,
    host: Box<dyn Host + 'a>,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher reading CSV sources with a [`NullHost`]
    pub fn new(manifest: &'a mut Manifest, templates: TemplateSet, layout: OutputLayout) -> Self {
        Self {
            manifest,
            registry: TypeRegistry::new(),
            registry_seeded: false,
            templates,
            layout,
            source_extension: "csv".to_string(),
            grids: Box::new(CsvGridSource),
            host: Box::new(NullHost),
        }
    }

    /// Create a dispatcher for `config`, loading its templates
    pub fn from_config(manifest: &'a mut Manifest, config: &Config) -> Result<Self> {
        let templates = TemplateSet::load(config.template_dir.as_deref())?;
        Ok(Self::new(manifest, templates, config.layout())
            .with_source_extension(config.source_extension.clone()))
    }

    /// Use a different spreadsheet reader
    pub fn with_grid_source(mut self, grids: impl GridSource + 'a) -> Self {
        self.grids = Box::new(grids);
        self
    }

    /// Send refresh signals to `host`
    pub fn with_host(mut self, host: impl Host + 'a) -> Self {
        self.host = Box::new(host);
        self
    }

    /// Only accept files with this extension
    pub fn with_source_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = extension.into();
        self
    }

    pub fn manifest(&self) -> &Manifest {
        self.manifest
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Whether `path` would be accepted as a source by this dispatcher
    pub fn is_source_file(&self, path: &Path) -> bool {
        is_source_file(path, &self.source_extension)
    }

    /// Parse `files` as tables of `kind`
    pub fn parse_files(&mut self, files: &[PathBuf], kind: TableKind) -> Result<BatchReport> {
        self.seed_registry();
        let jobs: Vec<(PathBuf, RecordedKind)> =
            files.iter().map(|f| (f.clone(), kind.into())).collect();

        let mut report = BatchReport::default();
        let outcome = self.run_batch(jobs, &mut report);
        self.refresh();
        outcome.map(|()| report)
    }

    /// Parse every source under the configured directories, Enum tables first
    pub fn build(&mut self, sources: &SourceDirs) -> Result<BatchReport> {
        self.seed_registry();
        let mut report = BatchReport::default();
        let outcome = self.build_all(sources, &mut report);
        self.refresh();
        outcome.map(|()| report)
    }

    /// Parse manifested tables again from their recorded source and kind
    ///
    /// With no names, every entry is parsed again.
    pub fn reparse<S: AsRef<str>>(&mut self, names: &[S]) -> Result<BatchReport> {
        self.seed_registry();

        let mut jobs: Vec<(PathBuf, RecordedKind)> = if names.is_empty() {
            self.manifest
                .iter()
                .map(|e| (e.source_path.clone(), e.kind.clone()))
                .collect()
        } else {
            names
                .iter()
                .filter_map(|name| {
                    let entry = self.manifest.get(name.as_ref());
                    if entry.is_none() {
                        warn!(table = name.as_ref(), "not in manifest, cannot parse again");
                    }
                    entry.map(|e| (e.source_path.clone(), e.kind.clone()))
                })
                .collect()
        };
        jobs.sort_by_key(|(_, kind)| build_rank(kind));

        let mut report = BatchReport::default();
        let outcome = self.run_batch(jobs, &mut report);
        self.refresh();
        outcome.map(|()| report)
    }

    /// Remove tables from the manifest and delete their generated files
    pub fn remove<S: AsRef<str>>(&mut self, names: &[S]) -> Result<Vec<ParseResult>> {
        self.seed_registry();
        let outcome = self.manifest.remove(names, &self.layout);
        if let Ok(removed) = &outcome {
            for entry in removed {
                if entry.kind == RecordedKind::Known(TableKind::Enum) {
                    self.registry.unregister_enum(&entry.name);
                }
            }
        }
        self.refresh();
        outcome
    }

    /// Validate a source without writing anything
    pub fn preview(&mut self, path: &Path, kind: TableKind) -> Result<Table> {
        self.seed_registry();
        let name = table_name(path).unwrap_or_default();
        let grid = self.grids.read_grid(path)?;
        parser_for(kind).parse(&name, path, &grid, &self.registry)
    }

    fn build_all(&mut self, sources: &SourceDirs, report: &mut BatchReport) -> Result<()> {
        for kind in BUILD_ORDER {
            let Some(dir) = sources.dir_for(kind) else {
                continue;
            };
            if !dir.is_dir() {
                warn!(kind = %kind, dir = %dir.display(), "source directory does not exist");
                continue;
            }

            let jobs: Vec<(PathBuf, RecordedKind)> = scan_sources(dir, &self.source_extension)?
                .into_iter()
                .map(|f| (f, kind.into()))
                .collect();
            self.run_batch(jobs, report)?;
        }
        Ok(())
    }

    fn run_batch(&mut self, jobs: Vec<(PathBuf, RecordedKind)>, report: &mut BatchReport) -> Result<()> {
        for (path, kind) in jobs {
            let name = match table_name(&path) {
                Some(name) if self.is_source_file(&path) => name,
                _ => {
                    debug!(path = %path.display(), "not a spreadsheet source, skipped");
                    report.skipped.push(path);
                    continue;
                }
            };

            match self.build_table(&name, &path, &kind) {
                Ok(built) => self.commit(built, report)?,
                Err(e) => {
                    if matches!(e, Error::UnrecognizedKind { .. }) {
                        warn!(table = %name, "{e}");
                    } else {
                        error!(table = %name, "{e}");
                    }
                    report.failures.push(TableFailure {
                        table: name,
                        source_path: path,
                        error: e,
                    });
                }
            }
        }
        Ok(())
    }

    fn build_table(&self, name: &str, path: &Path, kind: &RecordedKind) -> Result<Built> {
        let kind = kind.require(name)?;
        let parser = parser_for(kind);

        let grid = self.grids.read_grid(path)?;
        let table = parser.parse(name, path, &grid, &self.registry)?;
        let generated = parser.generate(&table, &self.templates)?;

        let script_path = self.layout.script_path(kind, name);
        write_atomic(&script_path, generated.source.as_bytes())?;
        if let Some(data) = &generated.data {
            write_atomic(&self.layout.data_path(name), data.as_bytes())?;
        }

        Ok(Built {
            result: ParseResult::new(kind, name, path, vec![script_path]),
            enum_members: generated.enum_members,
            rows: table.row_count(),
        })
    }

    fn commit(&mut self, built: Built, report: &mut BatchReport) -> Result<()> {
        let Built {
            result,
            enum_members,
            rows,
        } = built;

        let previous = self.manifest.add(result.clone())?;
        if let Some(previous) = &previous {
            self.delete_stale_outputs(previous, &result);
            if previous.kind == RecordedKind::Known(TableKind::Enum) {
                self.registry.unregister_enum(&result.name);
            }
        }
        if let Some(members) = enum_members {
            self.registry.register_enum(&result.name, members);
        }

        info!(table = %result.name, kind = %result.kind, rows, "parsed");
        report.parsed.push(result);
        Ok(())
    }

    /// Delete files the replaced entry owned that the new entry does not
    fn delete_stale_outputs(&self, previous: &ParseResult, current: &ParseResult) {
        let keep = current.owned_files(&self.layout);
        let stale: Vec<PathBuf> = previous
            .owned_files(&self.layout)
            .into_iter()
            .filter(|p| !keep.contains(p))
            .collect();

        if let Err(e) = delete_files(&stale) {
            warn!(table = %current.name, "could not delete stale output: {e}");
        }
    }

    /// Learn the enumerations of Enum tables parsed in earlier sessions
    fn seed_registry(&mut self) {
        if self.registry_seeded {
            return;
        }
        self.registry_seeded = true;

        for entry in self.manifest.iter() {
            if entry.kind != RecordedKind::Known(TableKind::Enum) {
                continue;
            }
            match self.grids.read_grid(&entry.source_path) {
                Ok(grid) => self.registry.register_enum(&entry.name, enum_members_of(&grid)),
                Err(e) => warn!(table = %entry.name, "cannot read enumeration source: {e}"),
            }
        }
    }

    fn refresh(&mut self) {
        self.host.refresh_assets();
        self.host.refresh_open_editors();
    }
}

fn build_rank(kind: &RecordedKind) -> usize {
    kind.known()
        .and_then(|k| BUILD_ORDER.iter().position(|b| *b == k))
        .unwrap_or(BUILD_ORDER.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::read_rows_file;
    use crate::error::{RowError, SchemaError};
    use crate::table::FieldValue;
    use std::fs;

    #[derive(Default)]
    struct CountingHost {
        assets: usize,
        editors: usize,
    }

    impl Host for CountingHost {
        fn refresh_assets(&mut self) {
            self.assets += 1;
        }

        fn refresh_open_editors(&mut self) {
            self.editors += 1;
        }
    }

    struct Project {
        dir: tempfile::TempDir,
    }

    impl Project {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn layout(&self) -> OutputLayout {
            OutputLayout {
                script_dir: self.root().join("out/scripts"),
                data_dir: self.root().join("out/data"),
                script_extension: "cs".into(),
            }
        }

        fn manifest_path(&self) -> PathBuf {
            self.root().join("manifest.json")
        }

        fn sheet(&self, rel: &str, csv: &str) -> PathBuf {
            let path = self.root().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, csv).unwrap();
            path
        }

        fn dispatcher<'a>(&self, manifest: &'a mut Manifest) -> Dispatcher<'a> {
            Dispatcher::new(manifest, TemplateSet::builtin().unwrap(), self.layout())
        }
    }

    #[test]
    fn test_item_scenario_end_to_end() {
        let project = Project::new();
        let item = project.sheet(
            "Sheets/Item.csv",
            "ID,Name,Tags\nstring,string,string[]\n001,Sword,\"Sharp\nHeavy\"\n",
        );
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();

        let report = project
            .dispatcher(&mut manifest)
            .parse_files(&[item.clone()], TableKind::Convert)
            .unwrap();

        assert!(report.is_success());
        let layout = project.layout();
        let script = fs::read_to_string(layout.script_path(TableKind::Convert, "Item")).unwrap();
        assert!(script.contains("public List<string> Tags;"));
        assert!(script.contains("public string Name;"));

        let rows = read_rows_file(&layout.data_path("Item")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "001");
        assert_eq!(
            rows[0].get("Tags"),
            Some(&FieldValue::Array(vec!["Sharp".into(), "Heavy".into()]))
        );

        let entry = manifest.get("Item").unwrap();
        assert_eq!(entry.source_path, item);
        assert_eq!(entry.output_paths, vec![layout.script_path(TableKind::Convert, "Item")]);
        assert_eq!(Manifest::load(project.manifest_path()).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_table_does_not_touch_manifest() {
        let project = Project::new();
        let item = project.sheet("Item.csv", "ID,Name\nstring,string\n001,\n");
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();

        let report = project
            .dispatcher(&mut manifest)
            .parse_files(&[item], TableKind::Convert)
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0].error,
            Error::Row {
                reason: RowError::EmptyCell { column, id },
                ..
            } if column == "Name" && id == "001"
        ));
        assert!(manifest.is_empty());
        assert!(!project.manifest_path().exists());
        assert!(!project.layout().data_path("Item").exists());
    }

    #[test]
    fn test_batch_continues_past_failure_and_refreshes_once() {
        let project = Project::new();
        let files = vec![
            project.sheet("A.csv", "ID,Name\nstring,string\n1,x\n"),
            project.sheet("B.csv", "ID,Name,Name\nstring,string,int\n1,x,2\n"),
            project.sheet("C.csv", "ID,Power\nstring,int\n1,5\n"),
        ];
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();
        let mut host = CountingHost::default();

        let report = project
            .dispatcher(&mut manifest)
            .with_host(&mut host)
            .parse_files(&files, TableKind::Convert)
            .unwrap();

        assert_eq!(report.parsed.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].table, "B");
        assert!(matches!(
            report.failures[0].error,
            Error::Schema {
                reason: SchemaError::DuplicateColumn(_),
                ..
            }
        ));
        assert_eq!(manifest.names(), ["A", "C"]);
        assert_eq!((host.assets, host.editors), (1, 1));
    }

    #[test]
    fn test_manifest_write_failure_aborts_after_refresh() {
        let project = Project::new();
        let files = vec![
            project.sheet("A.csv", "ID,Name\nstring,string\n1,x\n"),
            project.sheet("B.csv", "ID,Name\nstring,string\n1,y\n"),
        ];
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();
        fs::create_dir_all(project.manifest_path().join("locked")).unwrap();
        let mut host = CountingHost::default();

        let result = project
            .dispatcher(&mut manifest)
            .with_host(&mut host)
            .parse_files(&files, TableKind::Convert);

        assert!(matches!(result, Err(Error::FileWrite { .. })));
        assert_eq!((host.assets, host.editors), (1, 1));
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_non_sources_are_skipped() {
        let project = Project::new();
        let files = vec![
            project.sheet("#Draft.csv", "ID\nstring\n"),
            project.sheet("notes.txt", "hello"),
        ];
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();

        let report = project
            .dispatcher(&mut manifest)
            .parse_files(&files, TableKind::Convert)
            .unwrap();

        assert_eq!(report.skipped, files);
        assert!(report.parsed.is_empty());
    }

    #[test]
    fn test_build_parses_enums_before_their_users() {
        let project = Project::new();
        project.sheet("Sheets/Convert/Item.csv", "ID,Rarity\nstring,EmRarity\n001,Rare\n");
        project.sheet("Sheets/Enum/Rarity.csv", "ID\nstring\nCommon\nRare\n");
        project.sheet("Sheets/Variable/Globals.csv", "ID,Max\nstring,int\nLevel,50\n");
        let sources = SourceDirs {
            convert: Some(project.root().join("Sheets/Convert")),
            enumeration: Some(project.root().join("Sheets/Enum")),
            variable: Some(project.root().join("Sheets/Variable")),
        };
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();

        let report = project.dispatcher(&mut manifest).build(&sources).unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        let order: Vec<&str> = report.parsed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, ["Rarity", "Globals", "Item"]);
        assert!(project.layout().data_path("Item").exists());
        assert!(!project.layout().data_path("Rarity").exists());
        assert!(!project.layout().data_path("Globals").exists());
    }

    #[test]
    fn test_enums_from_earlier_sessions_are_known() {
        let project = Project::new();
        let rarity = project.sheet("Rarity.csv", "ID\nstring\nCommon\nRare\n");
        let item = project.sheet("Item.csv", "ID,Rarity\nstring,EmRarity\n001,Rare\n");

        let mut manifest = Manifest::load(project.manifest_path()).unwrap();
        project
            .dispatcher(&mut manifest)
            .parse_files(&[rarity], TableKind::Enum)
            .unwrap();

        // New session: only the manifest survives
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();
        let report = project
            .dispatcher(&mut manifest)
            .parse_files(&[item], TableKind::Convert)
            .unwrap();
        assert!(report.is_success(), "{:?}", report.failures);
    }

    #[test]
    fn test_kind_change_replaces_entry_and_deletes_stale_outputs() {
        let project = Project::new();
        let sheet = project.sheet("Rarity.csv", "ID\nstring\nCommon\n");
        let layout = project.layout();
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();

        let mut dispatcher = project.dispatcher(&mut manifest);
        dispatcher.parse_files(&[sheet.clone()], TableKind::Convert).unwrap();
        assert!(layout.data_path("Rarity").exists());

        dispatcher.parse_files(&[sheet], TableKind::Enum).unwrap();
        assert!(dispatcher.registry().is_member("EmRarity", "Common"));
        drop(dispatcher);

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("Rarity").unwrap().kind, RecordedKind::Known(TableKind::Enum));
        assert!(!layout.data_path("Rarity").exists());
        assert!(!layout.script_path(TableKind::Convert, "Rarity").exists());
        assert!(layout.script_path(TableKind::Enum, "Rarity").exists());
    }

    #[test]
    fn test_reparse_reports_unrecognized_kind() {
        let project = Project::new();
        let good = project.sheet("Item.csv", "ID,Name\nstring,string\n1,x\n");
        fs::write(
            project.manifest_path(),
            format!(
                r#"[{{"kind":"Localization","name":"Text","sourcePath":"Text.csv","outputPaths":[]}},{{"kind":"Convert","name":"Item","sourcePath":{},"outputPaths":[]}}]"#,
                serde_json::to_string(&good).unwrap()
            ),
        )
        .unwrap();
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();

        let report = project
            .dispatcher(&mut manifest)
            .reparse::<&str>(&[])
            .unwrap();

        assert_eq!(report.parsed.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].table, "Text");
        assert!(matches!(report.failures[0].error, Error::UnrecognizedKind { .. }));
        assert!(manifest.get("Text").is_some());
    }

    #[test]
    fn test_remove_deletes_outputs_and_forgets_enum() {
        let project = Project::new();
        let rarity = project.sheet("Rarity.csv", "ID\nstring\nCommon\n");
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();
        let mut host = CountingHost::default();

        let mut dispatcher = project.dispatcher(&mut manifest).with_host(&mut host);
        dispatcher.parse_files(&[rarity], TableKind::Enum).unwrap();
        let removed = dispatcher.remove(&["Rarity"]).unwrap();

        assert_eq!(removed.len(), 1);
        assert!(!dispatcher.registry().is_member("EmRarity", "Common"));
        assert!(!removed[0].output_paths[0].exists());
        drop(dispatcher);

        assert!(manifest.is_empty());
        assert_eq!(host.assets, 2);
    }

    #[test]
    fn test_preview_writes_nothing() {
        let project = Project::new();
        let item = project.sheet("Item.csv", "ID,Name\nstring,string\n1,x\n");
        let mut manifest = Manifest::load(project.manifest_path()).unwrap();

        let table = project
            .dispatcher(&mut manifest)
            .preview(&item, TableKind::Convert)
            .unwrap();

        assert_eq!(table.row_count(), 1);
        assert!(!project.root().join("out").exists());
        assert!(!project.manifest_path().exists());
    }
}
