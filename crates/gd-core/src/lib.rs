//! gd-core: Core library for turning game-data spreadsheets into code and data
//!
//! This library provides functionality to:
//! - Classify column types (primitives, table references, enumerations)
//! - Validate sheet headers and data rows
//! - Render typed source files from named-slot templates
//! - Emit Convert tables as JSON record lists
//! - Dispatch batches of sources and keep a persistent manifest of results

pub mod codegen;
pub mod config;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod grid;
pub mod manifest;
pub mod parser;
pub mod rows;
pub mod scanner;
pub mod schema;
pub mod table;
pub mod template;
pub mod types;

pub use config::{Config, OutputLayout, SourceDirs, CONFIG_FILE_NAME};
pub use dispatch::{BatchReport, Dispatcher, Host, NullHost, TableFailure};
pub use error::{Error, Result, RowError, SchemaError};
pub use grid::{CsvGridSource, Grid, GridSource};
pub use manifest::{Manifest, ParseResult, RecordedKind};
pub use parser::{parser_for, Generated, TableParser};
pub use scanner::{is_source_file, scan_sources};
pub use schema::{enumeration_columns, read_schema};
pub use table::{Column, FieldValue, Row, Table, TableKind};
pub use template::TemplateSet;
pub use types::{ColumnKind, Primitive, TypeRegistry};
