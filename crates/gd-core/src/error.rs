//! Error types for gd-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gd-core
#[derive(Debug, Error)]
pub enum Error {
    /// The header rows of a table are malformed
    #[error("schema error in table '{table}': {reason}")]
    Schema { table: String, reason: SchemaError },

    /// A data row of a table is malformed
    #[error("row error in table '{table}': {reason}")]
    Row { table: String, reason: RowError },

    /// A manifested table records a kind no parser exists for
    #[error(
        "table '{table}' is recorded with unrecognized kind '{kind}'; remove it and parse it again"
    )]
    UnrecognizedKind { table: String, kind: String },

    /// A template failed to load
    #[error("template '{name}': {message}")]
    Template { name: String, message: String },

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a schema error for `table`
    pub fn schema(table: impl Into<String>, reason: SchemaError) -> Self {
        Error::Schema {
            table: table.into(),
            reason,
        }
    }

    /// Build a row error for `table`
    pub fn row(table: impl Into<String>, reason: RowError) -> Self {
        Error::Row {
            table: table.into(),
            reason,
        }
    }

    /// True for failures caused by the table's own content
    pub fn is_table_scoped(&self) -> bool {
        matches!(self, Error::Schema { .. } | Error::Row { .. })
    }
}

/// Reasons a table header is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("the name and type header rows are missing")]
    MissingHeader,

    #[error("table name '{0}' cannot be used as an identifier")]
    InvalidTableName(String),

    #[error("column 0 must be named 'ID' with type 'string', found '{name}' with type '{type_name}'")]
    InvalidIdColumn { name: String, type_name: String },

    #[error("column name '{0}' starts with a digit")]
    LeadingDigit(String),

    #[error("column name '{0}' is declared more than once")]
    DuplicateColumn(String),

    #[error("column '{column}' has invalid type '{type_name}'")]
    InvalidType { column: String, type_name: String },
}

/// Reasons a data row is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("identifier '{0}' is used by more than one row")]
    DuplicateId(String),

    #[error("identifier '{0}' cannot be used as a code identifier")]
    InvalidId(String),

    #[error("identifier '{0}' repeats the table name")]
    IdMatchesTable(String),

    #[error("row '{id}' excludes its value but the table declares explicit values")]
    MissingEnumValue { id: String },

    #[error("empty cell in column '{column}' of row '{id}'")]
    EmptyCell { column: String, id: String },

    #[error("column '{column}' of row '{id}' holds several values but is not an array")]
    NotAnArray { column: String, id: String },

    #[error("value '{value}' in column '{column}' of row '{id}' is not a valid {type_name}")]
    InvalidValue {
        column: String,
        id: String,
        type_name: String,
        value: String,
    },

    #[error("value '{value}' in column '{column}' of row '{id}' is not a member of {enum_name}")]
    UnknownMember {
        column: String,
        id: String,
        enum_name: String,
        value: String,
    },
}
