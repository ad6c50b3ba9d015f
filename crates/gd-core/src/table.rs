//! Core table types shared by the validators, renderers and emitters

use crate::types::ColumnKind;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Name of the identifier column
pub const ID_COLUMN: &str = "ID";

/// Declared type of the identifier column
pub const ID_TYPE: &str = "string";

/// Leading character marking a header, cell or file as commentary
pub const EXCLUSION_MARKER: char = '#';

/// Leading character of the data key used for table reference columns
pub const REFERENCE_KEY_PREFIX: char = '@';

/// Whether a header name, cell or file name is commentary
pub fn is_excluded(text: &str) -> bool {
    text.starts_with(EXCLUSION_MARKER)
}

/// Whether `name` can become an identifier in generated code
pub fn is_identifier_like(name: &str) -> bool {
    name.chars().next().is_some_and(|c| !c.is_ascii_digit())
}

/// The schema families the pipeline knows how to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableKind {
    /// Record tables, emitted as accessor code plus a JSON data file
    Convert,
    /// Enumerations, one member per row
    Enum,
    /// Constants embedded directly in generated code
    Variable,
}

impl TableKind {
    pub const ALL: [TableKind; 3] = [TableKind::Convert, TableKind::Enum, TableKind::Variable];

    /// Name as recorded in the manifest and used for output directories
    pub fn name(self) -> &'static str {
        match self {
            TableKind::Convert => "Convert",
            TableKind::Enum => "Enum",
            TableKind::Variable => "Variable",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TableKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown table kind '{s}' (expected convert, enum or variable)"))
    }
}

/// A validated column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Position in the sheet row (always >= 1)
    pub index: usize,
    /// Column name, trimmed
    pub name: String,
    /// Full type token, array marker included (e.g. "string[]")
    pub type_name: String,
    /// Type token without the array marker (e.g. "string")
    pub element_type: String,
    /// Whether the cell holds a line-break separated list
    pub is_array: bool,
    pub kind: ColumnKind,
}

impl Column {
    /// Whether this column holds identifiers of another table
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, ColumnKind::TableReference)
    }

    /// Key the column's values are stored under in a [`Row`]
    pub fn key(&self) -> String {
        if self.is_reference() {
            format!("{REFERENCE_KEY_PREFIX}{}", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// A validated cell value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Array(Vec<String>),
}

impl FieldValue {
    /// The value's elements; a scalar is a single element
    pub fn elements(&self) -> &[String] {
        match self {
            FieldValue::Scalar(s) => std::slice::from_ref(s),
            FieldValue::Array(items) => items,
        }
    }
}

/// A validated data row
///
/// Serializes as a JSON object with `"ID"` first and the cells in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Unique identifier from column 0
    pub id: String,
    /// (key, value) pairs in schema order; excluded cells are absent
    pub cells: Vec<(String, FieldValue)>,
}

impl Row {
    /// Create a new row
    pub fn new(id: impl Into<String>, cells: Vec<(String, FieldValue)>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    /// Get a cell value by key
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len() + 1))?;
        map.serialize_entry(ID_COLUMN, &self.id)?;
        for (key, value) in &self.cells {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a record object with an \"ID\" field")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Row, A::Error> {
                let mut id = None;
                let mut cells = Vec::new();
                while let Some(key) = access.next_key::<String>()? {
                    if key == ID_COLUMN {
                        id = Some(access.next_value::<String>()?);
                    } else {
                        cells.push((key, access.next_value::<FieldValue>()?));
                    }
                }
                let id = id.ok_or_else(|| de::Error::missing_field(ID_COLUMN))?;
                Ok(Row { id, cells })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// A fully validated table, ready for rendering and emission
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name (the source file stem)
    pub name: String,
    pub kind: TableKind,
    /// Column definitions in sheet order
    pub columns: Vec<Column>,
    /// Row data in sheet order
    pub rows: Vec<Row>,
    /// Source file path
    pub source_path: PathBuf,
}

impl Table {
    /// Get the number of columns (excluding ID)
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find a row by ID
    pub fn find_row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }
}
