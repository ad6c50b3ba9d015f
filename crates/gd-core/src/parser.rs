//! Kind-specific table parsers
//!
//! All kinds share schema and row validation; a parser adds its own checks
//! and decides what gets generated.

use crate::codegen::{enum_values, render_convert, render_enum, render_variable};
use crate::emit::rows_to_json;
use crate::error::{Error, Result, RowError};
use crate::grid::Grid;
use crate::rows::{check_identifier_ids, read_rows, DATA_START_ROW};
use crate::schema::read_schema;
use crate::table::{is_excluded, Table, TableKind};
use crate::template::TemplateSet;
use crate::types::TypeRegistry;
use std::path::Path;

/// Everything a parsed table produces, before it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Generated source text
    pub source: String,
    /// JSON record list (Convert tables only)
    pub data: Option<String>,
    /// Members to register as an enumeration (Enum tables only)
    pub enum_members: Option<Vec<String>>,
}

/// A parser for one table kind
pub trait TableParser {
    fn kind(&self) -> TableKind;

    /// Checks beyond the shared schema and row validation
    fn check(&self, _table: &Table) -> Result<()> {
        Ok(())
    }

    /// Render the table's artifacts
    fn generate(&self, table: &Table, templates: &TemplateSet) -> Result<Generated>;

    /// Validate a grid into a table of this kind
    fn parse(&self, name: &str, source_path: &Path, grid: &Grid, registry: &TypeRegistry) -> Result<Table> {
        let columns = read_schema(name, grid, registry)?;
        let rows = read_rows(name, &columns, grid, registry)?;
        let table = Table {
            name: name.to_string(),
            kind: self.kind(),
            columns,
            rows,
            source_path: source_path.to_path_buf(),
        };
        self.check(&table)?;
        Ok(table)
    }
}

/// Record tables: accessor class plus JSON data
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertParser;

impl TableParser for ConvertParser {
    fn kind(&self) -> TableKind {
        TableKind::Convert
    }

    fn generate(&self, table: &Table, templates: &TemplateSet) -> Result<Generated> {
        Ok(Generated {
            source: render_convert(&table.name, &table.columns, &templates.convert),
            data: Some(rows_to_json(&table.rows)?),
            enum_members: None,
        })
    }
}

/// Enum tables: one member per row
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumParser;

impl TableParser for EnumParser {
    fn kind(&self) -> TableKind {
        TableKind::Enum
    }

    fn check(&self, table: &Table) -> Result<()> {
        check_identifier_ids(&table.name, &table.rows)?;
        enum_values(&table.name, &table.columns, &table.rows).map(|_| ())
    }

    fn generate(&self, table: &Table, templates: &TemplateSet) -> Result<Generated> {
        Ok(Generated {
            source: render_enum(&table.name, &table.columns, &table.rows, &templates.enumeration)?,
            data: None,
            enum_members: Some(table.rows.iter().map(|r| r.id.clone()).collect()),
        })
    }
}

/// Variable tables: constants embedded in the generated source
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableParser;

impl TableParser for VariableParser {
    fn kind(&self) -> TableKind {
        TableKind::Variable
    }

    fn check(&self, table: &Table) -> Result<()> {
        check_identifier_ids(&table.name, &table.rows)?;
        // A nested class may not share its enclosing class's name
        match table.rows.iter().find(|row| row.id == table.name) {
            Some(row) => Err(Error::row(&table.name, RowError::IdMatchesTable(row.id.clone()))),
            None => Ok(()),
        }
    }

    fn generate(&self, table: &Table, templates: &TemplateSet) -> Result<Generated> {
        Ok(Generated {
            source: render_variable(&table.name, &table.columns, &table.rows, &templates.variable),
            data: None,
            enum_members: None,
        })
    }
}

/// Construct the parser for `kind`
pub fn parser_for(kind: TableKind) -> Box<dyn TableParser> {
    match kind {
        TableKind::Convert => Box::new(ConvertParser),
        TableKind::Enum => Box::new(EnumParser),
        TableKind::Variable => Box::new(VariableParser),
    }
}

/// Identifiers of the member rows of an Enum grid, without full validation
///
/// Used to learn enumerations from sources parsed in an earlier session.
pub fn enum_members_of(grid: &Grid) -> Vec<String> {
    (DATA_START_ROW..grid.row_count())
        .map(|r| grid.cell(r, 0).trim())
        .take_while(|id| !id.is_empty())
        .filter(|id| !is_excluded(id))
        .map(str::to_string)
        .collect()
}
