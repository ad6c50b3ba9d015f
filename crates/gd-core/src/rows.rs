//! Row validation: the data region below the header rows

use crate::error::{Error, Result, RowError};
use crate::grid::Grid;
use crate::table::{is_excluded, is_identifier_like, Column, FieldValue, Row};
use crate::types::{ColumnKind, TypeRegistry};
use std::collections::HashSet;

/// First row of the data region (rows 0 and 1 are the header)
pub const DATA_START_ROW: usize = 2;

/// Validate the data rows of `table` against its columns
///
/// Scanning stops at the first row with an empty identifier; rows whose
/// identifier starts with the exclusion marker are skipped. The first
/// violation is returned.
pub fn read_rows(
    table: &str,
    columns: &[Column],
    grid: &Grid,
    registry: &TypeRegistry,
) -> Result<Vec<Row>> {
    let mut ids = HashSet::new();
    let mut rows = Vec::new();

    for row_index in DATA_START_ROW..grid.row_count() {
        let id = grid.cell(row_index, 0).trim();
        if id.is_empty() {
            break;
        }
        if is_excluded(id) {
            continue;
        }
        if !ids.insert(id) {
            return Err(Error::row(table, RowError::DuplicateId(id.to_string())));
        }

        let mut cells = Vec::with_capacity(columns.len());
        for column in columns {
            let text = grid.cell(row_index, column.index).trim();
            if is_excluded(text) {
                continue;
            }
            let value = read_cell(column, id, text, registry).map_err(|e| Error::row(table, e))?;
            cells.push((column.key(), value));
        }

        rows.push(Row::new(id, cells));
    }

    Ok(rows)
}

/// Reject identifiers that cannot become code identifiers (Enum and Variable tables)
pub fn check_identifier_ids(table: &str, rows: &[Row]) -> Result<()> {
    match rows.iter().find(|r| !is_identifier_like(&r.id)) {
        Some(row) => Err(Error::row(table, RowError::InvalidId(row.id.clone()))),
        None => Ok(()),
    }
}

/// Split cell text into list elements, one per line; blank lines are dropped
pub fn split_elements(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_cell(
    column: &Column,
    id: &str,
    text: &str,
    registry: &TypeRegistry,
) -> std::result::Result<FieldValue, RowError> {
    if text.is_empty() {
        return Err(RowError::EmptyCell {
            column: column.name.clone(),
            id: id.to_string(),
        });
    }

    let elements = split_elements(text);
    if elements.len() > 1 && !column.is_array {
        return Err(RowError::NotAnArray {
            column: column.name.clone(),
            id: id.to_string(),
        });
    }

    for element in &elements {
        let valid = match column.kind {
            ColumnKind::Primitive(primitive) => registry.validate(primitive, element),
            ColumnKind::Enumeration => {
                if !registry.is_member(&column.element_type, element) {
                    return Err(RowError::UnknownMember {
                        column: column.name.clone(),
                        id: id.to_string(),
                        enum_name: column.element_type.clone(),
                        value: element.clone(),
                    });
                }
                true
            }
            ColumnKind::TableReference | ColumnKind::Variable => true,
            ColumnKind::Invalid => false,
        };

        if !valid {
            return Err(RowError::InvalidValue {
                column: column.name.clone(),
                id: id.to_string(),
                type_name: column.element_type.clone(),
                value: element.clone(),
            });
        }
    }

    Ok(if column.is_array {
        FieldValue::Array(elements)
    } else {
        FieldValue::Scalar(elements.into_iter().next().unwrap_or_default())
    })
}
