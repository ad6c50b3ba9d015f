//! Schema validation: the name and type header rows
//!
//! Row 0 holds column names, row 1 holds type tokens. Column 0 is always the
//! `ID:string` identifier column; validated columns start at index 1.

use crate::error::{Error, Result, SchemaError};
use crate::grid::Grid;
use crate::table::{is_excluded, is_identifier_like, Column, ID_COLUMN, ID_TYPE};
use crate::types::{split_array_marker, ColumnKind, TypeRegistry};
use std::collections::HashSet;
use tracing::debug;

const NAME_ROW: usize = 0;
const TYPE_ROW: usize = 1;

/// Validate the header rows of `table` and return its columns in sheet order
///
/// Scanning stops at the first empty column name; columns whose name starts
/// with the exclusion marker are skipped. The first violation is returned.
pub fn read_schema(table: &str, grid: &Grid, registry: &TypeRegistry) -> Result<Vec<Column>> {
    if !is_identifier_like(table) {
        return Err(Error::schema(
            table,
            SchemaError::InvalidTableName(table.to_string()),
        ));
    }

    let (Some(name_row), Some(_)) = (grid.row(NAME_ROW), grid.row(TYPE_ROW)) else {
        return Err(Error::schema(table, SchemaError::MissingHeader));
    };

    let id_name = grid.cell(NAME_ROW, 0).trim();
    let id_type = grid.cell(TYPE_ROW, 0).trim();
    if id_name != ID_COLUMN || id_type != ID_TYPE {
        return Err(Error::schema(
            table,
            SchemaError::InvalidIdColumn {
                name: id_name.to_string(),
                type_name: id_type.to_string(),
            },
        ));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for index in 1..name_row.len() {
        let name = grid.cell(NAME_ROW, index).trim();
        if name.is_empty() {
            break;
        }
        if is_excluded(name) {
            continue;
        }

        if !is_identifier_like(name) {
            return Err(Error::schema(
                table,
                SchemaError::LeadingDigit(name.to_string()),
            ));
        }
        if name == ID_COLUMN || !seen.insert(name) {
            return Err(Error::schema(
                table,
                SchemaError::DuplicateColumn(name.to_string()),
            ));
        }

        let type_name = grid.cell(TYPE_ROW, index).trim();
        let kind = registry.classify(type_name);
        if !kind.is_valid() {
            return Err(Error::schema(
                table,
                SchemaError::InvalidType {
                    column: name.to_string(),
                    type_name: type_name.to_string(),
                },
            ));
        }

        let (element_type, is_array) = split_array_marker(type_name);
        debug!(table, column = name, type_name, ?kind, "column validated");

        columns.push(Column {
            index,
            name: name.to_string(),
            type_name: type_name.to_string(),
            element_type: element_type.to_string(),
            is_array,
            kind,
        });
    }

    Ok(columns)
}

/// The enumeration columns of a schema, with their enum type names
pub fn enumeration_columns(columns: &[Column]) -> impl Iterator<Item = (&Column, &str)> {
    columns
        .iter()
        .filter(|c| matches!(c.kind, ColumnKind::Enumeration))
        .map(|c| (c, c.element_type.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::parse_grid_str;
    use crate::types::Primitive;

    fn schema(csv: &str) -> Result<Vec<Column>> {
        let grid = parse_grid_str(csv, "t.csv").unwrap();
        read_schema("Item", &grid, &TypeRegistry::new())
    }

    fn schema_error(csv: &str) -> SchemaError {
        match schema(csv).unwrap_err() {
            Error::Schema { table, reason } => {
                assert_eq!(table, "Item");
                reason
            }
            other => panic!("expected schema error, got {other}"),
        }
    }

    #[test]
    fn test_columns_in_sheet_order() {
        let columns = schema("ID,Name,Tags,Weapon\nstring,string,string[],TbWeapon\n").unwrap();

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Name", "Tags", "Weapon"]);
        assert_eq!(columns[0].index, 1);
        assert_eq!(columns[0].kind, ColumnKind::Primitive(Primitive::String));
        assert!(columns[1].is_array);
        assert_eq!(columns[1].element_type, "string");
        assert_eq!(columns[2].kind, ColumnKind::TableReference);
    }

    #[test]
    fn test_excluded_columns_skipped_but_scan_continues() {
        let columns = schema("ID,#Note,Name\nstring,whatever,string\n").unwrap();

        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "Name");
        assert_eq!(columns[0].index, 2);
    }

    #[test]
    fn test_empty_name_ends_schema() {
        let columns = schema("ID,Name,,1bad,Name\nstring,string,,garbage,int\n").unwrap();

        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "Name");
    }

    #[test]
    fn test_names_and_types_are_trimmed() {
        let columns = schema("ID, Name \nstring, int \n").unwrap();
        assert_eq!(columns[0].name, "Name");
        assert_eq!(columns[0].type_name, "int");
    }

    #[test]
    fn test_id_column_must_be_id_string() {
        assert_eq!(
            schema_error("Key,Name\nstring,string\n"),
            SchemaError::InvalidIdColumn {
                name: "Key".into(),
                type_name: "string".into()
            }
        );
        assert!(matches!(
            schema_error("ID,Name\nint,string\n"),
            SchemaError::InvalidIdColumn { .. }
        ));
    }

    #[test]
    fn test_missing_type_row() {
        assert_eq!(schema_error("ID,Name\n"), SchemaError::MissingHeader);
    }

    #[test]
    fn test_leading_digit_rejected_regardless_of_type() {
        assert_eq!(
            schema_error("ID,2ndName\nstring,string\n"),
            SchemaError::LeadingDigit("2ndName".into())
        );
        assert_eq!(
            schema_error("ID,9Lives\nstring,nonsense\n"),
            SchemaError::LeadingDigit("9Lives".into())
        );
    }

    #[test]
    fn test_duplicate_names_rejected_case_sensitively() {
        assert_eq!(
            schema_error("ID,Name,Name\nstring,string,int\n"),
            SchemaError::DuplicateColumn("Name".into())
        );
        assert_eq!(
            schema_error("ID,ID\nstring,string\n"),
            SchemaError::DuplicateColumn("ID".into())
        );

        let columns = schema("ID,Name,name\nstring,string,int\n").unwrap();
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_invalid_types_rejected() {
        assert_eq!(
            schema_error("ID,Power\nstring,integer\n"),
            SchemaError::InvalidType {
                column: "Power".into(),
                type_name: "integer".into()
            }
        );
        assert!(matches!(
            schema_error("ID,Rarity\nstring,EmRarity\n"),
            SchemaError::InvalidType { .. }
        ));
    }

    #[test]
    fn test_registered_enumeration_accepted() {
        let grid = parse_grid_str("ID,Rarity\nstring,EmRarity[]\n", "t.csv").unwrap();
        let mut registry = TypeRegistry::new();
        registry.register_enum("Rarity", vec!["Common".into()]);

        let columns = read_schema("Item", &grid, &registry).unwrap();
        assert_eq!(columns[0].kind, ColumnKind::Enumeration);

        let enums: Vec<&str> = enumeration_columns(&columns).map(|(_, e)| e).collect();
        assert_eq!(enums, ["EmRarity"]);
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        let grid = parse_grid_str("ID\nstring\n", "t.csv").unwrap();
        let err = read_schema("3Items", &grid, &TypeRegistry::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema {
                reason: SchemaError::InvalidTableName(_),
                ..
            }
        ));
    }
}
