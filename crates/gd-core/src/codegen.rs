//! Source generation: instantiate the templates for a validated table

use crate::error::{Error, Result, RowError};
use crate::table::{Column, FieldValue, Row, Table, TableKind};
use crate::template::{ConvertTemplates, EnumTemplates, TemplateSet, VariableTemplates};
use crate::types::{ColumnKind, Primitive};

/// Name of the Enum table column holding explicit member values
pub const ENUM_VALUE_COLUMN: &str = "Value";

/// Render the generated source for `table` with the templates of its kind
pub fn render_table(table: &Table, templates: &TemplateSet) -> Result<String> {
    match table.kind {
        TableKind::Convert => Ok(render_convert(&table.name, &table.columns, &templates.convert)),
        TableKind::Enum => render_enum(&table.name, &table.columns, &table.rows, &templates.enumeration),
        TableKind::Variable => Ok(render_variable(&table.name, &table.columns, &table.rows, &templates.variable)),
    }
}

/// Render a Convert table: one field snippet per column, in schema order
pub fn render_convert(name: &str, columns: &[Column], templates: &ConvertTemplates) -> String {
    let mut fields = String::new();
    for column in columns {
        let key = column.key();
        fields.push_str(&templates.fields.select(column).render(&[
            ("name", column.name.as_str()),
            ("type", column.type_name.as_str()),
            ("element", column.element_type.as_str()),
            ("key", key.as_str()),
        ]));
    }

    templates
        .table
        .render(&[("name", name), ("columns", fields.as_str())])
}

/// The `int` column named `Value` that holds explicit member values, if any
pub fn enum_value_column(columns: &[Column]) -> Option<&Column> {
    columns.iter().find(|c| {
        c.name == ENUM_VALUE_COLUMN && !c.is_array && c.kind == ColumnKind::Primitive(Primitive::Int)
    })
}

/// Member values of an Enum table, in row order
///
/// With a `Value` column every row must carry its value; without one each
/// member takes its position.
pub fn enum_values(name: &str, columns: &[Column], rows: &[Row]) -> Result<Vec<String>> {
    let Some(key) = enum_value_column(columns).map(Column::key) else {
        return Ok((0..rows.len()).map(|ordinal| ordinal.to_string()).collect());
    };

    rows.iter()
        .map(|row| {
            row.get(&key)
                .and_then(|v| v.elements().first().cloned())
                .ok_or_else(|| Error::row(name, RowError::MissingEnumValue { id: row.id.clone() }))
        })
        .collect()
}

/// Render an Enum table: one member per row
pub fn render_enum(name: &str, columns: &[Column], rows: &[Row], templates: &EnumTemplates) -> Result<String> {
    let values = enum_values(name, columns, rows)?;

    let mut members = String::new();
    for (row, value) in rows.iter().zip(&values) {
        members.push_str(&templates.member.render(&[("name", row.id.as_str()), ("value", value.as_str())]));
    }

    Ok(templates
        .table
        .render(&[("name", name), ("members", members.as_str())]))
}

/// Render a Variable table: one block per row, one literal field per cell
pub fn render_variable(
    name: &str,
    columns: &[Column],
    rows: &[Row],
    templates: &VariableTemplates,
) -> String {
    let mut blocks = String::new();
    for row in rows {
        let mut fields = String::new();
        for column in columns {
            let Some(value) = row.get(&column.key()) else {
                continue;
            };
            let literal = value_literal(column, value);
            fields.push_str(&templates.fields.select(column).render(&[
                ("name", column.name.as_str()),
                ("type", column.type_name.as_str()),
                ("element", column.element_type.as_str()),
                ("value", literal.as_str()),
            ]));
        }
        blocks.push_str(&templates.row.render(&[("id", row.id.as_str()), ("fields", fields.as_str())]));
    }

    templates
        .table
        .render(&[("name", name), ("rows", blocks.as_str())])
}

/// Source literal for a cell value; array elements are joined with ", "
pub fn value_literal(column: &Column, value: &FieldValue) -> String {
    value
        .elements()
        .iter()
        .map(|element| element_literal(column, element))
        .collect::<Vec<_>>()
        .join(", ")
}

fn element_literal(column: &Column, element: &str) -> String {
    match column.kind {
        ColumnKind::Primitive(Primitive::String) | ColumnKind::TableReference => {
            quote(element)
        }
        ColumnKind::Primitive(Primitive::Bool) => element.to_ascii_lowercase(),
        ColumnKind::Primitive(Primitive::Float) => format!("{}f", float_literal(element)),
        ColumnKind::Primitive(Primitive::Double) => float_literal(element),
        ColumnKind::Primitive(Primitive::Long) => format!("{element}L"),
        ColumnKind::Enumeration => format!("{}.{element}", column.element_type),
        // Numbers are already validated; Va values are host expressions
        ColumnKind::Primitive(_) | ColumnKind::Variable | ColumnKind::Invalid => {
            element.to_string()
        }
    }
}

/// Reprint a validated float so forms like `5.` and `.5` become `5.0` and `0.5`
fn float_literal(element: &str) -> String {
    match element.parse::<f64>() {
        Ok(value) => format!("{value:?}"),
        Err(_) => element.to_string(),
    }
}

/// Quote a string as a C-family string literal
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
