//! Text templates with named `{{slot}}` placeholders
//!
//! A template is split into literal and slot segments once, when it is loaded,
//! and every slot is checked against the names its role accepts. Rendering
//! concatenates segments and never re-scans substituted text, so cell or column
//! text that happens to contain `{{...}}` is emitted as-is.

use crate::error::{Error, Result};
use crate::table::Column;
use std::fs;
use std::path::Path;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `text`, accepting only the slot names in `allowed`
    pub fn parse(name: &str, text: &str, allowed: &[&str]) -> Result<Self> {
        let error = |message: String| Error::Template {
            name: name.to_string(),
            message,
        };

        let mut segments = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open
                .find(CLOSE)
                .ok_or_else(|| error(format!("unterminated '{OPEN}' at byte {}", text.len() - rest.len() + start)))?;

            let slot = after_open[..end].trim();
            if !allowed.contains(&slot) {
                return Err(error(format!(
                    "unknown slot '{slot}' (expected one of: {})",
                    allowed.join(", ")
                )));
            }
            segments.push(Segment::Slot(slot.to_string()));
            rest = &after_open[end + CLOSE.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    /// Template name (its relative file path)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render with the given slot values; slots without a value render empty
    pub fn render(&self, slots: &[(&str, &str)]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => {
                    if let Some((_, value)) = slots.iter().find(|(name, _)| name == slot) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

const CONVERT_TABLE_SLOTS: &[&str] = &["name", "columns"];
const FIELD_SLOTS: &[&str] = &["name", "type", "element", "key"];
const ENUM_TABLE_SLOTS: &[&str] = &["name", "members"];
const ENUM_MEMBER_SLOTS: &[&str] = &["name", "value"];
const VARIABLE_TABLE_SLOTS: &[&str] = &["name", "rows"];
const VARIABLE_ROW_SLOTS: &[&str] = &["id", "fields"];
const VARIABLE_FIELD_SLOTS: &[&str] = &["name", "type", "element", "value"];

/// The four per-column snippets: {local, reference} x {scalar, array}
#[derive(Debug, Clone)]
pub struct FieldSnippets {
    pub local: Template,
    pub local_array: Template,
    pub reference: Template,
    pub reference_array: Template,
}

impl FieldSnippets {
    /// Pick the snippet for a column by (is reference, is array)
    pub fn select(&self, column: &Column) -> &Template {
        match (column.is_reference(), column.is_array) {
            (false, false) => &self.local,
            (false, true) => &self.local_array,
            (true, false) => &self.reference,
            (true, true) => &self.reference_array,
        }
    }

    fn load(loader: &Loader<'_>, dir: &str, allowed: &[&str]) -> Result<Self> {
        Ok(Self {
            local: loader.load(&format!("{dir}/field.tpl"), allowed)?,
            local_array: loader.load(&format!("{dir}/field_array.tpl"), allowed)?,
            reference: loader.load(&format!("{dir}/reference.tpl"), allowed)?,
            reference_array: loader.load(&format!("{dir}/reference_array.tpl"), allowed)?,
        })
    }
}

/// Templates for Convert tables
#[derive(Debug, Clone)]
pub struct ConvertTemplates {
    pub table: Template,
    pub fields: FieldSnippets,
}

/// Templates for Enum tables
#[derive(Debug, Clone)]
pub struct EnumTemplates {
    pub table: Template,
    pub member: Template,
}

/// Templates for Variable tables
#[derive(Debug, Clone)]
pub struct VariableTemplates {
    pub table: Template,
    pub row: Template,
    pub fields: FieldSnippets,
}

/// Every template the renderers use
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub convert: ConvertTemplates,
    pub enumeration: EnumTemplates,
    pub variable: VariableTemplates,
}

impl TemplateSet {
    /// Load the built-in templates, overriding any file present under `dir`
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let loader = Loader { dir };
        Ok(Self {
            convert: ConvertTemplates {
                table: loader.load("convert/table.tpl", CONVERT_TABLE_SLOTS)?,
                fields: FieldSnippets::load(&loader, "convert", FIELD_SLOTS)?,
            },
            enumeration: EnumTemplates {
                table: loader.load("enum/table.tpl", ENUM_TABLE_SLOTS)?,
                member: loader.load("enum/member.tpl", ENUM_MEMBER_SLOTS)?,
            },
            variable: VariableTemplates {
                table: loader.load("variable/table.tpl", VARIABLE_TABLE_SLOTS)?,
                row: loader.load("variable/row.tpl", VARIABLE_ROW_SLOTS)?,
                fields: FieldSnippets::load(&loader, "variable", VARIABLE_FIELD_SLOTS)?,
            },
        })
    }

    /// The built-in templates
    pub fn builtin() -> Result<Self> {
        Self::load(None)
    }
}

struct Loader<'a> {
    dir: Option<&'a Path>,
}

impl Loader<'_> {
    fn load(&self, name: &str, allowed: &[&str]) -> Result<Template> {
        if let Some(path) = self.dir.map(|d| d.join(name)).filter(|p| p.is_file()) {
            let text = fs::read_to_string(&path).map_err(|e| Error::FileRead { path, source: e })?;
            return Template::parse(name, &text, allowed);
        }

        let text = builtin(name).ok_or_else(|| Error::Template {
            name: name.to_string(),
            message: "no built-in template with this name".to_string(),
        })?;
        Template::parse(name, text, allowed)
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    Some(match name {
        "convert/table.tpl" => include_str!("../templates/convert/table.tpl"),
        "convert/field.tpl" => include_str!("../templates/convert/field.tpl"),
        "convert/field_array.tpl" => include_str!("../templates/convert/field_array.tpl"),
        "convert/reference.tpl" => include_str!("../templates/convert/reference.tpl"),
        "convert/reference_array.tpl" => include_str!("../templates/convert/reference_array.tpl"),
        "enum/table.tpl" => include_str!("../templates/enum/table.tpl"),
        "enum/member.tpl" => include_str!("../templates/enum/member.tpl"),
        "variable/table.tpl" => include_str!("../templates/variable/table.tpl"),
        "variable/row.tpl" => include_str!("../templates/variable/row.tpl"),
        "variable/field.tpl" => include_str!("../templates/variable/field.tpl"),
        "variable/field_array.tpl" => include_str!("../templates/variable/field_array.tpl"),
        "variable/reference.tpl" => include_str!("../templates/variable/reference.tpl"),
        "variable/reference_array.tpl" => include_str!("../templates/variable/reference_array.tpl"),
        _ => return None,
    })
}
