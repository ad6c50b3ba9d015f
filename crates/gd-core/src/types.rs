//! Type registry: primitive validators and the type naming convention
//!
//! Every column type is classified by [`TypeRegistry::classify`] into a closed
//! [`ColumnKind`]. The two-letter prefix convention (`Tb`, `Em`, `Va`) is only
//! interpreted here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix marking a type as a line-break separated list
pub const ARRAY_MARKER: &str = "[]";

/// Prefix of types that reference another Convert table
pub const TABLE_REFERENCE_PREFIX: &str = "Tb";

/// Prefix of enumeration types generated from Enum tables
pub const ENUMERATION_PREFIX: &str = "Em";

/// Prefix of opaque host types, never validated
pub const VARIABLE_PREFIX: &str = "Va";

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Bool,
        Primitive::Byte,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::String,
    ];

    /// Look up a primitive by its type token
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The type token used in sheet headers
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::String => "string",
        }
    }

    /// Check whether a single cell value parses as this type
    pub fn validate(self, text: &str) -> bool {
        match self {
            Primitive::Bool => {
                text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false")
            }
            Primitive::Byte => text.parse::<u8>().is_ok(),
            Primitive::Short => text.parse::<i16>().is_ok(),
            Primitive::Int => text.parse::<i32>().is_ok(),
            Primitive::Long => text.parse::<i64>().is_ok(),
            Primitive::Float => text.parse::<f32>().is_ok_and(f32::is_finite),
            Primitive::Double => text.parse::<f64>().is_ok_and(f64::is_finite),
            Primitive::String => true,
        }
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a column's values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Primitive(Primitive),
    /// Identifier of a row in another Convert table
    TableReference,
    /// Member of an enumeration known to the registry
    Enumeration,
    /// Opaque host type, written through verbatim
    Variable,
    Invalid,
}

impl ColumnKind {
    pub fn is_valid(self) -> bool {
        !matches!(self, ColumnKind::Invalid)
    }
}

/// Split a type token into its element type and array flag
///
/// `"int[]"` -> `("int", true)`, `"int"` -> `("int", false)`
pub fn split_array_marker(type_token: &str) -> (&str, bool) {
    match type_token.strip_suffix(ARRAY_MARKER) {
        Some(element) => (element.trim_end(), true),
        None => (type_token, false),
    }
}

/// Name of the enumeration type generated from an Enum table
pub fn enum_type_name(table: &str) -> String {
    format!("{ENUMERATION_PREFIX}{table}")
}

/// Known types: the fixed primitives plus enumerations from parsed Enum tables
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// Enumeration type name -> members in declaration order
    enums: BTreeMap<String, Vec<String>>,
}

impl TypeRegistry {
    /// Create a registry that knows only the primitives
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `type_name` (without array marker) is a primitive
    pub fn is_primitive(&self, type_name: &str) -> bool {
        Primitive::from_name(type_name).is_some()
    }

    /// Validate a cell value against a primitive
    pub fn validate(&self, primitive: Primitive, text: &str) -> bool {
        primitive.validate(text)
    }

    /// Classify a non-primitive type name by its prefix
    pub fn resolve_reference_kind(&self, type_name: &str) -> ColumnKind {
        let has_prefix = |prefix: &str| {
            type_name
                .strip_prefix(prefix)
                .is_some_and(|rest| !rest.is_empty())
        };

        if has_prefix(TABLE_REFERENCE_PREFIX) {
            ColumnKind::TableReference
        } else if has_prefix(ENUMERATION_PREFIX) {
            if self.enums.contains_key(type_name) {
                ColumnKind::Enumeration
            } else {
                ColumnKind::Invalid
            }
        } else if has_prefix(VARIABLE_PREFIX) {
            ColumnKind::Variable
        } else {
            ColumnKind::Invalid
        }
    }

    /// Classify a full type token, array marker included
    pub fn classify(&self, type_token: &str) -> ColumnKind {
        let (element, _) = split_array_marker(type_token);
        match Primitive::from_name(element) {
            Some(primitive) => ColumnKind::Primitive(primitive),
            None => self.resolve_reference_kind(element),
        }
    }

    /// Register (or replace) the members of the enumeration generated from `table`
    pub fn register_enum(&mut self, table: &str, members: Vec<String>) {
        self.enums.insert(enum_type_name(table), members);
    }

    /// Forget the enumeration generated from `table`
    pub fn unregister_enum(&mut self, table: &str) {
        self.enums.remove(&enum_type_name(table));
    }

    /// Members of an enumeration type, if it is known
    pub fn enum_members(&self, type_name: &str) -> Option<&[String]> {
        self.enums.get(type_name).map(Vec::as_slice)
    }

    /// Whether `value` is a member of enumeration `type_name`
    pub fn is_member(&self, type_name: &str, value: &str) -> bool {
        self.enum_members(type_name)
            .is_some_and(|members| members.iter().any(|m| m == value))
    }

    /// Names of all known enumeration types
    pub fn enum_names(&self) -> impl Iterator<Item = &str> {
        self.enums.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_validators() {
        assert!(Primitive::Int.validate("-42"));
        assert!(!Primitive::Int.validate("4.2"));
        assert!(!Primitive::Int.validate("3000000000"));
        assert!(Primitive::Long.validate("3000000000"));
        assert!(Primitive::Byte.validate("255"));
        assert!(!Primitive::Byte.validate("256"));
        assert!(!Primitive::Short.validate("40000"));
        assert!(Primitive::Float.validate("3.5"));
        assert!(!Primitive::Float.validate("1e40"));
        assert!(!Primitive::Double.validate("NaN"));
        assert!(Primitive::Bool.validate("True"));
        assert!(Primitive::Bool.validate("false"));
        assert!(!Primitive::Bool.validate("1"));
        assert!(Primitive::String.validate("anything at all"));
    }

    #[test]
    fn test_is_primitive() {
        let registry = TypeRegistry::new();
        for primitive in Primitive::ALL {
            assert!(registry.is_primitive(primitive.name()));
        }
        assert!(!registry.is_primitive("String"));
        assert!(!registry.is_primitive("TbItem"));
    }

    #[test]
    fn test_split_array_marker() {
        assert_eq!(split_array_marker("int[]"), ("int", true));
        assert_eq!(split_array_marker("int"), ("int", false));
        assert_eq!(split_array_marker("TbItem []"), ("TbItem", true));
    }

    #[test]
    fn test_classify_by_prefix() {
        let mut registry = TypeRegistry::new();
        registry.register_enum("Rarity", vec!["Common".into(), "Rare".into()]);

        assert_eq!(
            registry.classify("string[]"),
            ColumnKind::Primitive(Primitive::String)
        );
        assert_eq!(registry.classify("TbWeapon"), ColumnKind::TableReference);
        assert_eq!(registry.classify("TbWeapon[]"), ColumnKind::TableReference);
        assert_eq!(registry.classify("EmRarity"), ColumnKind::Enumeration);
        assert_eq!(registry.classify("VaVector3"), ColumnKind::Variable);
    }

    #[test]
    fn test_classify_invalid() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.classify("EmUnknown"), ColumnKind::Invalid);
        assert_eq!(registry.classify("Tb"), ColumnKind::Invalid);
        assert_eq!(registry.classify("Vector3"), ColumnKind::Invalid);
        assert_eq!(registry.classify("integer"), ColumnKind::Invalid);
        assert_eq!(registry.classify(""), ColumnKind::Invalid);
    }

    #[test]
    fn test_enum_membership() {
        let mut registry = TypeRegistry::new();
        registry.register_enum("Rarity", vec!["Common".into(), "Rare".into()]);

        assert!(registry.is_member("EmRarity", "Rare"));
        assert!(!registry.is_member("EmRarity", "rare"));
        assert!(!registry.is_member("EmOther", "Rare"));

        registry.unregister_enum("Rarity");
        assert_eq!(registry.classify("EmRarity"), ColumnKind::Invalid);
    }
}
