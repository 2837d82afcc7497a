//! Core type definitions for tenant tables
//!
//! Includes column types, constraints, column schemas and the ordered table schema.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, WaiterError};

// ============================================================================
// Column Types
// ============================================================================

/// SQL scalar kind of a tenant table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Float,
    Double,
    Char,
    Varchar,
    Text,
    Blob,
    Date,
    Time,
    Datetime,
    Boolean,
}

impl ColumnType {
    /// SQL spelling used in table definitions
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Char => "CHAR",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Datetime => "DATETIME",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    /// Whether AUTOINCREMENT may be applied to this type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Float | ColumnType::Double
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// A column constraint
///
/// The schema description format spells constraints as tuples
/// `[kind, ...args]`; [`Constraint::from_tuple`] checks the per-kind arity
/// so a constructed `Constraint` always carries exactly the arguments its
/// kind needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub enum Constraint {
    NotNull,
    Unique,
    PrimaryKey,
    /// `REFERENCES <table>(<column>)`
    ForeignKey { table: String, column: String },
    /// `CHECK(<expression>)`
    Check(String),
    /// Literal used both in the table definition and when an insert omits the column
    Default(Value),
    /// Index created alongside the tenant table
    Index { name: String, on: String },
    AutoIncrement,
    /// Any other single-token constraint, rendered verbatim
    Keyword(String),
}

impl Constraint {
    pub fn foreign_key(table: impl Into<String>, column: impl Into<String>) -> Self {
        Constraint::ForeignKey {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn check(expression: impl Into<String>) -> Self {
        Constraint::Check(expression.into())
    }

    pub fn default_value(value: impl Into<Value>) -> Self {
        Constraint::Default(value.into())
    }

    pub fn index(name: impl Into<String>, on: impl Into<String>) -> Self {
        Constraint::Index {
            name: name.into(),
            on: on.into(),
        }
    }

    /// Canonical kind name, as written in the tuple form
    pub fn kind(&self) -> &str {
        match self {
            Constraint::NotNull => "NOT NULL",
            Constraint::Unique => "UNIQUE",
            Constraint::PrimaryKey => "PRIMARY KEY",
            Constraint::ForeignKey { .. } => "FOREIGN KEY",
            Constraint::Check(_) => "CHECK",
            Constraint::Default(_) => "DEFAULT",
            Constraint::Index { .. } => "INDEX",
            Constraint::AutoIncrement => "AUTOINCREMENT",
            Constraint::Keyword(keyword) => keyword.as_str(),
        }
    }

    /// Parse the tuple form `[kind, ...args]`
    ///
    /// Kinds are case-insensitive and may use underscores in place of spaces
    /// (`NOT_NULL` and `not null` both parse as [`Constraint::NotNull`]).
    pub fn from_tuple(kind: &str, args: &[Value]) -> Result<Self> {
        let kind = kind
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        match kind.as_str() {
            "CHECK" => {
                expect_arity(&kind, args, 1)?;
                Ok(Constraint::Check(string_arg(&kind, &args[0])?))
            }
            "INDEX" => {
                expect_arity(&kind, args, 2)?;
                Ok(Constraint::Index {
                    name: string_arg(&kind, &args[0])?,
                    on: string_arg(&kind, &args[1])?,
                })
            }
            "FOREIGN KEY" => {
                expect_arity(&kind, args, 2)?;
                Ok(Constraint::ForeignKey {
                    table: string_arg(&kind, &args[0])?,
                    column: string_arg(&kind, &args[1])?,
                })
            }
            "DEFAULT" => {
                expect_arity(&kind, args, 1)?;
                match &args[0] {
                    Value::Array(_) | Value::Object(_) => Err(WaiterError::compile(
                        "DEFAULT value must be a scalar (string, number, boolean or null)",
                    )),
                    value => Ok(Constraint::Default(value.clone())),
                }
            }
            "AUTOINCREMENT" => {
                expect_arity(&kind, args, 0)?;
                Ok(Constraint::AutoIncrement)
            }
            "NOT NULL" => {
                expect_arity(&kind, args, 0)?;
                Ok(Constraint::NotNull)
            }
            "UNIQUE" => {
                expect_arity(&kind, args, 0)?;
                Ok(Constraint::Unique)
            }
            "PRIMARY KEY" => {
                expect_arity(&kind, args, 0)?;
                Ok(Constraint::PrimaryKey)
            }
            "" => Err(WaiterError::compile("Constraint kind cannot be empty")),
            other => {
                expect_arity(other, args, 0)?;
                if !other
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == ' ')
                {
                    return Err(WaiterError::compile(format!(
                        "Constraint kind '{}' contains invalid characters",
                        other
                    )));
                }
                Ok(Constraint::Keyword(other.to_string()))
            }
        }
    }

    /// Arguments in tuple order
    pub fn args(&self) -> Vec<Value> {
        match self {
            Constraint::ForeignKey { table, column } => {
                vec![Value::from(table.as_str()), Value::from(column.as_str())]
            }
            Constraint::Check(expression) => vec![Value::from(expression.as_str())],
            Constraint::Default(value) => vec![value.clone()],
            Constraint::Index { name, on } => {
                vec![Value::from(name.as_str()), Value::from(on.as_str())]
            }
            _ => Vec::new(),
        }
    }
}

fn expect_arity(kind: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(WaiterError::compile(format!(
            "{} takes exactly {} argument{} but got {}",
            kind,
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

fn string_arg(kind: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| WaiterError::compile(format!("{} arguments must be SQL strings", kind)))
}

impl TryFrom<Vec<Value>> for Constraint {
    type Error = WaiterError;

    fn try_from(tuple: Vec<Value>) -> Result<Self> {
        let (kind, args) = tuple
            .split_first()
            .ok_or_else(|| WaiterError::compile("Constraint tuple cannot be empty"))?;
        let kind = kind
            .as_str()
            .ok_or_else(|| WaiterError::compile("Constraint kind must be a string"))?;
        Constraint::from_tuple(kind, args)
    }
}

impl From<Constraint> for Vec<Value> {
    fn from(constraint: Constraint) -> Self {
        let mut tuple = vec![Value::from(constraint.kind())];
        tuple.extend(constraint.args());
        tuple
    }
}

// ============================================================================
// Column Schema
// ============================================================================

/// Type and ordered constraints of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl ColumnSchema {
    /// Create a column without constraints
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            constraints: Vec::new(),
        }
    }

    /// Append any constraint
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn primary_key(self) -> Self {
        self.constraint(Constraint::PrimaryKey)
    }

    pub fn not_null(self) -> Self {
        self.constraint(Constraint::NotNull)
    }

    pub fn unique(self) -> Self {
        self.constraint(Constraint::Unique)
    }

    pub fn autoincrement(self) -> Self {
        self.constraint(Constraint::AutoIncrement)
    }

    pub fn default(self, value: impl Into<Value>) -> Self {
        self.constraint(Constraint::default_value(value))
    }

    pub fn check(self, expression: impl Into<String>) -> Self {
        self.constraint(Constraint::check(expression))
    }

    pub fn references(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.constraint(Constraint::foreign_key(table, column))
    }

    pub fn index(self, name: impl Into<String>, on: impl Into<String>) -> Self {
        self.constraint(Constraint::index(name, on))
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::PrimaryKey))
    }

    /// The first DEFAULT literal declared on the column
    pub fn default_value(&self) -> Option<&Value> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Default(value) => Some(value),
            _ => None,
        })
    }
}

// ============================================================================
// Table Schema
// ============================================================================

/// Ordered mapping from column name to [`ColumnSchema`]
///
/// Insertion order is the column order of the table definition and of
/// insert arguments. Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    columns: Vec<(String, ColumnSchema)>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, replacing an existing column of the same name in place
    pub fn column(mut self, name: impl Into<String>, schema: ColumnSchema) -> Self {
        self.insert(name.into(), schema);
        self
    }

    fn insert(&mut self, name: String, schema: ColumnSchema) {
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = schema,
            None => self.columns.push((name, schema)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnSchema)> {
        self.columns.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, schema)| schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Name of the first column declaring PRIMARY KEY
    pub fn primary_key(&self) -> Option<&str> {
        self.columns()
            .find(|(_, schema)| schema.is_primary_key())
            .map(|(name, _)| name)
    }
}

impl Serialize for TableSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, schema) in &self.columns {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableSchemaVisitor;

        impl<'de> Visitor<'de> for TableSchemaVisitor {
            type Value = TableSchema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to column schemas")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<TableSchema, A::Error> {
                let mut schema = TableSchema::new();
                while let Some((name, column)) = access.next_entry::<String, ColumnSchema>()? {
                    if schema.contains(&name) {
                        return Err(de::Error::custom(format!("duplicate column '{}'", name)));
                    }
                    schema.columns.push((name, column));
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(TableSchemaVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // ColumnType Tests
    // =========================================================================

    #[test]
    fn test_column_type_sql() {
        assert_eq!(ColumnType::Integer.as_sql(), "INTEGER");
        assert_eq!(ColumnType::Varchar.as_sql(), "VARCHAR");
        assert_eq!(ColumnType::Datetime.as_sql(), "DATETIME");
        assert_eq!(ColumnType::Boolean.to_string(), "BOOLEAN");
    }

    #[test]
    fn test_column_type_numeric() {
        assert!(ColumnType::Integer.is_numeric());
        assert!(ColumnType::Float.is_numeric());
        assert!(ColumnType::Double.is_numeric());
        assert!(!ColumnType::Text.is_numeric());
        assert!(!ColumnType::Boolean.is_numeric());
    }

    #[test]
    fn test_column_type_serde_uses_sql_spelling() {
        assert_eq!(serde_json::to_string(&ColumnType::Double).unwrap(), "\"DOUBLE\"");
        let parsed: ColumnType = serde_json::from_str("\"DATETIME\"").unwrap();
        assert_eq!(parsed, ColumnType::Datetime);
    }

    // =========================================================================
    // Constraint Arity Tests
    // =========================================================================

    #[test]
    fn test_check_accepts_exactly_one_argument() {
        let c = Constraint::from_tuple("CHECK", &[json!("price >= 0")]).unwrap();
        assert_eq!(c, Constraint::check("price >= 0"));
    }

    #[test]
    fn test_check_rejects_zero_arguments() {
        let err = Constraint::from_tuple("CHECK", &[]).unwrap_err();
        assert!(matches!(err, WaiterError::Compile(_)));
        assert!(err.to_string().contains("got 0"));
    }

    #[test]
    fn test_check_rejects_extra_arguments() {
        let err = Constraint::from_tuple("CHECK", &[json!("a > 0"), json!("b > 0")]).unwrap_err();
        assert!(matches!(err, WaiterError::Compile(_)));
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn test_index_and_foreign_key_need_two_arguments() {
        assert!(Constraint::from_tuple("INDEX", &[json!("idx")]).is_err());
        assert!(Constraint::from_tuple("FOREIGN KEY", &[json!("users")]).is_err());
        assert_eq!(
            Constraint::from_tuple("FOREIGN KEY", &[json!("users"), json!("id")]).unwrap(),
            Constraint::foreign_key("users", "id")
        );
        assert_eq!(
            Constraint::from_tuple("INDEX", &[json!("by_name"), json!("name")]).unwrap(),
            Constraint::index("by_name", "name")
        );
    }

    #[test]
    fn test_default_needs_one_scalar() {
        assert!(Constraint::from_tuple("DEFAULT", &[]).is_err());
        assert!(Constraint::from_tuple("DEFAULT", &[json!([1, 2])]).is_err());
        assert_eq!(
            Constraint::from_tuple("DEFAULT", &[json!(0.0)]).unwrap(),
            Constraint::Default(json!(0.0))
        );
    }

    #[test]
    fn test_bare_kinds_reject_arguments() {
        assert!(Constraint::from_tuple("NOT NULL", &[json!(true)]).is_err());
        assert!(Constraint::from_tuple("UNIQUE", &[json!("x")]).is_err());
        assert!(Constraint::from_tuple("PRIMARY KEY", &[json!(1)]).is_err());
        assert!(Constraint::from_tuple("AUTOINCREMENT", &[json!(1)]).is_err());
    }

    #[test]
    fn test_kind_spelling_is_normalized() {
        assert_eq!(Constraint::from_tuple("not_null", &[]).unwrap(), Constraint::NotNull);
        assert_eq!(
            Constraint::from_tuple("Primary  Key", &[]).unwrap(),
            Constraint::PrimaryKey
        );
    }

    #[test]
    fn test_unrecognized_keyword() {
        let c = Constraint::from_tuple("COLLATE_NOCASE", &[]).unwrap();
        assert_eq!(c, Constraint::Keyword("COLLATE NOCASE".to_string()));
        assert!(Constraint::from_tuple("STRICT;", &[]).is_err());
        assert!(Constraint::from_tuple("STRICT", &[json!(1)]).is_err());
    }

    #[test]
    fn test_string_arguments_required() {
        let err = Constraint::from_tuple("CHECK", &[json!(42)]).unwrap_err();
        assert!(err.to_string().contains("SQL strings"));
    }

    // =========================================================================
    // Constraint Serde Tests
    // =========================================================================

    #[test]
    fn test_constraint_tuple_roundtrip_shape() {
        let json = serde_json::to_value(Constraint::foreign_key("users", "id")).unwrap();
        assert_eq!(json, json!(["FOREIGN KEY", "users", "id"]));

        let json = serde_json::to_value(Constraint::NotNull).unwrap();
        assert_eq!(json, json!(["NOT NULL"]));
    }

    #[test]
    fn test_constraint_deserialize_rejects_bad_arity() {
        let result: std::result::Result<Constraint, _> = serde_json::from_str(r#"["CHECK"]"#);
        assert!(result.is_err());

        let result: std::result::Result<Constraint, _> = serde_json::from_str("[]");
        assert!(result.is_err());
    }

    // =========================================================================
    // ColumnSchema Tests
    // =========================================================================

    #[test]
    fn test_column_schema_builder() {
        let col = ColumnSchema::new(ColumnType::Double).default(0.0).not_null();
        assert_eq!(col.constraints.len(), 2);
        assert_eq!(col.default_value(), Some(&json!(0.0)));
        assert!(!col.is_primary_key());
    }

    #[test]
    fn test_column_schema_deserialize() {
        let col: ColumnSchema = serde_json::from_str(
            r#"{"type": "VARCHAR", "constraints": [["UNIQUE"], ["NOT NULL"]]}"#,
        )
        .unwrap();
        assert_eq!(col.column_type, ColumnType::Varchar);
        assert_eq!(col.constraints, vec![Constraint::Unique, Constraint::NotNull]);
    }

    #[test]
    fn test_column_schema_constraints_default_empty() {
        let col: ColumnSchema = serde_json::from_str(r#"{"type": "TEXT"}"#).unwrap();
        assert!(col.constraints.is_empty());
    }

    // =========================================================================
    // TableSchema Tests
    // =========================================================================

    #[test]
    fn test_table_schema_preserves_insertion_order() {
        let schema = TableSchema::new()
            .column("zeta", ColumnSchema::new(ColumnType::Text))
            .column("alpha", ColumnSchema::new(ColumnType::Text))
            .column("mid", ColumnSchema::new(ColumnType::Text));

        let names: Vec<_> = schema.column_names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_table_schema_replaces_duplicate_in_place() {
        let schema = TableSchema::new()
            .column("a", ColumnSchema::new(ColumnType::Text))
            .column("b", ColumnSchema::new(ColumnType::Text))
            .column("a", ColumnSchema::new(ColumnType::Integer));

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("a").unwrap().column_type, ColumnType::Integer);
        assert_eq!(schema.column_names().next(), Some("a"));
    }

    #[test]
    fn test_table_schema_primary_key() {
        let schema = TableSchema::new()
            .column("name", ColumnSchema::new(ColumnType::Varchar))
            .column("id", ColumnSchema::new(ColumnType::Integer).primary_key());
        assert_eq!(schema.primary_key(), Some("id"));
        assert_eq!(TableSchema::new().primary_key(), None);
    }

    #[test]
    fn test_table_schema_deserialize_keeps_document_order() {
        let schema: TableSchema = serde_json::from_str(
            r#"{
                "id": {"type": "INTEGER", "constraints": [["PRIMARY KEY"]]},
                "name": {"type": "VARCHAR", "constraints": [["UNIQUE"], ["NOT NULL"]]},
                "price": {"type": "DOUBLE", "constraints": [["DEFAULT", 0.0]]},
                "description": {"type": "TEXT", "constraints": []}
            }"#,
        )
        .unwrap();

        let names: Vec<_> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "name", "price", "description"]);
        assert_eq!(schema.get("price").unwrap().default_value(), Some(&json!(0.0)));
    }

    #[test]
    fn test_table_schema_deserialize_rejects_duplicates() {
        let result: std::result::Result<TableSchema, _> = serde_json::from_str(
            r#"{"a": {"type": "TEXT"}, "a": {"type": "INTEGER"}}"#,
        );
        assert!(result.unwrap_err().to_string().contains("duplicate column"));
    }

    #[test]
    fn test_table_schema_deserialize_rejects_bad_constraint() {
        let result: std::result::Result<TableSchema, _> = serde_json::from_str(
            r#"{"price": {"type": "DOUBLE", "constraints": [["CHECK"]]}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_table_schema_serialize_order() {
        let schema = TableSchema::new()
            .column("b", ColumnSchema::new(ColumnType::Text))
            .column("a", ColumnSchema::new(ColumnType::Integer).primary_key());
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(
            json,
            r#"{"b":{"type":"TEXT","constraints":[]},"a":{"type":"INTEGER","constraints":[["PRIMARY KEY"]]}}"#
        );
    }
}
