//! DDL compilation for tenant tables
//!
//! Turns a [`TableSchema`] into the statements that provision one tenant's
//! physical table. Compilation is pure: the same schema and table name always
//! produce byte-identical SQL, and nothing here touches an executor.

use serde_json::Value;

use crate::error::{Result, WaiterError};
use crate::sql::sanitize::{quote_literal, validate_identifier};
use crate::types::{ColumnSchema, Constraint, TableSchema};

/// Compiler from schemas to table-definition statements
pub struct SchemaCompiler;

impl SchemaCompiler {
    /// Physical table name of a tenant: `<base>_<tenant_id>`
    pub fn physical_table_name(base_table: &str, tenant_id: &str) -> String {
        format!("{}_{}", base_table, tenant_id)
    }

    /// Render one column definition: `<name> <TYPE> <constraints...>`
    ///
    /// INDEX constraints are not part of the column definition; see
    /// [`SchemaCompiler::compile_indexes`].
    pub fn compile_column(name: &str, column: &ColumnSchema) -> Result<String> {
        validate_identifier(name).map_err(WaiterError::Compile)?;

        let mut parts = vec![name.to_string(), column.column_type.as_sql().to_string()];

        for constraint in &column.constraints {
            match constraint {
                Constraint::NotNull => parts.push("NOT NULL".to_string()),
                Constraint::Unique => parts.push("UNIQUE".to_string()),
                Constraint::PrimaryKey => parts.push("PRIMARY KEY".to_string()),
                Constraint::Keyword(keyword) => parts.push(keyword.clone()),
                Constraint::Check(expression) => parts.push(format!("CHECK({})", expression)),
                Constraint::ForeignKey { table, column } => {
                    validate_identifier(table).map_err(WaiterError::Compile)?;
                    validate_identifier(column).map_err(WaiterError::Compile)?;
                    parts.push(format!("REFERENCES {}({})", table, column));
                }
                Constraint::Default(value) => {
                    parts.push(format!("DEFAULT {}", Self::render_literal(value)?));
                }
                Constraint::AutoIncrement => {
                    if !column.column_type.is_numeric() {
                        return Err(WaiterError::compile(format!(
                            "AUTOINCREMENT cannot be applied to non-numeric column '{}' of type {}",
                            name, column.column_type
                        )));
                    }
                    parts.push("AUTOINCREMENT".to_string());
                }
                Constraint::Index { .. } => {}
            }
        }

        Ok(parts.join(" "))
    }

    /// Generate the `CREATE TABLE IF NOT EXISTS` statement for a physical table
    pub fn compile_table(table_name: &str, schema: &TableSchema) -> Result<String> {
        validate_identifier(table_name).map_err(WaiterError::Compile)?;

        if schema.is_empty() {
            return Err(WaiterError::compile(format!(
                "Table '{}' has no columns",
                table_name
            )));
        }

        let primary_keys = schema
            .columns()
            .flat_map(|(_, column)| column.constraints.iter())
            .filter(|c| matches!(c, Constraint::PrimaryKey))
            .count();
        if primary_keys > 1 {
            return Err(WaiterError::compile(format!(
                "Table '{}' declares {} PRIMARY KEY constraints; at most one is allowed",
                table_name, primary_keys
            )));
        }

        let column_defs = schema
            .columns()
            .map(|(name, column)| Self::compile_column(name, column))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table_name,
            column_defs.join(",")
        ))
    }

    /// Generate one `CREATE INDEX IF NOT EXISTS` statement per INDEX constraint
    ///
    /// Index names share one namespace per database, so the physical table
    /// name is used as a prefix to keep tenants apart.
    pub fn compile_indexes(table_name: &str, schema: &TableSchema) -> Result<Vec<String>> {
        validate_identifier(table_name).map_err(WaiterError::Compile)?;

        let mut statements = Vec::new();
        for (_, column) in schema.columns() {
            for constraint in &column.constraints {
                if let Constraint::Index { name, on } = constraint {
                    validate_identifier(name).map_err(WaiterError::Compile)?;
                    for indexed in on.split(',') {
                        validate_identifier(indexed.trim()).map_err(WaiterError::Compile)?;
                    }
                    statements.push(format!(
                        "CREATE INDEX IF NOT EXISTS {}_{} ON {} ({})",
                        table_name, name, table_name, on
                    ));
                }
            }
        }
        Ok(statements)
    }

    /// Render a DEFAULT value as an SQL literal
    fn render_literal(value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(true) => Ok("TRUE".to_string()),
            Value::Bool(false) => Ok("FALSE".to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(quote_literal(s)),
            Value::Array(_) | Value::Object(_) => Err(WaiterError::compile(
                "DEFAULT value must be a scalar (string, number, boolean or null)",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;
    use serde_json::json;

    // ==================== Test Schema Helpers ====================

    fn product_schema() -> TableSchema {
        TableSchema::new()
            .column("id", ColumnSchema::new(ColumnType::Integer).primary_key())
            .column(
                "name",
                ColumnSchema::new(ColumnType::Varchar).unique().not_null(),
            )
            .column("price", ColumnSchema::new(ColumnType::Double).default(0.0))
            .column("description", ColumnSchema::new(ColumnType::Text))
    }

    // ==================== Column Tests ====================

    #[test]
    fn test_compile_column_without_constraints() {
        let sql =
            SchemaCompiler::compile_column("description", &ColumnSchema::new(ColumnType::Text))
                .unwrap();
        assert_eq!(sql, "description TEXT");
    }

    #[test]
    fn test_compile_column_keeps_constraint_order() {
        let col = ColumnSchema::new(ColumnType::Varchar).unique().not_null();
        assert_eq!(
            SchemaCompiler::compile_column("name", &col).unwrap(),
            "name VARCHAR UNIQUE NOT NULL"
        );
    }

    #[test]
    fn test_compile_column_check() {
        let col = ColumnSchema::new(ColumnType::Double).check("price >= 0");
        assert_eq!(
            SchemaCompiler::compile_column("price", &col).unwrap(),
            "price DOUBLE CHECK(price >= 0)"
        );
    }

    #[test]
    fn test_compile_column_foreign_key() {
        let col = ColumnSchema::new(ColumnType::Integer).references("Users_a", "id");
        assert_eq!(
            SchemaCompiler::compile_column("owner_id", &col).unwrap(),
            "owner_id INTEGER REFERENCES Users_a(id)"
        );
    }

    #[test]
    fn test_compile_column_foreign_key_rejects_unsafe_target() {
        let col = ColumnSchema::new(ColumnType::Integer).references("users; DROP TABLE x", "id");
        let err = SchemaCompiler::compile_column("owner_id", &col).unwrap_err();
        assert!(matches!(err, WaiterError::Compile(_)));
    }

    #[test]
    fn test_compile_column_default_literals() {
        let cases = [
            (json!(0.0), "DEFAULT 0.0"),
            (json!(42), "DEFAULT 42"),
            (json!(true), "DEFAULT TRUE"),
            (json!(null), "DEFAULT NULL"),
            (json!("it's"), "DEFAULT 'it''s'"),
        ];
        for (value, expected) in cases {
            let col = ColumnSchema::new(ColumnType::Text).constraint(Constraint::Default(value));
            let sql = SchemaCompiler::compile_column("c", &col).unwrap();
            assert_eq!(sql, format!("c TEXT {}", expected));
        }
    }

    #[test]
    fn test_default_is_not_treated_as_autoincrement() {
        // A DEFAULT on a non-numeric column must not trip the AUTOINCREMENT check
        let col = ColumnSchema::new(ColumnType::Varchar).default("guest");
        assert_eq!(
            SchemaCompiler::compile_column("role", &col).unwrap(),
            "role VARCHAR DEFAULT 'guest'"
        );
    }

    #[test]
    fn test_compile_column_autoincrement_numeric() {
        let col = ColumnSchema::new(ColumnType::Integer)
            .primary_key()
            .autoincrement();
        assert_eq!(
            SchemaCompiler::compile_column("id", &col).unwrap(),
            "id INTEGER PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn test_compile_column_autoincrement_rejects_non_numeric() {
        let col = ColumnSchema::new(ColumnType::Text).autoincrement();
        let err = SchemaCompiler::compile_column("slug", &col).unwrap_err();
        assert!(matches!(err, WaiterError::Compile(_)));
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_compile_column_keyword_passthrough() {
        let col = ColumnSchema::new(ColumnType::Text)
            .constraint(Constraint::from_tuple("COLLATE NOCASE", &[]).unwrap());
        assert_eq!(
            SchemaCompiler::compile_column("email", &col).unwrap(),
            "email TEXT COLLATE NOCASE"
        );
    }

    #[test]
    fn test_compile_column_skips_index() {
        let col = ColumnSchema::new(ColumnType::Varchar).index("by_name", "name");
        assert_eq!(
            SchemaCompiler::compile_column("name", &col).unwrap(),
            "name VARCHAR"
        );
    }

    #[test]
    fn test_compile_column_rejects_unsafe_name() {
        let col = ColumnSchema::new(ColumnType::Text);
        assert!(SchemaCompiler::compile_column("name TEXT, evil", &col).is_err());
        assert!(SchemaCompiler::compile_column("order", &col).is_err());
    }

    // ==================== Table Tests ====================

    #[test]
    fn test_compile_table() {
        let ddl = SchemaCompiler::compile_table("Products_a", &product_schema()).unwrap();
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS Products_a (id INTEGER PRIMARY KEY,name VARCHAR UNIQUE NOT NULL,price DOUBLE DEFAULT 0.0,description TEXT)"
        );
    }

    #[test]
    fn test_compile_table_is_deterministic() {
        let schema = product_schema();
        let first = SchemaCompiler::compile_table("Products_b", &schema).unwrap();
        for _ in 0..10 {
            assert_eq!(
                SchemaCompiler::compile_table("Products_b", &schema).unwrap(),
                first
            );
        }
        let rebuilt = SchemaCompiler::compile_table("Products_b", &product_schema()).unwrap();
        assert_eq!(rebuilt, first);
    }

    #[test]
    fn test_compile_table_rejects_two_primary_keys() {
        let schema = TableSchema::new()
            .column("id", ColumnSchema::new(ColumnType::Integer).primary_key())
            .column("code", ColumnSchema::new(ColumnType::Varchar).primary_key());
        let err = SchemaCompiler::compile_table("Items_a", &schema).unwrap_err();
        assert!(err.to_string().contains("PRIMARY KEY"));
    }

    #[test]
    fn test_compile_table_rejects_empty_schema() {
        let err = SchemaCompiler::compile_table("Empty_a", &TableSchema::new()).unwrap_err();
        assert!(matches!(err, WaiterError::Compile(_)));
    }

    #[test]
    fn test_compile_table_rejects_unsafe_table_name() {
        let err =
            SchemaCompiler::compile_table("Products_a; DROP TABLE x", &product_schema()).unwrap_err();
        assert!(matches!(err, WaiterError::Compile(_)));
    }

    #[test]
    fn test_compile_table_propagates_column_errors() {
        let schema = TableSchema::new().column(
            "slug",
            ColumnSchema::new(ColumnType::Varchar).autoincrement(),
        );
        assert!(SchemaCompiler::compile_table("Pages_a", &schema).is_err());
    }

    // ==================== Index Tests ====================

    #[test]
    fn test_compile_indexes_prefixes_table_name() {
        let schema = TableSchema::new()
            .column("id", ColumnSchema::new(ColumnType::Integer).primary_key())
            .column(
                "name",
                ColumnSchema::new(ColumnType::Varchar).index("by_name", "name"),
            );

        let statements = SchemaCompiler::compile_indexes("Products_a", &schema).unwrap();
        assert_eq!(
            statements,
            vec!["CREATE INDEX IF NOT EXISTS Products_a_by_name ON Products_a (name)"]
        );
    }

    #[test]
    fn test_compile_indexes_empty_without_index_constraints() {
        let statements = SchemaCompiler::compile_indexes("Products_a", &product_schema()).unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_compile_indexes_rejects_unsafe_target() {
        let schema = TableSchema::new().column(
            "name",
            ColumnSchema::new(ColumnType::Varchar).index("by_name", "name); DROP TABLE x; --"),
        );

        let err = SchemaCompiler::compile_indexes("Products_a", &schema).unwrap_err();
        assert!(matches!(err, WaiterError::Compile(_)));
    }

    #[test]
    fn test_physical_table_name() {
        assert_eq!(
            SchemaCompiler::physical_table_name("Products", "a"),
            "Products_a"
        );
    }
}
