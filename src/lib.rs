//! # tenant-waiter
//!
//! Schema-driven multi-tenant tables on SQLite.
//!
//! One logical table definition is shared by many tenants. Each tenant gets its
//! own physical table named `<base>_<tenant_id>`, created on first use, and a
//! small CRUD surface bound to that table.
//!
//! ## Features
//!
//! - **Schema Compilation**: Column types and constraints compile to `CREATE TABLE IF NOT EXISTS`
//! - **Lazy Provisioning**: Tenant tables are created on first request, exactly once
//! - **Filter Chains**: Left-to-right AND/OR conditions with `IS NULL` handling
//! - **Parameterized Statements**: Values are always bound, never interpolated
//! - **Pluggable Execution**: Any [`SqlExecutor`] can back a [`Waiter`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use tenant_waiter::{
//!     ColumnSchema, ColumnType, ExecutorConfig, GetOptions, Operator, SqliteExecutor, TableSchema,
//!     Waiter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = SqliteExecutor::new(ExecutorConfig::local("tenants.db").build()).await?;
//!
//!     let schema = TableSchema::new()
//!         .column("id", ColumnSchema::new(ColumnType::Integer).primary_key())
//!         .column("name", ColumnSchema::new(ColumnType::Varchar).unique().not_null())
//!         .column("price", ColumnSchema::new(ColumnType::Double).default(0.0))
//!         .column("description", ColumnSchema::new(ColumnType::Text));
//!
//!     let waiter = Waiter::new(Arc::new(executor), "Products", schema);
//!
//!     // Creates Products_acme on first use
//!     let tenant = waiter.get_tenant("acme").await?;
//!
//!     let widget = tenant.create(json!({"name": "Widget"})).await?;
//!     assert_eq!(widget["price"], json!(0.0));
//!
//!     let page = tenant.get(GetOptions::new().order_by("name").limit(20)).await?;
//!     println!("{} products", page.len());
//!
//!     let filter = tenant.filter("name", Operator::Eq, "Widget");
//!     tenant.update(json!({"price": 9.99}), &filter).await?;
//!     tenant.delete(&filter).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Schemas
//!
//! Schemas can also be loaded from JSON. Constraints are tuples whose first
//! element names the constraint:
//!
//! ```rust
//! use tenant_waiter::TableSchema;
//!
//! let schema: TableSchema = serde_json::from_str(r#"{
//!     "id":   { "type": "INTEGER", "constraints": [["PRIMARY_KEY"]] },
//!     "name": { "type": "VARCHAR", "constraints": [["UNIQUE"], ["NOT_NULL"]] },
//!     "price": { "type": "DOUBLE", "constraints": [["DEFAULT", 0.0]] }
//! }"#).unwrap();
//!
//! assert_eq!(schema.primary_key(), Some("id"));
//! ```
//!
//! ## Configuration
//!
//! [`SqliteExecutor`] is configured with [`ExecutorConfig`]:
//!
//! ```rust
//! use tenant_waiter::ExecutorConfig;
//!
//! let config = ExecutorConfig::builder("sqlite://data/tenants.db")
//!     .max_connections(10)
//!     .create_if_missing(true)
//!     .build();
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod tenant;
pub mod types;
pub mod waiter;

#[cfg(test)]
mod mocks;

// Re-export main types for convenience
pub use config::{ExecutorConfig, ExecutorConfigBuilder};
pub use error::{Result, WaiterError};
pub use executor::{Row, SqlExecutor, SqliteExecutor, Statement};
pub use tenant::{GetOptions, Rows, Tenant};
pub use types::{ColumnSchema, ColumnType, Constraint, TableSchema};
pub use waiter::Waiter;

// Re-export SQL utilities for advanced users
pub use sql::ddl::SchemaCompiler;
pub use sql::filter::{CompiledFilter, Connective, FilterChain, FilterCondition, Operator};
pub use sql::sanitize::{quote_literal, validate_identifier};
