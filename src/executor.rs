//! SQL executor abstraction
//!
//! Tenants never talk to a database directly: every statement goes through a
//! shared [`SqlExecutor`]. [`SqliteExecutor`] is the bundled sqlx-backed
//! implementation; hosts with their own connection handling implement the
//! trait themselves.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;

use crate::config::ExecutorConfig;
use crate::error::{Result, WaiterError};

/// A result row keyed by column name, in column order
pub type Row = serde_json::Map<String, Value>;

/// SQL text with positional `?` arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    /// A statement without arguments
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// Runs statements and returns the rows they produce
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>>;
}

/// [`SqlExecutor`] over an sqlx SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Open a pool according to `config`
    pub async fn new(config: ExecutorConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| WaiterError::Connection(format!("Invalid database URL: {}", e)))?
            .create_if_missing(config.create_if_missing);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(options)
            .await
            .map_err(|e| WaiterError::Connection(format!("Database connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    ///
    /// Use this when the host already owns a pool and wants to share it.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn bind_value<'q>(
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &Value,
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.clone()),
            // Composite values are stored as JSON text
            other => query.bind(other.to_string()),
        }
    }

    fn row_to_json(row: &SqliteRow) -> Result<Row> {
        let mut out = Row::new();
        for column in row.columns() {
            let idx = column.ordinal();
            let raw = row.try_get_raw(idx)?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                let storage = raw.type_info().name().to_string();
                match storage.as_str() {
                    "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                    "REAL" => serde_json::Number::from_f64(row.try_get_unchecked::<f64, _>(idx)?)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                    _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
                }
            };
            out.insert(column.name().to_string(), value);
        }
        Ok(out)
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        let mut query = sqlx::query(&statement.sql);
        for arg in &statement.args {
            query = Self::bind_value(query, arg);
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(Self::row_to_json).collect()
    }
}
