//! Per-tenant CRUD surface
//!
//! A [`Tenant`] is bound to one physical table (`<base>_<tenant_id>`) and
//! builds parameterized statements against it. Statement construction is
//! exposed separately from execution so the exact SQL can be inspected.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, WaiterError};
use crate::executor::{Row, SqlExecutor, Statement};
use crate::sql::ddl::SchemaCompiler;
use crate::sql::filter::{FilterChain, Operator};
use crate::types::TableSchema;

/// Pagination and ordering for [`Tenant::get`]
#[derive(Debug, Clone, PartialEq)]
pub struct GetOptions {
    /// Maximum rows to return; `0` or less means unbounded (default: 10)
    pub limit: i64,
    /// Rows to skip; only applied when positive (default: 0)
    pub offset: i64,
    /// Sort direction when `order_by` is set (default: ascending)
    pub ascending: bool,
    /// Column to sort by; ignored unless it is a schema column
    pub order_by: Option<String>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            ascending: true,
            order_by: None,
        }
    }
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    pub fn descending(self) -> Self {
        self.ascending(false)
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }
}

/// Rows fetched by [`Tenant::get`]
///
/// Conversion is separate from fetching: a failing conversion reports a
/// [`WaiterError::Conversion`] and leaves the fetched rows untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    rows: Vec<Row>,
}

impl Rows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn as_slice(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_inner(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Map every row with `convert(row, index)`
    ///
    /// Fails with the first conversion error; no partial result is returned.
    pub fn convert<T, E, F>(&self, mut convert: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row, usize) -> std::result::Result<T, E>,
        E: fmt::Display,
    {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                convert(row, i).map_err(|e| {
                    WaiterError::conversion(format!("Failed to convert row {}: {}", i, e))
                })
            })
            .collect()
    }

    /// Deserialize every row into `T`
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.convert(|row, _| serde_json::from_value::<T>(Value::Object(row.clone())))
    }
}

impl IntoIterator for Rows {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// A tenant's view of one logical table
pub struct Tenant {
    tenant_id: String,
    table_name: String,
    schema: Arc<TableSchema>,
    executor: Arc<dyn SqlExecutor>,
}

impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("tenant_id", &self.tenant_id)
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl Tenant {
    /// Bind a tenant to `<base_table>_<tenant_id>`
    ///
    /// This does not create the table; [`crate::Waiter::get_tenant`] does.
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        schema: Arc<TableSchema>,
        base_table: &str,
        tenant_id: &str,
    ) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            table_name: SchemaCompiler::physical_table_name(base_table, tenant_id),
            schema,
            executor,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Physical table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Start a filter chain: `column operator value`
    pub fn filter(
        &self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> FilterChain {
        FilterChain::filter(column, operator, value)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch a page of rows
    pub async fn get(&self, options: GetOptions) -> Result<Rows> {
        let statement = self.select_statement(&options);
        let rows = self.run("get", statement).await?;
        Ok(Rows::new(rows))
    }

    /// Insert one row and return it as stored
    pub async fn create(&self, properties: Value) -> Result<Row> {
        let statement = self.insert_statement(&properties)?;
        self.run("create", statement)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                WaiterError::execution(format!(
                    "Insert into '{}' returned no row",
                    self.table_name
                ))
            })
    }

    /// Update the rows matching `filter` and return them
    pub async fn update(&self, properties: Value, filter: &FilterChain) -> Result<Vec<Row>> {
        let statement = self.update_statement(&properties, filter)?;
        self.run("update", statement).await
    }

    /// Delete the rows matching `filter` and return them
    pub async fn delete(&self, filter: &FilterChain) -> Result<Vec<Row>> {
        let statement = self.delete_statement(filter)?;
        self.run("delete", statement).await
    }

    // =========================================================================
    // Statement Builders
    // =========================================================================

    /// `SELECT * FROM <table> [ORDER BY ...] [LIMIT n] [OFFSET n]`
    pub fn select_statement(&self, options: &GetOptions) -> Statement {
        let mut sql = format!("SELECT * FROM {}", self.table_name);

        if let Some(column) = options.order_by.as_deref() {
            if self.schema.contains(column) {
                let direction = if options.ascending { "ASC" } else { "DESC" };
                sql.push_str(&format!(" ORDER BY {} {}", column, direction));
            }
        }

        if options.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", options.limit));
        } else if options.offset > 0 {
            // SQLite only accepts OFFSET as part of a LIMIT clause
            sql.push_str(" LIMIT -1");
        }

        if options.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", options.offset));
        }

        Statement::new(sql)
    }

    /// `INSERT INTO <table> (<cols>) VALUES (<?...>) RETURNING *`
    ///
    /// Columns follow schema order. A missing primary key is left to the
    /// store; other missing columns take their DEFAULT literal when declared
    /// and are omitted otherwise. JSON `null` counts as missing.
    pub fn insert_statement(&self, properties: &Value) -> Result<Statement> {
        let properties = properties
            .as_object()
            .ok_or_else(|| WaiterError::validation("Properties must be a JSON object"))?;

        let mut column_names = Vec::new();
        let mut args = Vec::new();

        for (name, column) in self.schema.columns() {
            match properties.get(name).filter(|v| !v.is_null()) {
                Some(value) => {
                    column_names.push(name);
                    args.push(value.clone());
                }
                None if column.is_primary_key() => {}
                None => {
                    if let Some(default) = column.default_value() {
                        column_names.push(name);
                        args.push(default.clone());
                    }
                }
            }
        }

        if column_names.is_empty() {
            return Ok(Statement::new(format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING *",
                self.table_name
            )));
        }

        let placeholders = vec!["?"; column_names.len()];
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            self.table_name,
            column_names.join(", "),
            placeholders.join(", ")
        );

        Ok(Statement::with_args(sql, args))
    }

    /// `UPDATE <table> SET <col = ?, ...> WHERE <filter> RETURNING *`
    pub fn update_statement(&self, properties: &Value, filter: &FilterChain) -> Result<Statement> {
        if filter.is_empty() {
            return Err(WaiterError::compile(format!(
                "Refusing to update '{}' without a filter",
                self.table_name
            )));
        }
        self.validate_filter(filter)?;

        let properties = properties
            .as_object()
            .ok_or_else(|| WaiterError::validation("Properties must be a JSON object"))?;

        if let Some(unknown) = properties.keys().find(|k| !self.schema.contains(k)) {
            return Err(WaiterError::validation(format!(
                "Column '{}' does not exist on '{}'",
                unknown, self.table_name
            )));
        }

        let mut assignments = Vec::new();
        let mut args = Vec::new();
        for name in self.schema.column_names() {
            if let Some(value) = properties.get(name) {
                assignments.push(format!("{} = ?", name));
                args.push(value.clone());
            }
        }

        if assignments.is_empty() {
            return Err(WaiterError::validation("No columns to update"));
        }

        let compiled = filter.compile();
        args.extend(compiled.args);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            self.table_name,
            assignments.join(", "),
            compiled.fragment
        );

        Ok(Statement::with_args(sql, args))
    }

    /// `DELETE FROM <table> WHERE <filter> RETURNING *`
    pub fn delete_statement(&self, filter: &FilterChain) -> Result<Statement> {
        if filter.is_empty() {
            return Err(WaiterError::compile(format!(
                "Refusing to delete from '{}' without a filter",
                self.table_name
            )));
        }
        self.validate_filter(filter)?;

        let compiled = filter.compile();
        let sql = format!(
            "DELETE FROM {} WHERE {} RETURNING *",
            self.table_name, compiled.fragment
        );

        Ok(Statement::with_args(sql, compiled.args))
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn validate_filter(&self, filter: &FilterChain) -> Result<()> {
        match filter.columns().find(|c| !self.schema.contains(c)) {
            Some(unknown) => Err(WaiterError::validation(format!(
                "Filter column '{}' does not exist on '{}'",
                unknown, self.table_name
            ))),
            None => Ok(()),
        }
    }

    async fn run(&self, operation: &'static str, statement: Statement) -> Result<Vec<Row>> {
        debug!(
            table = %self.table_name,
            operation,
            sql = %statement.sql,
            args = statement.args.len(),
            "Executing tenant statement"
        );

        self.executor.execute(&statement).await.inspect_err(|e| {
            warn!(table = %self.table_name, operation, error = %e, "Tenant statement failed");
        })
    }
}
