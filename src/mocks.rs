//! Mock executor for testing

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, WaiterError};
use crate::executor::{Row, SqlExecutor, Statement};

/// Records every statement and answers with canned rows
#[derive(Default)]
pub struct RecordingExecutor {
    statements: Mutex<Vec<Statement>>,
    rows: Mutex<Vec<Row>>,
    fail_on: Mutex<Option<String>>,
    yields: usize,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the scheduler this many times inside each execute call
    pub fn with_yields(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    /// Rows returned by every subsequent statement
    pub async fn set_rows(&self, rows: Vec<Row>) {
        *self.rows.lock().await = rows;
    }

    /// Fail every statement whose SQL contains `fragment`
    pub async fn fail_when(&self, fragment: impl Into<String>) {
        *self.fail_on.lock().await = Some(fragment.into());
    }

    pub async fn clear_failure(&self) {
        *self.fail_on.lock().await = None;
    }

    pub async fn statements(&self) -> Vec<Statement> {
        self.statements.lock().await.clone()
    }

    /// Number of recorded statements starting with `prefix`
    pub async fn count_starting_with(&self, prefix: &str) -> usize {
        self.statements
            .lock()
            .await
            .iter()
            .filter(|s| s.sql.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.statements.lock().await.push(statement.clone());

        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }

        if let Some(fragment) = self.fail_on.lock().await.as_deref() {
            if statement.sql.contains(fragment) {
                return Err(WaiterError::execution(format!(
                    "mock failure for statement: {}",
                    statement.sql
                )));
            }
        }

        Ok(self.rows.lock().await.clone())
    }
}
