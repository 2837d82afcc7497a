//! Error types for tenant table operations

use thiserror::Error;

/// Errors that can occur while compiling schemas, provisioning tenants or
/// running tenant statements
#[derive(Debug, Error)]
pub enum WaiterError {
    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to provision table '{table}': {reason}")]
    Provision { table: String, reason: String },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl WaiterError {
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn provision(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provision {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WaiterError>;
