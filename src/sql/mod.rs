//! SQL utilities for tenant tables
//!
//! Provides DDL compilation, WHERE-clause filter chains, and identifier
//! sanitization.

pub mod ddl;
pub mod filter;
pub mod sanitize;

pub use ddl::SchemaCompiler;
pub use filter::{CompiledFilter, Connective, FilterChain, FilterCondition, Operator};
pub use sanitize::{SQLITE_RESERVED_WORDS, quote_literal, validate_identifier};
