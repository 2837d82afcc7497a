//! Filter chains for SQL WHERE clauses
//!
//! A [`FilterChain`] is an ordered list of `column operator value` conditions
//! joined by AND/OR. Conditions are evaluated strictly left to right: the
//! chain adds no parentheses, so SQL's own AND-before-OR precedence applies to
//! the compiled fragment exactly as written.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::WaiterError;

/// Comparison operator of a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = WaiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_uppercase().as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "LIKE" => Ok(Operator::Like),
            "NOT LIKE" => Ok(Operator::NotLike),
            _ => Err(WaiterError::validation(format!(
                "Unsupported filter operator '{}'",
                s
            ))),
        }
    }
}

impl TryFrom<&str> for Operator {
    type Error = WaiterError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Boolean connective joining a condition to everything before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// One `column operator value` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
    /// `None` only for the first condition of a chain
    pub connective: Option<Connective>,
}

/// WHERE fragment with its positional arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub fragment: String,
    pub args: Vec<Value>,
}

/// Ordered, append-only list of filter conditions
///
/// ```
/// use serde_json::Value;
/// use tenant_waiter::sql::{FilterChain, Operator};
///
/// let chain = FilterChain::filter("id", Operator::Eq, 1)
///     .and("username", Operator::Eq, "Hugh Janus")
///     .or("username", Operator::Eq, Value::Null);
///
/// let compiled = chain.compile();
/// assert_eq!(compiled.fragment, "id = ? AND username = ? OR username IS NULL");
/// assert_eq!(compiled.args, vec![Value::from(1), Value::from("Hugh Janus")]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    conditions: Vec<FilterCondition>,
}

impl FilterChain {
    /// An empty chain; mutating tenant operations reject it
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain seeded with one condition
    pub fn filter(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        let mut chain = Self::new();
        chain.push(None, column.into(), operator, value.into());
        chain
    }

    /// Append `AND column operator value`
    pub fn and(mut self, column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.push(Some(Connective::And), column.into(), operator, value.into());
        self
    }

    /// Append `OR column operator value`
    pub fn or(mut self, column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.push(Some(Connective::Or), column.into(), operator, value.into());
        self
    }

    /// Append a condition in place
    ///
    /// The first condition of a chain never carries a connective, whatever
    /// was requested.
    pub fn push(
        &mut self,
        connective: Option<Connective>,
        column: String,
        operator: Operator,
        value: Value,
    ) {
        let connective = if self.conditions.is_empty() {
            None
        } else {
            connective.or(Some(Connective::And))
        };
        self.conditions.push(FilterCondition {
            column,
            operator,
            value,
            connective,
        });
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|c| c.column.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Render the WHERE fragment and collect arguments in placeholder order
    ///
    /// `= NULL` renders as `IS NULL` and `!= NULL` as `IS NOT NULL`; neither
    /// binds an argument.
    pub fn compile(&self) -> CompiledFilter {
        let mut parts = Vec::with_capacity(self.conditions.len());
        let mut args = Vec::new();

        for condition in &self.conditions {
            let predicate = match (condition.operator, &condition.value) {
                (Operator::Eq, Value::Null) => format!("{} IS NULL", condition.column),
                (Operator::Ne, Value::Null) => format!("{} IS NOT NULL", condition.column),
                (operator, value) => {
                    args.push(value.clone());
                    format!("{} {} ?", condition.column, operator.as_sql())
                }
            };

            match condition.connective {
                Some(connective) => parts.push(format!("{} {}", connective.as_sql(), predicate)),
                None => parts.push(predicate),
            }
        }

        CompiledFilter {
            fragment: parts.join(" "),
            args,
        }
    }
}
