// SPDX-License-Identifier: AGPL-3.0-or-later

//! Boundary onto the backing store.
//!
//! The form engine never talks to a database directly. Every statement it compiles is handed to
//! an [`Executor`] which runs it against the backend and returns the resulting rows. Statement
//! text uses `@pN`-style named parameters and bracketed identifiers.
use std::collections::BTreeMap;
use std::fmt::{self, Display};

use async_trait::async_trait;

use crate::db::errors::ExecutionError;
use crate::form::Value;

pub mod errors;

/// One result row, mapping column names (or aliases) to their values.
pub type Row = BTreeMap<String, Value>;

/// Named parameters bound to a statement, keyed by their name including the `@` prefix.
pub type Parameters = BTreeMap<String, Value>;

/// Name of the primary key column every backend table carries.
pub const PRIMARY_KEY_COLUMN: &str = "Cinchy ID";

/// Soft-delete filter appended to every read, update and delete.
pub const NOT_DELETED_SQL: &str = "[Deleted] IS NULL";

/// Statement text together with the parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text.
    pub text: String,

    /// Values for the named parameters used in the text.
    pub parameters: Parameters,
}

impl Statement {
    /// Returns a new statement.
    pub fn new(text: &str, parameters: Parameters) -> Self {
        Self {
            text: text.to_owned(),
            parameters,
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)?;

        for (name, value) in &self.parameters {
            write!(f, "\n  {name} = {value}")?;
        }

        Ok(())
    }
}

/// Executes one statement at a time against the backing store.
///
/// No batching is assumed, callers await every statement before sending the next one.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute the statement and return all rows it produced.
    async fn execute_statement(&self, statement: &Statement) -> Result<Vec<Row>, ExecutionError>;
}

/// Wraps an identifier in square brackets, escaping closing brackets inside of it.
pub fn bracket(identifier: &str) -> String {
    format!("[{}]", identifier.replace(']', "]]"))
}

/// Reads the primary key of a row.
///
/// Backends return it either under the primary key column name or as an `id` alias.
pub fn row_id_of(row: &Row) -> Option<i64> {
    row.get(PRIMARY_KEY_COLUMN)
        .or_else(|| row.get("id"))
        .and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use crate::form::Value;

    use super::{bracket, row_id_of, Parameters, Row, Statement};

    #[test]
    fn brackets_identifiers() {
        assert_eq!(bracket("Name"), "[Name]");
        assert_eq!(bracket("Odd]Name"), "[Odd]]Name]");
    }

    #[test]
    fn reads_row_ids() {
        let mut row = Row::new();
        row.insert("Cinchy ID".into(), Value::Number(12.0));
        assert_eq!(row_id_of(&row), Some(12));

        let mut row = Row::new();
        row.insert("id".into(), Value::Text("7".into()));
        assert_eq!(row_id_of(&row), Some(7));

        assert_eq!(row_id_of(&Row::new()), None);
    }

    #[test]
    fn display_lists_parameters() {
        let mut parameters = Parameters::new();
        parameters.insert("@p0".into(), Value::Text("Acme".into()));
        let statement = Statement::new("SELECT @p0", parameters);

        assert_eq!(statement.to_string(), "SELECT @p0\n  @p0 = 'Acme'");
    }
}
