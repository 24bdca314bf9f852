// SPDX-License-Identifier: AGPL-3.0-or-later

//! Compilers turning the current state of a form into statement text and parameters.
mod date;
mod delete;
mod save;
mod select;
mod serialize;

pub(crate) use select::compile_link_options;

use crate::db::{bracket, Parameters, Statement, NOT_DELETED_SQL, PRIMARY_KEY_COLUMN};
use crate::form::{Value, PARENT_ID_PLACEHOLDER};

/// Name of the parameter carrying the row id in attached file writes.
pub const ROW_ID_PARAMETER: &str = "@rowId";

/// Name of the parameter carrying the file contents in attached file writes.
pub const FILE_PARAMETER: &str = "@file";

/// Name of the parameter carrying the file name in attached file writes.
pub const FILE_NAME_PARAMETER: &str = "@fileName";

/// File contents of a binary column, written out of band after the record was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedFile {
    /// Domain of the table.
    pub domain: String,

    /// Table holding the binary column.
    pub table: String,

    /// Binary column.
    pub column: String,

    /// File name.
    pub file_name: Option<String>,

    /// `UPDATE` statement writing the file, taking the row id as `@rowId`.
    pub query: String,

    /// File contents.
    pub value: Value,

    /// Contents were already written as part of an insert statement.
    pub inline: bool,
}

impl AttachedFile {
    /// Binds the file write to the row it belongs to.
    pub fn statement(&self, row_id: i64) -> Statement {
        let mut parameters = Parameters::new();
        parameters.insert(ROW_ID_PARAMETER.to_string(), Value::from(row_id));
        parameters.insert(FILE_PARAMETER.to_string(), self.value.clone());

        if self.query.contains(FILE_NAME_PARAMETER) {
            parameters.insert(
                FILE_NAME_PARAMETER.to_string(),
                self.file_name
                    .clone()
                    .map(Value::Text)
                    .unwrap_or(Value::Null),
            );
        }

        Statement::new(&self.query, parameters)
    }
}

/// Result of compiling a form: statement text, its parameters and the files to write after it
/// got executed.
///
/// A missing text with attached files means only files have to be written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledStatement {
    /// Statement text, `None` for file-only results.
    pub text: Option<String>,

    /// Named parameters referenced by the text.
    pub parameters: Parameters,

    /// Files of binary columns.
    pub attached_files: Vec<AttachedFile>,
}

impl CompiledStatement {
    /// Returns the executable statement, `None` for file-only results.
    pub fn statement(&self) -> Option<Statement> {
        self.text
            .as_ref()
            .map(|text| Statement::new(text, self.parameters.clone()))
    }

    /// Returns true if the statement still waits for the id of its parent record.
    pub fn has_parent_placeholder(&self) -> bool {
        let in_text = self
            .text
            .as_ref()
            .map_or(false, |text| text.contains(PARENT_ID_PLACEHOLDER));

        in_text
            || self.parameters.values().any(|value| match value {
                Value::Text(text) => text.contains(PARENT_ID_PLACEHOLDER),
                Value::List(items) => items.iter().any(|item| item.contains(PARENT_ID_PLACEHOLDER)),
                _ => false,
            })
    }

    /// Replaces every parent id placeholder in the text and the parameters with the id.
    pub fn substitute_parent_id(&mut self, parent_id: i64) {
        let id = parent_id.to_string();

        if let Some(text) = self.text.as_mut() {
            *text = text.replace(PARENT_ID_PLACEHOLDER, &id);
        }

        for value in self.parameters.values_mut() {
            match value {
                Value::Text(text) => *text = text.replace(PARENT_ID_PLACEHOLDER, &id),
                Value::List(items) => {
                    for item in items.iter_mut() {
                        *item = item.replace(PARENT_ID_PLACEHOLDER, &id);
                    }
                }
                _ => (),
            }
        }
    }
}

/// Hands out parameter names in allocation order.
#[derive(Debug, Default)]
struct ParameterAllocator {
    parameters: Parameters,
    next: usize,
}

impl ParameterAllocator {
    fn push(&mut self, value: Value) -> String {
        let name = format!("@p{}", self.next);
        self.next += 1;
        self.parameters.insert(name.clone(), value);
        name
    }

    fn is_empty(&self) -> bool {
        self.next == 0
    }

    fn into_parameters(self) -> Parameters {
        self.parameters
    }
}

/// `WHERE` clause selecting one live row by primary key.
fn primary_key_filter(row_id: i64) -> String {
    format!(
        "WHERE {} = {} AND {}",
        bracket(PRIMARY_KEY_COLUMN),
        row_id,
        NOT_DELETED_SQL
    )
}

/// Renders a column expression from form metadata. Expressions which are already bracketed are
/// kept as they are, bare column names get bracketed.
fn column_expression(expression: &str) -> String {
    let expression = expression.trim();

    if expression.starts_with('[') {
        expression.to_string()
    } else {
        bracket(expression)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Parameters;
    use crate::form::Value;

    use super::{column_expression, AttachedFile, CompiledStatement};

    #[test]
    fn substitutes_parent_placeholder() {
        let mut parameters = Parameters::new();
        parameters.insert("@p0".into(), Value::from("{parentId}"));
        parameters.insert("@p1".into(), Value::from(vec!["4", "{parentId}"]));
        parameters.insert("@p2".into(), Value::from(7_i64));

        let mut compiled = CompiledStatement {
            text: Some("INSERT INTO [Sales].[Orders] ([Customer]) VALUES (RESOLVELINK(@p0, 'Cinchy ID'))".into()),
            parameters,
            attached_files: Vec::new(),
        };
        assert!(compiled.has_parent_placeholder());

        compiled.substitute_parent_id(42);

        assert!(!compiled.has_parent_placeholder());
        assert_eq!(compiled.parameters["@p0"], Value::from("42"));
        assert_eq!(compiled.parameters["@p1"], Value::from(vec!["4", "42"]));
        assert_eq!(compiled.parameters["@p2"], Value::from(7_i64));
    }

    #[test]
    fn attached_file_binds_row_id() {
        let file = AttachedFile {
            domain: "Sales".into(),
            table: "Contracts".into(),
            column: "Document".into(),
            file_name: Some("contract.pdf".into()),
            query: "UPDATE [Sales].[Contracts] SET [Document] = @file, [Document Name] = @fileName WHERE [Cinchy ID] = @rowId AND [Deleted] IS NULL".into(),
            value: Value::Bytes(vec![1, 2, 3]),
            inline: false,
        };

        let statement = file.statement(9);

        assert_eq!(statement.parameters["@rowId"], Value::from(9_i64));
        assert_eq!(statement.parameters["@fileName"], Value::from("contract.pdf"));
        assert_eq!(statement.parameters["@file"], Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn brackets_bare_expressions_only() {
        assert_eq!(column_expression("Customer"), "[Customer]");
        assert_eq!(
            column_expression("[Customer].[Cinchy ID]"),
            "[Customer].[Cinchy ID]"
        );
    }
}
