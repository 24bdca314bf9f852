// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use colored::Colorize;
use formwork::{ExecutionError, Executor, Row, Statement, Value};
use log::debug;

/// First primary key handed out for inserted rows.
const FIRST_GENERATED_ID: i64 = 1000;

const PRIMARY_KEY_FILTER: &str = "WHERE [Cinchy ID] = ";

/// Executor printing every statement instead of running it.
///
/// Inserts answer with generated ids counting up from 1000. Selects of a single record answer
/// with the configured record, all other statements return no rows.
#[derive(Debug)]
pub struct DryRunExecutor {
    record: Row,
    next_id: AtomicI64,
    executed: AtomicUsize,
}

impl DryRunExecutor {
    pub fn new(record: Option<Row>) -> Self {
        Self {
            record: record.unwrap_or_default(),
            next_id: AtomicI64::new(FIRST_GENERATED_ID),
            executed: AtomicUsize::new(0),
        }
    }

    /// Number of statements executed so far.
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    fn respond(&self, statement: &Statement) -> Vec<Row> {
        let text = statement.text.trim_start();

        if text.starts_with("INSERT") || text.starts_with("CREATE TABLE") {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut row = Row::new();
            row.insert("id".into(), Value::from(id));
            return vec![row];
        }

        if text.starts_with("SELECT") && !statement.parameters.contains_key("@parentId") {
            if let Some(row_id) = filtered_row_id(text) {
                let mut row = self.record.clone();
                row.insert("Cinchy ID".into(), Value::from(row_id));
                return vec![row];
            }
        }

        Vec::new()
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    async fn execute_statement(&self, statement: &Statement) -> Result<Vec<Row>, ExecutionError> {
        let index = self.executed.fetch_add(1, Ordering::SeqCst) + 1;
        println!("{} {}\n", format!("[{index}]").bold(), statement);

        let rows = self.respond(statement);
        debug!("Dry run of statement {} returned {} rows", index, rows.len());

        Ok(rows)
    }
}

/// Reads the primary key a statement filters on.
fn filtered_row_id(text: &str) -> Option<i64> {
    let start = text.find(PRIMARY_KEY_FILTER)? + PRIMARY_KEY_FILTER.len();
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use formwork::{Executor, Parameters, Row, Statement, Value};

    use super::{filtered_row_id, DryRunExecutor};

    #[test]
    fn reads_filtered_row_id() {
        assert_eq!(
            filtered_row_id("SELECT [A] FROM [D].[T] WHERE [Cinchy ID] = 42 AND [Deleted] IS NULL"),
            Some(42)
        );
        assert_eq!(filtered_row_id("SELECT [A] FROM [D].[T]"), None);
    }

    #[tokio::test]
    async fn inserts_return_increasing_ids() {
        let executor = DryRunExecutor::new(None);
        let insert = Statement::new("INSERT INTO [D].[T] ([A]) VALUES (@p0)", Parameters::new());

        let first = executor.execute_statement(&insert).await.unwrap();
        let second = executor.execute_statement(&insert).await.unwrap();

        assert_eq!(first[0].get("id"), Some(&Value::from(1000_i64)));
        assert_eq!(second[0].get("id"), Some(&Value::from(1001_i64)));
        assert_eq!(executor.executed(), 2);
    }

    #[tokio::test]
    async fn record_selects_return_the_record() {
        let mut record = Row::new();
        record.insert("Title".into(), Value::from("Order A"));
        let executor = DryRunExecutor::new(Some(record));

        let select = Statement::new(
            "SELECT [Title] FROM [Sales].[Orders] WHERE [Cinchy ID] = 5 AND [Deleted] IS NULL",
            Parameters::new(),
        );
        let rows = executor.execute_statement(&select).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Title"), Some(&Value::from("Order A")));
        assert_eq!(rows[0].get("Cinchy ID"), Some(&Value::from(5_i64)));

        let mut parameters = Parameters::new();
        parameters.insert("@parentId".into(), Value::from(5_i64));
        let children = Statement::new(
            "SELECT [Line] FROM [Sales].[Order Lines] WHERE [Order].[Cinchy ID] = @parentId",
            parameters,
        );
        assert!(executor.execute_statement(&children).await.unwrap().is_empty());
    }
}
