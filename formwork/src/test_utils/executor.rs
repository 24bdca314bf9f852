// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::errors::ExecutionError;
use crate::db::{Executor, Row, Statement};
use crate::form::Value;

type Responder = Box<dyn Fn(&Statement) -> Option<Result<Vec<Row>, ExecutionError>> + Send + Sync>;

/// Executor capturing every statement it receives.
///
/// Inserts answer with a fresh id starting at 100, every other statement with no rows. A
/// responder can script answers for selected statements, returning `None` falls back to the
/// default behaviour.
pub struct RecordingExecutor {
    statements: Mutex<Vec<Statement>>,
    responder: Option<Responder>,
    next_id: AtomicI64,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            responder: None,
            next_id: AtomicI64::new(100),
        }
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&Statement) -> Option<Result<Vec<Row>, ExecutionError>> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// All statements executed so far, in execution order.
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    /// Texts of all statements executed so far.
    pub fn texts(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .map(|statement| statement.text)
            .collect()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute_statement(&self, statement: &Statement) -> Result<Vec<Row>, ExecutionError> {
        self.statements.lock().unwrap().push(statement.clone());

        if let Some(response) = self
            .responder
            .as_ref()
            .and_then(|responder| responder(statement))
        {
            return response;
        }

        if statement.text.contains("INSERT INTO") {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut row = Row::new();
            row.insert("id".to_string(), Value::from(id));
            return Ok(vec![row]);
        }

        Ok(Vec::new())
    }
}
