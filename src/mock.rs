//! Test double for the connection's send primitive.

use std::collections::VecDeque;

use crate::connection::Executor;
use crate::error::{Error, Result};
use crate::query_result::MySqlQueryResult;

/// Captures every statement buffer handed to the send primitive and
/// returns scripted results (or a default empty OK when the script runs
/// dry).
#[derive(Debug, Default)]
pub struct MockExecutor {
    pub sent: Vec<Vec<u8>>,
    results: VecDeque<Result<MySqlQueryResult>>,
}

impl MockExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next statement.
    pub fn push_result(&mut self, result: Result<MySqlQueryResult>) -> &mut Self {
        self.results.push_back(result);
        self
    }

    /// The statements sent so far, as UTF-8 text (lossy).
    #[must_use]
    pub fn sent_sql(&self) -> Vec<String> {
        self.sent.iter().map(|bytes| String::from_utf8_lossy(bytes).into_owned()).collect()
    }
}

impl Executor for MockExecutor {
    fn send_statement(&mut self, statement: &[u8]) -> Result<MySqlQueryResult> {
        self.sent.push(statement.to_vec());

        match self.results.pop_front() {
            Some(result) => result,
            None => Ok(MySqlQueryResult::default()),
        }
    }
}

/// An executor that always fails, for error-path tests.
#[derive(Debug, Default)]
pub struct FailingExecutor;

impl Executor for FailingExecutor {
    fn send_statement(&mut self, _statement: &[u8]) -> Result<MySqlQueryResult> {
        Err(Error::Database {
            code: 1064,
            message: "You have an error in your SQL syntax".into(),
            sql_state: Some("42000".into()),
        })
    }
}
