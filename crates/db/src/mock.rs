//! Recording store double with failure injection.

use std::sync::{Mutex, MutexGuard};

use crate::{Row, Store, StoreError, Transaction, Value};

/// One interaction with the store, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Ping,
    Begin,
    Execute { sql: String, params: Vec<Value> },
    QueryRow { sql: String, params: Vec<Value> },
    Query { sql: String, params: Vec<Value> },
    Commit,
    Rollback,
}

impl Call {
    /// Leading SQL keyword of a statement call (`"INSERT"`, `"DELETE"`, ...).
    pub fn action(&self) -> Option<&str> {
        match self {
            Call::Execute { sql, .. } | Call::QueryRow { sql, .. } | Call::Query { sql, .. } => {
                sql.split_whitespace().next()
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct Script {
    ping_error: Option<String>,
    begin_error: Option<String>,
    statement_error: Option<String>,
    commit_error: Option<String>,
    rollback_error: Option<String>,
    row: Option<Row>,
    rows: Vec<Row>,
    rows_affected: u64,
}

#[derive(Default)]
struct State {
    script: Script,
    calls: Vec<Call>,
}

/// In-process [`Store`] that records every call and answers from a script.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<State>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row answered by every `query_row`.
    pub fn with_row(self, row: Row) -> Self {
        self.script(|s| s.row = Some(row))
    }

    /// Rows answered by every `query`.
    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        self.script(|s| s.rows = rows)
    }

    /// Count answered by every `execute`.
    pub fn with_rows_affected(self, count: u64) -> Self {
        self.script(|s| s.rows_affected = count)
    }

    pub fn fail_ping(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.ping_error = Some(message))
    }

    pub fn fail_begin(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.begin_error = Some(message))
    }

    /// Make every `execute`, `query_row` and `query` fail.
    pub fn fail_statements(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.statement_error = Some(message))
    }

    pub fn fail_commit(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.commit_error = Some(message))
    }

    pub fn fail_rollback(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.rollback_error = Some(message))
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|call| pred(call)).count()
    }

    fn script(self, edit: impl FnOnce(&mut Script)) -> Self {
        edit(&mut self.state().script);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test must not hide the calls from the next assertion.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: Call) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    fn run_execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let state = self.record(Call::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &state.script.statement_error {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(state.script.rows_affected),
        }
    }

    fn run_query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        let state = self.record(Call::QueryRow {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &state.script.statement_error {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(state.script.row.clone()),
        }
    }
}

impl Store for MockStore {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        self.run_execute(sql, params)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        self.run_query_row(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let state = self.record(Call::Query {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &state.script.statement_error {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(state.script.rows.clone()),
        }
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        let state = self.record(Call::Begin);
        if let Some(message) = &state.script.begin_error {
            return Err(StoreError::Unavailable(message.clone()));
        }
        Ok(Box::new(MockTransaction { store: self }))
    }

    fn ping(&self) -> Result<(), StoreError> {
        let state = self.record(Call::Ping);
        match &state.script.ping_error {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

struct MockTransaction<'a> {
    store: &'a MockStore,
}

impl Transaction for MockTransaction<'_> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        self.store.run_execute(sql, params)
    }

    fn query_row(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        self.store.run_query_row(sql, params)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let state = self.store.record(Call::Commit);
        match &state.script.commit_error {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let state = self.store.record(Call::Rollback);
        match &state.script.rollback_error {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let store = MockStore::new().with_rows_affected(1);
        store.ping().unwrap();
        let mut tx = store.begin().unwrap();
        assert_eq!(
            tx.execute("DELETE FROM t WHERE id = ?1", &[Value::Integer(3)])
                .unwrap(),
            1
        );
        tx.commit().unwrap();

        let calls = store.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], Call::Ping);
        assert_eq!(calls[1], Call::Begin);
        assert_eq!(calls[2].action(), Some("DELETE"));
        assert_eq!(calls[3], Call::Commit);
    }

    #[test]
    fn injected_failures_surface() {
        let store = MockStore::new()
            .fail_ping("gone")
            .fail_statements("boom")
            .fail_rollback("stuck");
        assert!(matches!(store.ping(), Err(StoreError::Unavailable(m)) if m == "gone"));
        let mut tx = store.begin().unwrap();
        assert!(tx.query_row("SELECT 1", &[]).is_err());
        assert!(tx.rollback().is_err());
        assert_eq!(store.count(|c| *c == Call::Rollback), 1);
    }

    #[test]
    fn scripted_rows_are_returned() {
        let store = MockStore::new().with_rows(vec![
            Row::new(vec![Value::Integer(1)]),
            Row::new(vec![Value::Integer(2)]),
        ]);
        let rows = store.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(store.query_row("SELECT id FROM t", &[]).unwrap().is_none());
    }
}
