//! Store handle abstraction for the catalog.
//!
//! The catalog talks to its relational store only through [`Store`] and
//! [`Transaction`], so the SQLite backend can be swapped for the recording
//! double in [`mock`] without touching the callers.

use std::sync::Arc;

use thiserror::Error;

pub mod sqlite;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use sqlite::SqliteStore;

/// Handle shared by every request.
pub type SharedStore = Arc<dyn Store>;

/// Errors surfaced by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Backend(String),

    #[error("unexpected row shape: {0}")]
    Decode(String),
}

/// A bound statement parameter or a column value read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

/// One result row, columns in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<Value>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.columns.get(idx)
    }

    /// Read column `idx` as an integer.
    pub fn get_i64(&self, idx: usize) -> Result<i64, StoreError> {
        match self.columns.get(idx) {
            Some(Value::Integer(value)) => Ok(*value),
            Some(other) => Err(StoreError::Decode(format!(
                "column {idx} is not an integer: {other:?}"
            ))),
            None => Err(StoreError::Decode(format!(
                "column {idx} out of range for row of width {}",
                self.columns.len()
            ))),
        }
    }
}

/// Capability the catalog needs from a relational store.
///
/// Statements use positional placeholders (`?1`, `?2`, ...).
pub trait Store: Send + Sync {
    /// Execute a statement that yields no rows; returns the affected-row count.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError>;

    /// Execute a statement and return its first row, if any.
    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError>;

    /// Execute a statement and collect every row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;

    /// Open a transaction. The handle is exclusive until it is finished.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError>;

    /// Connectivity probe.
    fn ping(&self) -> Result<(), StoreError>;
}

/// An open transaction. Finishing consumes it, so the outcome is decided once.
pub trait Transaction {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, StoreError>;

    fn query_row(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Open the SQLite store at `path` (`":memory:"` for an ephemeral one).
pub fn connect(path: &str) -> Result<SharedStore, StoreError> {
    let store = if path == ":memory:" {
        SqliteStore::open_in_memory()?
    } else {
        SqliteStore::open(path)?
    };
    tracing::info!(target: "shelf-db", path, "store opened");
    Ok(Arc::new(store))
}
