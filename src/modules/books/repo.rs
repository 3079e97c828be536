//! Data access for book records.
//!
//! Every write runs inside its own transaction: `Idle -> Open -> Committed`
//! when the statement succeeds, `Idle -> Open -> RolledBack` when it fails.
//! Exactly one of commit or rollback happens per call, and the caller always
//! receives the error that triggered a rollback.
//!
//! Nothing here logs; failures are returned to the caller as [`CatalogError`].

use std::fmt;

use shelf_db::{Store, StoreError, Transaction, Value};
use thiserror::Error;

use super::models::Book;

pub const BOOKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS books (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    author      TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    isbn        TEXT NOT NULL
)";

const INSERT_BOOK: &str =
    "INSERT INTO books (author, title, description, isbn) VALUES (?1, ?2, ?3, ?4) RETURNING id";

const DELETE_BOOK: &str = "DELETE FROM books WHERE id = ?1";

/// Failure class of a [`CatalogError`], for branching without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    Precondition,
    Transaction,
    Statement,
}

/// Transaction step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Begin,
    Commit,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxPhase::Begin => f.write_str("begin"),
            TxPhase::Commit => f.write_str("commit"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("store health check failed")]
    Connectivity(#[source] StoreError),

    #[error("{0}")]
    Precondition(String),

    #[error("failed to {phase} transaction")]
    Transaction {
        phase: TxPhase,
        #[source]
        source: StoreError,
    },

    #[error("statement failed{}", rollback_note(.rollback))]
    Statement {
        #[source]
        source: StoreError,
        /// Set when the rollback that followed the failure also failed.
        rollback: Option<StoreError>,
    },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Connectivity(_) => ErrorKind::Connectivity,
            CatalogError::Precondition(_) => ErrorKind::Precondition,
            CatalogError::Transaction { .. } => ErrorKind::Transaction,
            CatalogError::Statement { .. } => ErrorKind::Statement,
        }
    }
}

fn rollback_note(rollback: &Option<StoreError>) -> String {
    match rollback {
        Some(err) => format!(" (rollback also failed: {err})"),
        None => String::new(),
    }
}

/// Probe the store once. The probe's error is kept as the source.
pub fn check_health(store: &dyn Store) -> Result<(), CatalogError> {
    store.ping().map_err(CatalogError::Connectivity)
}

/// Insert `book` and, once committed, set `book.id` to the generated identifier.
///
/// The incoming `id` is ignored. On failure `book` is left untouched.
pub fn create_book(store: &dyn Store, book: &mut Book) -> Result<(), CatalogError> {
    let params = [
        Value::from(&book.author),
        Value::from(&book.title),
        Value::from(&book.description),
        Value::from(&book.isbn),
    ];

    let id = in_transaction(store, |tx| {
        let row = tx
            .query_row(INSERT_BOOK, &params)?
            .ok_or_else(|| StoreError::Decode("insert returned no identifier".to_string()))?;
        let id = row.get_i64(0)?;
        if id <= 0 {
            return Err(StoreError::Decode(format!(
                "store assigned non-positive identifier {id}"
            )));
        }
        Ok(id)
    })?;

    book.id = id;
    Ok(())
}

/// Delete the record identified by `book.id`.
///
/// Succeeds whether or not a row matched; the affected-row count is not checked.
pub fn delete_book(store: &dyn Store, book: &Book) -> Result<(), CatalogError> {
    if !book.is_persisted() {
        return Err(CatalogError::Precondition(
            "cannot delete book with ID of 0".to_string(),
        ));
    }

    in_transaction(store, |tx| {
        tx.execute(DELETE_BOOK, &[Value::Integer(book.id)])?;
        Ok(())
    })
}

fn in_transaction<'s, T>(
    store: &'s dyn Store,
    work: impl FnOnce(&mut (dyn Transaction + 's)) -> Result<T, StoreError>,
) -> Result<T, CatalogError> {
    let mut tx = store.begin().map_err(|source| CatalogError::Transaction {
        phase: TxPhase::Begin,
        source,
    })?;

    match work(tx.as_mut()) {
        Ok(value) => {
            tx.commit().map_err(|source| CatalogError::Transaction {
                phase: TxPhase::Commit,
                source,
            })?;
            Ok(value)
        }
        Err(source) => Err(CatalogError::Statement {
            source,
            rollback: tx.rollback().err(),
        }),
    }
}
