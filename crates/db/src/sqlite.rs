//! SQLite backend for [`Store`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use crate::{Row, Store, StoreError, Transaction, Value};

/// A single SQLite connection guarded by a mutex.
///
/// A transaction holds the lock from `BEGIN` until it is finished or dropped.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }
}

impl Store for SqliteStore {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        execute_on(&*self.lock()?, sql, params)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        query_row_on(&*self.lock()?, sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_row(row, width)?);
        }
        Ok(out)
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN")?;
        Ok(Box::new(SqliteTransaction { conn }))
    }

    fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl Transaction for SqliteTransaction<'_> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        execute_on(&self.conn, sql, params)
    }

    fn query_row(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        query_row_on(&self.conn, sql, params)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        // Still inside BEGIN: never hand the shared connection back mid-transaction.
        if !self.conn.is_autocommit() {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(target: "shelf-db", error = %err, "implicit rollback failed");
            }
        }
    }
}

fn execute_on(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
    let affected = conn.execute(sql, params_from_iter(params.iter()))?;
    Ok(affected as u64)
}

fn query_row_on(conn: &Connection, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let width = stmt.column_count();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    match rows.next()? {
        Some(row) => Ok(Some(read_row(row, width)?)),
        None => Ok(None),
    }
}

fn read_row(row: &rusqlite::Row<'_>, width: usize) -> Result<Row, StoreError> {
    let mut columns = Vec::with_capacity(width);
    for idx in 0..width {
        let value = match row.get_ref(idx)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(_) => {
                return Err(StoreError::Decode(format!("column {idx} holds a blob")));
            }
        };
        columns.push(value);
    }
    Ok(Row::new(columns))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}
