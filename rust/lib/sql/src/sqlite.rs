use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::debug;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Statement, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path).map_err(|e| SQLError::Connection(e.to_string()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory().map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let columns = column_names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row_value_at(row, i)))
                    .collect();
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        rows.map(|r| r.map_err(|e| SQLError::Query(e.to_string())))
            .collect()
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let affected = conn
            .execute(sql, param_refs.as_slice())
            .map_err(SQLError::from_rusqlite)?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, statements: &[Statement]) -> Result<(), SQLError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let tx = conn.transaction().map_err(SQLError::from_rusqlite)?;
        for stmt in statements {
            let bound = bind_params(&stmt.params);
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                bound.iter().map(|b| b.as_ref()).collect();
            tx.execute(&stmt.sql, param_refs.as_slice())
                .map_err(SQLError::from_rusqlite)?;
        }
        // Dropping `tx` on the error paths above rolls back.
        tx.commit().map_err(SQLError::from_rusqlite)
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    use rusqlite::types::ValueRef;
    match row.get_ref(idx) {
        Ok(ValueRef::Integer(i)) => Value::Integer(i),
        Ok(ValueRef::Real(f)) => Value::Real(f),
        Ok(ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        Ok(ValueRef::Blob(b)) => Value::Blob(b.to_vec()),
        Ok(ValueRef::Null) | Err(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let s = SqliteStore::open_in_memory().unwrap();
        s.exec(
            "CREATE TABLE t (id TEXT PRIMARY KEY, code TEXT UNIQUE, n INTEGER)",
            &[],
        )
        .unwrap();
        s
    }

    #[test]
    fn query_returns_typed_columns() {
        let s = store();
        s.exec(
            "INSERT INTO t (id, code, n) VALUES (?1, ?2, ?3)",
            &[Value::text("a"), Value::text("A-01"), Value::Integer(4)],
        )
        .unwrap();
        let rows = s.query("SELECT id, code, n FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("code"), Some("A-01"));
        assert_eq!(rows[0].get_i64("n"), Some(4));
    }

    #[test]
    fn unique_violation_is_conflict() {
        let s = store();
        let insert = "INSERT INTO t (id, code, n) VALUES (?1, ?2, 0)";
        s.exec(insert, &[Value::text("a"), Value::text("X")]).unwrap();
        let err = s.exec(insert, &[Value::text("b"), Value::text("X")]).unwrap_err();
        assert!(matches!(err, SQLError::Conflict(_)));
    }

    #[test]
    fn batch_rolls_back_on_failure() {
        let s = store();
        let batch = vec![
            Statement::new(
                "INSERT INTO t (id, code, n) VALUES ('a', 'X', 1)",
                vec![],
            ),
            Statement::new(
                "INSERT INTO t (id, code, n) VALUES ('b', 'X', 2)",
                vec![],
            ),
        ];
        assert!(s.exec_batch(&batch).is_err());
        let rows = s.query("SELECT id FROM t", &[]).unwrap();
        assert!(rows.is_empty());

        s.exec_batch(&batch[..1]).unwrap();
        assert_eq!(s.query("SELECT id FROM t", &[]).unwrap().len(), 1);
    }
}
