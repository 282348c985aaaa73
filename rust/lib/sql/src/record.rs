//! JSON-document records over SQL tables.
//!
//! Every table has the shape `id TEXT PRIMARY KEY, data TEXT NOT NULL` plus
//! a few extracted columns used for filtering, ordering and uniqueness. The
//! full record lives in `data`; [`Record::columns`] keeps the extracted
//! columns in step with it on every write.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SQLError;
use crate::traits::{SQLStore, Statement, Value};

/// A model persisted as a JSON document with indexed columns.
pub trait Record: Serialize + DeserializeOwned {
    /// Table name.
    const TABLE: &'static str;

    fn id(&self) -> &str;

    /// Indexed columns written alongside the document.
    fn columns(&self) -> Vec<(&'static str, Value)>;
}

fn encode<R: Record>(record: &R) -> Result<String, SQLError> {
    serde_json::to_string(record).map_err(|e| SQLError::Decode(e.to_string()))
}

fn decode<R: Record>(data: &str) -> Result<R, SQLError> {
    serde_json::from_str(data).map_err(|e| SQLError::Decode(format!("{}: {}", R::TABLE, e)))
}

/// Build an INSERT for `record`.
pub fn insert<R: Record>(record: &R) -> Result<Statement, SQLError> {
    let mut cols = vec!["id", "data"];
    let mut params = vec![Value::text(record.id()), Value::Text(encode(record)?)];
    for (col, val) in record.columns() {
        cols.push(col);
        params.push(val);
    }
    let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        cols.join(", "),
        placeholders.join(", "),
    );
    Ok(Statement::new(sql, params))
}

/// Build an UPDATE rewriting the document and its indexed columns.
pub fn update<R: Record>(record: &R) -> Result<Statement, SQLError> {
    let mut sets = vec!["data = ?1".to_string()];
    let mut params = vec![Value::Text(encode(record)?)];
    for (col, val) in record.columns() {
        params.push(val);
        sets.push(format!("{} = ?{}", col, params.len()));
    }
    params.push(Value::text(record.id()));
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        R::TABLE,
        sets.join(", "),
        params.len(),
    );
    Ok(Statement::new(sql, params))
}

/// Build a DELETE by id.
pub fn delete<R: Record>(id: &str) -> Statement {
    Statement::new(
        format!("DELETE FROM {} WHERE id = ?1", R::TABLE),
        vec![Value::text(id)],
    )
}

/// Typed record access on any [`SQLStore`].
pub trait RecordStore {
    /// Fetch by id or fail with `NotFound`.
    fn load<R: Record>(&self, id: &str) -> Result<R, SQLError>;

    fn find<R: Record>(&self, id: &str) -> Result<Option<R>, SQLError>;

    /// `clause` follows `FROM <table>`, e.g. `WHERE status = ?1 ORDER BY created_at`.
    fn select<R: Record>(&self, clause: &str, params: &[Value]) -> Result<Vec<R>, SQLError>;

    fn select_one<R: Record>(&self, clause: &str, params: &[Value]) -> Result<Option<R>, SQLError>;

    fn count<R: Record>(&self, clause: &str, params: &[Value]) -> Result<usize, SQLError>;

    fn create<R: Record>(&self, record: &R) -> Result<(), SQLError>;

    /// Rewrite an existing record; `NotFound` when the id is unknown.
    fn save<R: Record>(&self, record: &R) -> Result<(), SQLError>;

    fn remove<R: Record>(&self, id: &str) -> Result<(), SQLError>;
}

impl<S: SQLStore + ?Sized> RecordStore for S {
    fn load<R: Record>(&self, id: &str) -> Result<R, SQLError> {
        self.find(id)?
            .ok_or_else(|| SQLError::NotFound(format!("{} '{}' not found", R::TABLE, id)))
    }

    fn find<R: Record>(&self, id: &str) -> Result<Option<R>, SQLError> {
        self.select_one("WHERE id = ?1", &[Value::text(id)])
    }

    fn select<R: Record>(&self, clause: &str, params: &[Value]) -> Result<Vec<R>, SQLError> {
        let sql = format!("SELECT data FROM {} {}", R::TABLE, clause);
        let rows = self.query(&sql, params)?;
        rows.iter()
            .map(|row| {
                let data = row
                    .get_str("data")
                    .ok_or_else(|| SQLError::Decode("missing data column".into()))?;
                decode(data)
            })
            .collect()
    }

    fn select_one<R: Record>(&self, clause: &str, params: &[Value]) -> Result<Option<R>, SQLError> {
        Ok(self.select(clause, params)?.into_iter().next())
    }

    fn count<R: Record>(&self, clause: &str, params: &[Value]) -> Result<usize, SQLError> {
        let sql = format!("SELECT COUNT(*) AS cnt FROM {} {}", R::TABLE, clause);
        let rows = self.query(&sql, params)?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as usize)
    }

    fn create<R: Record>(&self, record: &R) -> Result<(), SQLError> {
        let stmt = insert(record)?;
        self.exec(&stmt.sql, &stmt.params)?;
        Ok(())
    }

    fn save<R: Record>(&self, record: &R) -> Result<(), SQLError> {
        let stmt = update(record)?;
        if self.exec(&stmt.sql, &stmt.params)? == 0 {
            return Err(SQLError::NotFound(format!(
                "{} '{}' not found",
                R::TABLE,
                record.id()
            )));
        }
        Ok(())
    }

    fn remove<R: Record>(&self, id: &str) -> Result<(), SQLError> {
        let stmt = delete::<R>(id);
        if self.exec(&stmt.sql, &stmt.params)? == 0 {
            return Err(SQLError::NotFound(format!("{} '{}' not found", R::TABLE, id)));
        }
        Ok(())
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern and wrap it
/// for a case-insensitive contains match against a lower-cased column.
pub fn contains_pattern(q: &str) -> String {
    let mut out = String::from("%");
    for ch in q.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
