use thiserror::Error;

use invctl_core::ServiceError;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// A UNIQUE constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl SQLError {
    pub(crate) fn from_rusqlite(e: rusqlite::Error) -> Self {
        let msg = e.to_string();
        if msg.contains("UNIQUE constraint") {
            SQLError::Conflict(msg)
        } else {
            SQLError::Execution(msg)
        }
    }
}

impl From<SQLError> for ServiceError {
    fn from(e: SQLError) -> Self {
        match e {
            SQLError::Conflict(m) => ServiceError::Conflict(m),
            SQLError::NotFound(m) => ServiceError::NotFound(m),
            SQLError::Decode(m) => ServiceError::Internal(m),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}
