use thiserror::Error;

use invctl_core::ServiceError;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid blob key: {0:?}")]
    InvalidKey(String),
}

impl From<BlobError> for ServiceError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::InvalidKey(k) => ServiceError::Validation(format!("invalid file key {:?}", k)),
            BlobError::Io(m) => ServiceError::Storage(m),
        }
    }
}
