pub mod directory;
pub mod group;
pub mod password;
pub mod schema;
pub mod session;
pub mod user;

use std::sync::Arc;

use thiserror::Error;

use invctl_sql::{SQLError, SQLStore};

/// Auth service error type.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<SQLError> for AuthError {
    fn from(e: SQLError) -> Self {
        match e {
            SQLError::NotFound(m) => AuthError::NotFound(m),
            SQLError::Conflict(m) => AuthError::Conflict(m),
            SQLError::Decode(m) => AuthError::Internal(m),
            other => AuthError::Storage(other.to_string()),
        }
    }
}

impl From<AuthError> for invctl_core::ServiceError {
    fn from(e: AuthError) -> Self {
        use invctl_core::ServiceError;
        match e {
            AuthError::NotFound(m) => ServiceError::NotFound(m),
            AuthError::Conflict(m) => ServiceError::Conflict(m),
            AuthError::Validation(m) => ServiceError::Validation(m),
            AuthError::Unauthorized(m) => ServiceError::Unauthorized(m),
            AuthError::Forbidden(m) => ServiceError::PermissionDenied(m),
            AuthError::Storage(m) => ServiceError::Storage(m),
            AuthError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

/// Configuration for the auth service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 24h).
    pub access_token_ttl: i64,
    /// argon2id hash for the virtual `root` account. Root login is
    /// disabled when unset.
    pub root_password_hash: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "invctl-dev-secret-change-me".to_string(),
            access_token_ttl: 86400,
            root_password_hash: None,
        }
    }
}

/// The Auth service. Holds storage and configuration.
pub struct AuthService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) config: AuthConfig,
}

impl AuthService {
    /// Create a new AuthService, initializing the DB schema.
    pub fn new(sql: Arc<dyn SQLStore>, config: AuthConfig) -> Result<Arc<Self>, AuthError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql, config }))
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use invctl_sql::SqliteStore;

    use super::{AuthConfig, AuthService};

    pub fn service() -> Arc<AuthService> {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        let config = AuthConfig {
            root_password_hash: Some(super::password::hash_password("rootpass123").unwrap()),
            ..Default::default()
        };
        let svc = AuthService::new(sql, config).unwrap();
        svc.ensure_role_groups().unwrap();
        svc
    }
}
