use serde::{Deserialize, Serialize};

use invctl_sql::{Record, Value};

/// A JWT session record, used for revocation on logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session id (UUIDv4, no dashes); the token's `sid` claim.
    pub id: String,

    /// Owning user id, or "root".
    pub user_id: String,

    /// RFC 3339 timestamp when the token was issued.
    pub issued_at: String,

    /// RFC 3339 timestamp when the token expires.
    pub expires_at: String,

    #[serde(default)]
    pub revoked: bool,
}

impl Record for Session {
    const TABLE: &'static str = "sessions";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("user_id", Value::text(&self.user_id)),
            ("revoked", Value::bool(self.revoked)),
            ("created_at", Value::text(&self.issued_at)),
        ]
    }
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token returned after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
