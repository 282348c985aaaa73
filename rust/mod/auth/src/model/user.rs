use serde::{Deserialize, Serialize};

use invctl_sql::{Record, Value};

/// A login account. The password hash is kept in its own column and never
/// appears in the JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Login name, unique.
    pub username: String,

    /// Deactivated users cannot log in.
    #[serde(default = "default_true")]
    pub active: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

impl Record for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("username", Value::text(&self.username)),
            ("active", Value::bool(self.active)),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

/// Self-service sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    /// Group name, e.g. "Technician".
    pub role: String,
}

/// A user together with their group names.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub groups: Vec<String>,
}

fn default_true() -> bool {
    true
}
