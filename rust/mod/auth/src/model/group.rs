use serde::{Deserialize, Serialize};

use invctl_sql::{Record, Value};

/// A role group. The set is fixed (see `invctl_core::Role`) and seeded at
/// startup; membership decides what a user may do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl Record for Group {
    const TABLE: &'static str = "groups";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::text(&self.name)),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}
