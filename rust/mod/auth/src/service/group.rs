use tracing::info;

use invctl_core::{new_id, now_rfc3339, Role};
use invctl_sql::{RecordStore, Statement, Value};

use crate::model::Group;
use crate::service::{AuthError, AuthService};

impl AuthService {
    /// Create any missing role group. Safe to call on every start.
    pub fn ensure_role_groups(&self) -> Result<usize, AuthError> {
        let mut created = 0;
        for role in Role::ALL {
            if self.group_by_name(role.group_name())?.is_some() {
                continue;
            }
            let group = Group {
                id: new_id(),
                name: role.group_name().to_string(),
                created_at: now_rfc3339(),
            };
            self.sql.create(&group)?;
            info!(group = %group.name, "created role group");
            created += 1;
        }
        Ok(created)
    }

    pub fn group_by_name(&self, name: &str) -> Result<Option<Group>, AuthError> {
        Ok(self.sql.select_one("WHERE name = ?1", &[Value::text(name)])?)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, AuthError> {
        Ok(self.sql.select("ORDER BY name", &[])?)
    }

    /// Names of the groups a user belongs to, sorted.
    pub fn user_group_names(&self, user_id: &str) -> Result<Vec<String>, AuthError> {
        let rows = self.sql.query(
            "SELECT g.name AS name FROM group_members m JOIN groups g ON g.id = m.group_id \
             WHERE m.user_id = ?1 ORDER BY g.name",
            &[Value::text(user_id)],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_str("name").map(str::to_string))
            .collect())
    }

    /// Replace a user's memberships with exactly `names`.
    pub fn set_user_groups(&self, user_id: &str, names: &[String]) -> Result<Vec<String>, AuthError> {
        self.get_user(user_id)?;

        let mut stmts = vec![Statement::new(
            "DELETE FROM group_members WHERE user_id = ?1",
            vec![Value::text(user_id)],
        )];
        for name in names {
            let group = self
                .group_by_name(name)?
                .ok_or_else(|| AuthError::Validation(format!("unknown group '{}'", name)))?;
            stmts.push(membership_insert(&group.id, user_id));
        }
        self.sql.exec_batch(&stmts)?;
        info!(user_id, groups = ?names, "updated group membership");
        self.user_group_names(user_id)
    }
}

pub(crate) fn membership_insert(group_id: &str, user_id: &str) -> Statement {
    Statement::new(
        "INSERT OR IGNORE INTO group_members (group_id, user_id, added_at) VALUES (?1, ?2, ?3)",
        vec![Value::text(group_id), Value::text(user_id), Value::text(now_rfc3339())],
    )
}
