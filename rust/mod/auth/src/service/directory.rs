use invctl_core::{Role, ServiceError, UserDirectory, UserRef};
use invctl_sql::{RecordStore, Value};

use crate::model::User;
use crate::service::AuthService;

impl UserDirectory for AuthService {
    fn user(&self, id: &str) -> Result<Option<UserRef>, ServiceError> {
        let user: Option<User> = self.sql.find(id)?;
        Ok(user.map(|u| UserRef {
            id: u.id,
            username: u.username,
        }))
    }

    fn has_role(&self, user_id: &str, role: Role) -> Result<bool, ServiceError> {
        let rows = self.sql.query(
            "SELECT 1 AS hit FROM group_members m JOIN groups g ON g.id = m.group_id \
             JOIN users u ON u.id = m.user_id \
             WHERE m.user_id = ?1 AND g.name = ?2 AND u.active = 1",
            &[Value::text(user_id), Value::text(role.group_name())],
        )?;
        Ok(!rows.is_empty())
    }

    fn members(&self, role: Role) -> Result<Vec<UserRef>, ServiceError> {
        let users: Vec<User> = self.sql.select(
            "WHERE active = 1 AND id IN (SELECT m.user_id FROM group_members m \
             JOIN groups g ON g.id = m.group_id WHERE g.name = ?1) ORDER BY username",
            &[Value::text(role.group_name())],
        )?;
        Ok(users
            .into_iter()
            .map(|u| UserRef {
                id: u.id,
                username: u.username,
            })
            .collect())
    }

    fn display_name(&self, id: &str) -> String {
        if id == crate::service::session::ROOT_USER {
            return id.to_string();
        }
        match self.user(id) {
            Ok(Some(u)) => u.username,
            _ => id.to_string(),
        }
    }
}
