use tracing::info;

use invctl_core::{new_id, now_rfc3339, ListParams, ListResult, Role};
use invctl_sql::{record, RecordStore, Statement, Value};

use crate::model::{RegisterUser, User, UserView};
use crate::service::group::membership_insert;
use crate::service::password::hash_password;
use crate::service::{AuthError, AuthService};

const MIN_PASSWORD_LEN: usize = 8;

impl AuthService {
    /// Self-service sign-up into one role group.
    ///
    /// Master Role cannot be chosen here; it is granted through
    /// [`AuthService::set_user_groups`].
    pub fn register(&self, input: RegisterUser) -> Result<User, AuthError> {
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(AuthError::Validation("username is required".into()));
        }
        if username == "root" || username.chars().any(char::is_whitespace) {
            return Err(AuthError::Validation(format!("username '{}' is not allowed", username)));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if input.password != input.password_confirm {
            return Err(AuthError::Validation("passwords do not match".into()));
        }
        if Role::from_group_name(&input.role) == Some(Role::Master) {
            return Err(AuthError::Forbidden("Master Role cannot be self-assigned".into()));
        }
        let group = self
            .group_by_name(&input.role)?
            .ok_or_else(|| AuthError::Validation(format!("unknown role '{}'", input.role)))?;

        if self.find_by_username(&username)?.is_some() {
            return Err(AuthError::Conflict(format!("username '{}' is taken", username)));
        }

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            username,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        };
        let hash = hash_password(&input.password)?;

        self.sql.exec_batch(&[
            record::insert(&user)?,
            Statement::new(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                vec![Value::Text(hash), Value::text(&user.id)],
            ),
            membership_insert(&group.id, &user.id),
        ])?;

        info!(username = %user.username, role = %group.name, "registered user");
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<User, AuthError> {
        Ok(self.sql.load(id)?)
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .sql
            .select_one("WHERE username = ?1", &[Value::text(username)])?)
    }

    pub(crate) fn password_hash_of(&self, user_id: &str) -> Result<String, AuthError> {
        let rows = self.sql.query(
            "SELECT password_hash FROM users WHERE id = ?1",
            &[Value::text(user_id)],
        )?;
        Ok(rows
            .first()
            .and_then(|r| r.get_str("password_hash"))
            .unwrap_or_default()
            .to_string())
    }

    pub fn user_view(&self, id: &str) -> Result<UserView, AuthError> {
        let user = self.get_user(id)?;
        let groups = self.user_group_names(&user.id)?;
        Ok(UserView { user, groups })
    }

    /// List users, optionally restricted to members of one group
    /// (`params.status` carries the group name).
    pub fn list_users(&self, params: &ListParams) -> Result<ListResult<UserView>, AuthError> {
        let (clause, mut args) = match params.status.as_deref() {
            Some(group) => (
                "WHERE id IN (SELECT m.user_id FROM group_members m JOIN groups g \
                 ON g.id = m.group_id WHERE g.name = ?1)"
                    .to_string(),
                vec![Value::text(group)],
            ),
            None => (String::new(), vec![]),
        };
        let total = self.sql.count::<User>(&clause, &args)?;

        let page = format!(
            "{} ORDER BY username LIMIT ?{} OFFSET ?{}",
            clause,
            args.len() + 1,
            args.len() + 2
        );
        args.push(Value::Integer(params.limit as i64));
        args.push(Value::Integer(params.offset as i64));
        let users: Vec<User> = self.sql.select(&page, &args)?;

        let items = users
            .into_iter()
            .map(|user| {
                let groups = self.user_group_names(&user.id)?;
                Ok(UserView { user, groups })
            })
            .collect::<Result<Vec<_>, AuthError>>()?;
        Ok(ListResult { items, total })
    }

    /// Activate or deactivate an account. Deactivation revokes sessions.
    pub fn set_active(&self, id: &str, active: bool) -> Result<User, AuthError> {
        let mut user = self.get_user(id)?;
        user.active = active;
        user.updated_at = now_rfc3339();
        let mut stmts = vec![record::update(&user)?];
        if !active {
            stmts.push(Statement::new(
                "UPDATE sessions SET revoked = 1, \
                 data = json_set(data, '$.revoked', json('true')) WHERE user_id = ?1",
                vec![Value::text(id)],
            ));
        }
        self.sql.exec_batch(&stmts)?;
        info!(username = %user.username, active, "changed account state");
        Ok(user)
    }
}
