//! Identity types shared by every module.
//!
//! Business modules never depend on the auth module directly. They see the
//! caller through [`Claims`] (inserted by the auth middleware) and look up
//! other users through a [`UserDirectory`] injected at startup.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Role id carried by the virtual root superuser.
pub const ROOT_ROLE_ID: &str = "auth:root";

/// The fixed role groups. A user's access is decided by membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Warehouse Manager")]
    WarehouseManager,
    #[serde(rename = "Technician")]
    Technician,
    #[serde(rename = "Lead Technician")]
    LeadTechnician,
    #[serde(rename = "Purchasing")]
    Purchasing,
    #[serde(rename = "Sales")]
    Sales,
    #[serde(rename = "Master Role")]
    Master,
}

impl Role {
    /// Dashboard precedence: a user in several groups sees the first match.
    pub const ALL: [Role; 6] = [
        Role::WarehouseManager,
        Role::Technician,
        Role::LeadTechnician,
        Role::Purchasing,
        Role::Sales,
        Role::Master,
    ];

    pub fn group_name(&self) -> &'static str {
        match self {
            Role::WarehouseManager => "Warehouse Manager",
            Role::Technician => "Technician",
            Role::LeadTechnician => "Lead Technician",
            Role::Purchasing => "Purchasing",
            Role::Sales => "Sales",
            Role::Master => "Master Role",
        }
    }

    pub fn from_group_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.group_name() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id (or "root").
    pub sub: String,
    /// Username.
    pub name: String,
    /// Group names the user belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Extra roles. Root carries [`ROOT_ROLE_ID`].
    #[serde(default)]
    pub roles: Vec<String>,
    /// Session id, used for revocation.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_root(&self) -> bool {
        self.roles.iter().any(|r| r == ROOT_ROLE_ID)
    }

    /// Group membership only; root is not implicitly a member of anything.
    pub fn in_group(&self, role: Role) -> bool {
        self.groups.iter().any(|g| g == role.group_name())
    }

    /// Allow root or a member of `role`.
    pub fn require(&self, role: Role) -> Result<(), ServiceError> {
        self.require_any(&[role])
    }

    /// Allow root or a member of any of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ServiceError> {
        if self.is_root() || roles.iter().any(|r| self.in_group(*r)) {
            return Ok(());
        }
        let names: Vec<&str> = roles.iter().map(|r| r.group_name()).collect();
        Err(ServiceError::PermissionDenied(format!(
            "user '{}' must be in group {}",
            self.name,
            names.join(" or ")
        )))
    }

    /// The role that decides which dashboard the user sees.
    pub fn primary_role(&self) -> Option<Role> {
        Role::ALL.into_iter().find(|r| self.in_group(*r))
    }
}

/// A user as other modules see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub username: String,
}

/// Read-only view of users and their group membership.
///
/// Implemented by the auth module; business modules use it to validate
/// assignees and to render actor names.
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id.
    fn user(&self, id: &str) -> Result<Option<UserRef>, ServiceError>;

    /// Whether the user is a member of the role group.
    fn has_role(&self, user_id: &str, role: Role) -> Result<bool, ServiceError>;

    /// All active members of a role group, ordered by username.
    fn members(&self, role: Role) -> Result<Vec<UserRef>, ServiceError>;

    /// Display name for an actor, falling back to the raw id.
    fn display_name(&self, id: &str) -> String {
        match self.user(id) {
            Ok(Some(u)) => u.username,
            _ => id.to_string(),
        }
    }
}

/// In-memory directory with a fixed user list. Used by module tests.
#[derive(Debug, Default, Clone)]
pub struct FixedDirectory {
    users: HashMap<String, (UserRef, Vec<Role>)>,
}

impl FixedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, username: &str, roles: &[Role]) -> Self {
        self.users.insert(
            id.to_string(),
            (
                UserRef {
                    id: id.to_string(),
                    username: username.to_string(),
                },
                roles.to_vec(),
            ),
        );
        self
    }
}

impl UserDirectory for FixedDirectory {
    fn user(&self, id: &str) -> Result<Option<UserRef>, ServiceError> {
        Ok(self.users.get(id).map(|(u, _)| u.clone()))
    }

    fn has_role(&self, user_id: &str, role: Role) -> Result<bool, ServiceError> {
        Ok(self
            .users
            .get(user_id)
            .is_some_and(|(_, roles)| roles.contains(&role)))
    }

    fn members(&self, role: Role) -> Result<Vec<UserRef>, ServiceError> {
        let mut out: Vec<UserRef> = self
            .users
            .values()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(u, _)| u.clone())
            .collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(out)
    }
}
