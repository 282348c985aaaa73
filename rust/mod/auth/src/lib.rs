//! Auth module: accounts, role groups and JWT sessions.
//!
//! # Resources
//!
//! - **User** — login account with an argon2id password hash
//! - **Group** — one of the fixed role groups (Warehouse Manager, Technician, ...)
//! - **Session** — JWT issuance record, revoked on logout
//!
//! The service also implements `invctl_core::UserDirectory`, which is how
//! the business modules resolve assignees and actor names.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use invctl_core::{Module, ServiceError};
use invctl_sql::SQLStore;

use crate::service::{AuthConfig, AuthService};

pub use api::auth_middleware;
pub use service::password::{hash_password, verify_password};

/// Auth module implementing the Module trait.
pub struct AuthModule {
    service: Arc<AuthService>,
}

impl AuthModule {
    pub fn new(sql: Arc<dyn SQLStore>, config: AuthConfig) -> Result<Self, ServiceError> {
        let service = AuthService::new(sql, config)?;
        Ok(Self { service })
    }

    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }
}

impl Module for AuthModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
