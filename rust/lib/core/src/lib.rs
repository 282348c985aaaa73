pub mod auth;
pub mod config;
pub mod error;
pub mod module;
pub mod status;
pub mod types;
pub mod upload;

pub use auth::{Claims, FixedDirectory, Role, UserDirectory, UserRef, ROOT_ROLE_ID};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use module::Module;
pub use types::{
    code, format_rupiah, new_id, now_rfc3339, optional, required, today, ListParams, ListResult,
};
pub use upload::{FilePart, FormData};
