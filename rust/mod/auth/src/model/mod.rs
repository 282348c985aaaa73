mod group;
mod session;
mod user;

pub use group::*;
pub use session::*;
pub use user::*;

pub use invctl_core::Claims;
