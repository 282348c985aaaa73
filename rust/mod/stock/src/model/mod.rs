mod location;
mod part;
mod purchase;
mod qc;
mod sku;

pub use location::*;
pub use part::*;
pub use purchase::*;
pub use qc::*;
pub use sku::*;

use serde::Deserialize;

/// A lead or manager's verdict on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}
