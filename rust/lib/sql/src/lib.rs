pub mod error;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use error::SQLError;
pub use record::{contains_pattern, Record, RecordStore};
pub use sqlite::SqliteStore;
pub use traits::{Row, SQLStore, Statement, Value};
