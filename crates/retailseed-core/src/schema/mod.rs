pub mod entities;
pub mod types;

pub use entities::*;
pub use types::{EntityKind, Record, RecordKey, Row};
