pub mod columns;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod repository;

pub use columns::{ColumnRecorder, ColumnStore};
pub use manager::{DatabaseError, DatabaseManager};
pub use record::{FieldValue, Record, RecordError};
pub use repository::{DataRepository, SearchFilter};
