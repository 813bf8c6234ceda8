pub mod objects;
pub mod records;
pub mod schema;

pub use objects::DirectoryObjectStore;
pub use records::{DatabaseError, SqliteRecordStore};
