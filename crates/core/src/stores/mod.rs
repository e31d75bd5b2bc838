pub mod memory;
pub mod sqlite;

pub use memory::InMemoryDocumentRegistry;
pub use sqlite::SqliteDocumentRegistry;
