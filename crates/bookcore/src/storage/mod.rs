//! User and payment persistence on SQLite

pub mod db;
pub mod migrations;
pub mod store;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool, PaymentRecord, PaymentUpdate, UserRecord};
pub use store::{SqliteStore, Store};
