//! bookcore - configuration, storage and payment plumbing for the book bot
//!
//! This crate holds everything that does not need a Telegram connection:
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, input validation
//! - `domain`: regions, book languages, payment status, money
//! - `storage`: SQLite pool, migrations, user and payment records
//! - `payments`: Stripe checkout sessions, price table, webhook signatures

pub mod core;
pub mod domain;
pub mod payments;
pub mod storage;

// Re-export commonly used types for convenience
pub use crate::core::error::{AppError, AppResult};
pub use crate::domain::{BookLanguage, Country, Money, PaymentStatus};
pub use crate::storage::{create_pool, DbPool, SqliteStore, Store};
