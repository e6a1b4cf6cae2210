//! SQLite persistence for the Quill platform.
//!
//! `Database` wraps a single rusqlite connection; repositories are
//! stateless and take `&Connection`, so callers compose them inside one
//! `with_tx` when a mutation must be atomic (task write + outbox record,
//! reminder claim).

pub mod conversations;
pub mod database;
pub mod error;
pub mod outbox;
pub mod processed;
pub mod row_helpers;
pub mod schema;
pub mod tags;
pub mod tasks;
pub mod users;

pub use database::Database;
pub use error::StoreError;
