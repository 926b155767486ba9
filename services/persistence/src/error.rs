//! Persistence error taxonomy.
//!
//! Grounded on `libs/types/src/errors.rs`'s per-component `thiserror` enum
//! style; this is the one variant the types crate itself cannot own, since
//! it wraps `sqlx::Error` and `types` must stay free of any storage
//! dependency.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("row not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
