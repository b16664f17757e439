//! BTA Database Layer
//!
//! SQLite persistence for analysis history and users. The connection is
//! shared behind a mutex; every query module takes a `&DbPool`.

pub mod migrations;
pub mod pool;
pub mod queries;

pub use pool::{DbError, DbPool, DbResult};

use std::path::Path;

/// Open (or create) the database at `path` and run migrations.
pub fn init_pool(path: impl AsRef<Path>) -> DbResult<DbPool> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DbError::Io(e.to_string()))?;
    }
    let pool = DbPool::open(path)?;
    migrations::run_migrations(&pool)?;
    tracing::debug!(path = %path.display(), "Database ready");
    Ok(pool)
}

/// In-memory database with migrations applied.
pub fn init_memory_pool() -> DbResult<DbPool> {
    let pool = DbPool::in_memory()?;
    migrations::run_migrations(&pool)?;
    Ok(pool)
}
