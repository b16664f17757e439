//! User queries.

use crate::pool::{DbError, DbPool, DbResult};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// User row from database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub user_id: String,
    pub email: Option<String>,
    pub created_at: String,
    pub total_analyses: i64,
}

/// Create a user.
pub fn create_user(pool: &DbPool, user_id: &str, email: Option<&str>) -> DbResult<UserRow> {
    let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT INTO users (user_id, email, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, email, created_at],
        )
        .map_err(|e| crate::pool::conflict_or(e, || format!("User already exists: {}", user_id)))?;
        Ok(UserRow {
            id: conn.last_insert_rowid(),
            user_id: user_id.to_string(),
            email: email.map(str::to_string),
            created_at,
            total_analyses: 0,
        })
    })
}

/// Get a user by external user ID.
pub fn get_user(pool: &DbPool, user_id: &str) -> DbResult<Option<UserRow>> {
    pool.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT id, user_id, email, created_at, total_analyses
                 FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        email: row.get(2)?,
                        created_at: row.get(3)?,
                        total_analyses: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    })
}

/// Bump a user's analysis counter. Returns false when the user is unknown.
pub fn increment_user_analyses(pool: &DbPool, user_id: &str) -> DbResult<bool> {
    pool.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE users SET total_analyses = total_analyses + 1 WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(affected > 0)
    })
}
