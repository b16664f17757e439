//! Analysis history queries.

use crate::pool::{DbError, DbPool, DbResult};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Analysis history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub id: i64,
    pub user_id: String,
    pub file_name: String,
    pub query: String,
    pub analysis_type: String,
    pub result: String,
    pub created_at: String,
    pub processing_time: f64,
    pub status: String,
    pub task_id: Option<String>,
}

/// Fields needed to record an analysis.
#[derive(Debug, Clone)]
pub struct NewAnalysis<'a> {
    pub user_id: &'a str,
    pub file_name: &'a str,
    pub query: &'a str,
    pub analysis_type: &'a str,
    pub result: &'a str,
    pub processing_time: f64,
    pub status: &'a str,
    pub task_id: Option<&'a str>,
}

const COLUMNS: &str = "id, user_id, file_name, query, analysis_type, result,
                       created_at, processing_time, status, task_id";

fn map_row(row: &Row<'_>) -> rusqlite::Result<AnalysisRow> {
    Ok(AnalysisRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        file_name: row.get(2)?,
        query: row.get(3)?,
        analysis_type: row.get(4)?,
        result: row.get(5)?,
        created_at: row.get(6)?,
        processing_time: row.get(7)?,
        status: row.get(8)?,
        task_id: row.get(9)?,
    })
}

/// Insert an analysis record. Returns the new row id.
pub fn insert_analysis(pool: &DbPool, new: &NewAnalysis<'_>) -> DbResult<i64> {
    let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT INTO analysis_results
                (user_id, file_name, query, analysis_type, result,
                 created_at, processing_time, status, task_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                new.user_id,
                new.file_name,
                new.query,
                new.analysis_type,
                new.result,
                created_at,
                new.processing_time,
                new.status,
                new.task_id,
            ],
        )
        .map_err(|e| {
            crate::pool::conflict_or(e, || {
                format!("Analysis for task {}", new.task_id.unwrap_or("-"))
            })
        })?;
        Ok(conn.last_insert_rowid())
    })
}

/// Get an analysis by ID.
pub fn get_analysis(pool: &DbPool, id: i64) -> DbResult<AnalysisRow> {
    pool.with_conn(|conn| {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM analysis_results WHERE id = ?1"),
            params![id],
            map_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("Analysis: {}", id)),
            e => DbError::Connection(e),
        })
    })
}

/// Get the analysis recorded for a queued task, if any.
pub fn get_analysis_by_task(pool: &DbPool, task_id: &str) -> DbResult<Option<AnalysisRow>> {
    pool.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM analysis_results WHERE task_id = ?1"),
                params![task_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// List a user's analyses, newest first.
pub fn list_analyses_for_user(
    pool: &DbPool,
    user_id: &str,
    limit: u32,
) -> DbResult<Vec<AnalysisRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM analysis_results
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![user_id, limit], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Delete an analysis.
pub fn delete_analysis(pool: &DbPool, id: i64) -> DbResult<()> {
    pool.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM analysis_results WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(DbError::NotFound(format!("Analysis: {}", id)));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record<'a>(user_id: &'a str, result: &'a str) -> NewAnalysis<'a> {
        NewAnalysis {
            user_id,
            file_name: "blood_test_report_x.pdf",
            query: "Summarise my Blood Test Report",
            analysis_type: "summary",
            result,
            processing_time: 1.25,
            status: "completed",
            task_id: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let pool = crate::init_memory_pool().unwrap();
        let id = insert_analysis(&pool, &record("alice", "All values in range.")).unwrap();

        let row = get_analysis(&pool, id).unwrap();
        assert_eq!(row.user_id, "alice");
        assert_eq!(row.result, "All values in range.");
        assert_eq!(row.status, "completed");
        assert_eq!(row.processing_time, 1.25);
        assert!(row.task_id.is_none());
    }

    #[test]
    fn test_get_missing() {
        let pool = crate::init_memory_pool().unwrap();
        assert!(matches!(get_analysis(&pool, 42), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_history_is_scoped_to_user() {
        let pool = crate::init_memory_pool().unwrap();
        insert_analysis(&pool, &record("alice", "a1")).unwrap();
        insert_analysis(&pool, &record("bob", "b1")).unwrap();
        insert_analysis(&pool, &record("alice", "a2")).unwrap();

        let alice = list_analyses_for_user(&pool, "alice", 50).unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|r| r.user_id == "alice"));
        // Newest first
        assert_eq!(alice[0].result, "a2");

        let bob = list_analyses_for_user(&pool, "bob", 50).unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].result, "b1");

        assert!(list_analyses_for_user(&pool, "carol", 50).unwrap().is_empty());
        assert_eq!(list_analyses_for_user(&pool, "alice", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_task_lookup_and_uniqueness() {
        let pool = crate::init_memory_pool().unwrap();
        let mut new = record("alice", "done");
        new.task_id = Some("task-1");
        let id = insert_analysis(&pool, &new).unwrap();

        let row = get_analysis_by_task(&pool, "task-1").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert!(get_analysis_by_task(&pool, "task-2").unwrap().is_none());

        assert!(matches!(insert_analysis(&pool, &new), Err(DbError::Conflict(_))));
    }

    #[test]
    fn test_delete() {
        let pool = crate::init_memory_pool().unwrap();
        let id = insert_analysis(&pool, &record("alice", "ok")).unwrap();

        delete_analysis(&pool, id).unwrap();
        assert!(matches!(delete_analysis(&pool, id), Err(DbError::NotFound(_))));
    }
}
