//! Subtask CRUD plus position bookkeeping within the owning task.

use super::ordering::{self, SUBTASKS};
use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::Subtask;
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

pub(crate) fn parse_subtask_row(row: &Row) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        completed: row.get("completed")?,
        order: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Subtasks of a task in board order.
pub(crate) fn list_subtasks_internal(conn: &Connection, task_id: &str) -> Result<Vec<Subtask>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, title, completed, position, created_at, updated_at
         FROM subtasks WHERE task_id = ?1 ORDER BY position ASC",
    )?;

    let subtasks = stmt
        .query_map(params![task_id], parse_subtask_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(subtasks)
}

/// Subtask by id, visible only through the caller's ownership chain
/// (subtask -> task -> stage -> project -> user).
fn get_subtask_owned_internal(
    conn: &Connection,
    subtask_id: &str,
    user_id: &str,
) -> Result<Option<Subtask>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.task_id, b.title, b.completed, b.position, b.created_at, b.updated_at
         FROM subtasks b
         JOIN tasks t ON t.id = b.task_id
         JOIN stages s ON s.id = t.stage_id
         JOIN projects p ON p.id = s.project_id
         WHERE b.id = ?1 AND p.user_id = ?2",
    )?;

    let result = stmt.query_row(params![subtask_id, user_id], parse_subtask_row);

    match result {
        Ok(subtask) => Ok(Some(subtask)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a subtask under a task the user owns, appended unless a
    /// position is requested.
    pub fn create_subtask(
        &self,
        user_id: &str,
        task_id: &str,
        title: &str,
        completed: Option<bool>,
        order: Option<i64>,
    ) -> Result<Subtask> {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();
        let completed = completed.unwrap_or(false);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            super::tasks::get_task_owned_internal(&tx, task_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Task"))?;

            let position = ordering::insert_position(&tx, SUBTASKS, task_id, order)?;

            tx.execute(
                "INSERT INTO subtasks (id, task_id, title, completed, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![&id, task_id, title, completed, position, now, now],
            )?;

            tx.commit()?;

            Ok(Subtask {
                id: id.clone(),
                task_id: task_id.to_string(),
                title: title.to_string(),
                completed,
                order: position,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// List a task's subtasks in board order.
    pub fn list_subtasks(&self, user_id: &str, task_id: &str) -> Result<Vec<Subtask>> {
        self.with_conn(|conn| {
            super::tasks::get_task_owned_internal(conn, task_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Task"))?;

            list_subtasks_internal(conn, task_id)
        })
    }

    /// Get one subtask by id.
    pub fn get_subtask(&self, user_id: &str, subtask_id: &str) -> Result<Option<Subtask>> {
        self.with_conn(|conn| get_subtask_owned_internal(conn, subtask_id, user_id))
    }

    /// Update a subtask's title, completion flag, and/or position. A
    /// position change reorders the whole sibling group atomically.
    pub fn update_subtask(
        &self,
        user_id: &str,
        subtask_id: &str,
        title: Option<String>,
        completed: Option<bool>,
        order: Option<i64>,
    ) -> Result<Subtask> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let subtask = get_subtask_owned_internal(&tx, subtask_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Subtask"))?;

            let position = match order {
                Some(requested) => {
                    let siblings = ordering::count(&tx, SUBTASKS, &subtask.task_id)?;
                    let target = ordering::move_target(siblings, Some(requested));
                    ordering::shift_for_move(
                        &tx,
                        SUBTASKS,
                        &subtask.task_id,
                        subtask_id,
                        subtask.order,
                        target,
                    )?;
                    target
                }
                None => subtask.order,
            };

            let new_title = title.unwrap_or_else(|| subtask.title.clone());
            let new_completed = completed.unwrap_or(subtask.completed);

            tx.execute(
                "UPDATE subtasks SET title = ?1, completed = ?2, position = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![&new_title, new_completed, position, now, subtask_id],
            )?;

            tx.commit()?;

            Ok(Subtask {
                id: subtask.id,
                task_id: subtask.task_id,
                title: new_title,
                completed: new_completed,
                order: position,
                created_at: subtask.created_at,
                updated_at: now,
            })
        })
    }

    /// Delete a subtask and close the gap it leaves.
    pub fn delete_subtask(&self, user_id: &str, subtask_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let subtask = get_subtask_owned_internal(&tx, subtask_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Subtask"))?;

            ordering::close_gap(&tx, SUBTASKS, &subtask.task_id, subtask.order)?;
            tx.execute("DELETE FROM subtasks WHERE id = ?1", params![subtask_id])?;

            tx.commit()?;
            Ok(())
        })
    }
}
