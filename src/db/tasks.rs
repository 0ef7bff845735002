//! Task CRUD, board moves, and label links.

use super::ordering::{self, TASKS};
use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{Label, Stage, Task, TaskDetail};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use std::collections::HashMap;
use uuid::Uuid;

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        stage_id: row.get("stage_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        order: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Task by id, visible only through the caller's ownership chain
/// (task -> stage -> project -> user).
pub(crate) fn get_task_owned_internal(
    conn: &Connection,
    task_id: &str,
    user_id: &str,
) -> Result<Option<Task>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.stage_id, t.title, t.description, t.position, t.created_at, t.updated_at
         FROM tasks t
         JOIN stages s ON s.id = t.stage_id
         JOIN projects p ON p.id = s.project_id
         WHERE t.id = ?1 AND p.user_id = ?2",
    )?;

    let result = stmt.query_row(params![task_id, user_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Tasks of one stage in board order.
pub(crate) fn list_tasks_internal(conn: &Connection, stage_id: &str) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, stage_id, title, description, position, created_at, updated_at
         FROM tasks WHERE stage_id = ?1 ORDER BY position ASC",
    )?;

    let tasks = stmt
        .query_map(params![stage_id], parse_task_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(tasks)
}

/// Labels attached to a task, oldest label first.
pub(crate) fn task_labels_internal(conn: &Connection, task_id: &str) -> Result<Vec<Label>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.project_id, l.name, l.color, l.created_at
         FROM labels l
         JOIN task_labels tl ON tl.label_id = l.id
         WHERE tl.task_id = ?1
         ORDER BY l.created_at ASC, l.id ASC",
    )?;

    let labels = stmt
        .query_map(params![task_id], super::labels::parse_label_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(labels)
}

/// Expand a task with its subtasks and labels. `stage` is attached for
/// direct task responses and left out when the task is nested under its
/// stage already.
pub(crate) fn expand_task_internal(
    conn: &Connection,
    task: Task,
    stage: Option<Stage>,
) -> Result<TaskDetail> {
    let subtasks = super::subtasks::list_subtasks_internal(conn, &task.id)?;
    let labels = task_labels_internal(conn, &task.id)?;

    Ok(TaskDetail {
        task,
        stage,
        subtasks,
        labels,
    })
}

/// All tasks of a stage, fully expanded, in board order.
pub(crate) fn stage_tasks_detail_internal(
    conn: &Connection,
    stage_id: &str,
) -> Result<Vec<TaskDetail>> {
    list_tasks_internal(conn, stage_id)?
        .into_iter()
        .map(|task| expand_task_internal(conn, task, None))
        .collect()
}

impl Database {
    /// Create a task in a stage the user owns, appended unless a position
    /// is requested.
    pub fn create_task(
        &self,
        user_id: &str,
        stage_id: &str,
        title: &str,
        description: Option<String>,
        order: Option<i64>,
    ) -> Result<TaskDetail> {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let stage = super::stages::get_stage_owned_internal(&tx, stage_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Stage"))?;

            let position = ordering::insert_position(&tx, TASKS, stage_id, order)?;

            tx.execute(
                "INSERT INTO tasks (id, stage_id, title, description, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![&id, stage_id, title, description, position, now, now],
            )?;

            tx.commit()?;

            Ok(TaskDetail {
                task: Task {
                    id: id.clone(),
                    stage_id: stage_id.to_string(),
                    title: title.to_string(),
                    description,
                    order: position,
                    created_at: now,
                    updated_at: now,
                },
                stage: Some(stage),
                subtasks: Vec::new(),
                labels: Vec::new(),
            })
        })
    }

    /// All tasks across a project's stages, expanded, ordered by stage
    /// then position. Each task carries its stage for client grouping.
    pub fn list_tasks_by_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<TaskDetail>> {
        self.with_conn(|conn| {
            super::projects::get_project_internal(conn, project_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Project"))?;

            let stages: HashMap<String, Stage> =
                super::stages::list_stages_internal(conn, project_id)?
                    .into_iter()
                    .map(|stage| (stage.id.clone(), stage))
                    .collect();

            let mut stmt = conn.prepare(
                "SELECT t.id, t.stage_id, t.title, t.description, t.position,
                        t.created_at, t.updated_at
                 FROM tasks t
                 JOIN stages s ON s.id = t.stage_id
                 WHERE s.project_id = ?1
                 ORDER BY s.position ASC, t.position ASC",
            )?;

            let tasks = stmt
                .query_map(params![project_id], parse_task_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            tasks
                .into_iter()
                .map(|task| {
                    let stage = stages.get(&task.stage_id).cloned();
                    expand_task_internal(conn, task, stage)
                })
                .collect()
        })
    }

    /// Get one task by id, with its stage, subtasks, and labels.
    pub fn get_task(&self, user_id: &str, task_id: &str) -> Result<Option<TaskDetail>> {
        self.with_conn(|conn| {
            let Some(task) = get_task_owned_internal(conn, task_id, user_id)? else {
                return Ok(None);
            };

            let stage = super::stages::get_stage_internal(conn, &task.stage_id)?;
            Ok(Some(expand_task_internal(conn, task, stage)?))
        })
    }

    /// Update a task's title and/or description. Movement goes through
    /// [`Database::move_task`].
    pub fn update_task(
        &self,
        user_id: &str,
        task_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<TaskDetail> {
        let now = now_ms();

        self.with_conn(|conn| {
            let task = get_task_owned_internal(conn, task_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Task"))?;

            let new_title = title.unwrap_or_else(|| task.title.clone());
            let new_description = description.or_else(|| task.description.clone());

            conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![&new_title, &new_description, now, task_id],
            )?;

            let stage = super::stages::get_stage_internal(conn, &task.stage_id)?;
            let updated = Task {
                title: new_title,
                description: new_description,
                updated_at: now,
                ..task
            };

            expand_task_internal(conn, updated, stage)
        })
    }

    /// Move a task to a stage/position. The destination stage must belong
    /// to the task's own project. Within one stage this is a two-range
    /// shift; across stages the source gap is closed and a destination
    /// slot opened, all in one transaction.
    pub fn move_task(
        &self,
        user_id: &str,
        task_id: &str,
        dest_stage_id: &str,
        order: Option<i64>,
    ) -> Result<TaskDetail> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let task = get_task_owned_internal(&tx, task_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Task"))?;

            // Destination must sit in the same project as the task.
            let mut stmt = tx.prepare(
                "SELECT s.id, s.project_id, s.name, s.position, s.created_at, s.updated_at
                 FROM stages s
                 JOIN projects p ON p.id = s.project_id
                 WHERE s.id = ?1 AND p.user_id = ?2
                   AND s.project_id = (SELECT project_id FROM stages WHERE id = ?3)",
            )?;
            let dest_stage = match stmt.query_row(
                params![dest_stage_id, user_id, &task.stage_id],
                super::stages::parse_stage_row,
            ) {
                Ok(stage) => stage,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(ApiError::not_found("Stage").into());
                }
                Err(e) => return Err(e.into()),
            };
            drop(stmt);

            let position = if task.stage_id == dest_stage_id {
                let siblings = ordering::count(&tx, TASKS, &task.stage_id)?;
                let target = ordering::move_target(siblings, order);
                ordering::shift_for_move(&tx, TASKS, &task.stage_id, task_id, task.order, target)?;
                target
            } else {
                ordering::close_gap(&tx, TASKS, &task.stage_id, task.order)?;
                ordering::insert_position(&tx, TASKS, dest_stage_id, order)?
            };

            tx.execute(
                "UPDATE tasks SET stage_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                params![dest_stage_id, position, now, task_id],
            )?;

            let moved = Task {
                stage_id: dest_stage_id.to_string(),
                order: position,
                updated_at: now,
                ..task
            };
            let detail = expand_task_internal(&tx, moved, Some(dest_stage))?;

            tx.commit()?;
            Ok(detail)
        })
    }

    /// Delete a task and close the gap in its stage. Subtasks and label
    /// links go with it via the cascade.
    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let task = get_task_owned_internal(&tx, task_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Task"))?;

            ordering::close_gap(&tx, TASKS, &task.stage_id, task.order)?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Attach a label to a task. The label must belong to the task's
    /// project. Attaching an already-attached label is a no-op.
    pub fn add_task_label(&self, user_id: &str, task_id: &str, label_id: &str) -> Result<()> {
        let now = now_ms();

        self.with_conn(|conn| {
            let task = get_task_owned_internal(conn, task_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Task"))?;
            let label = super::labels::get_label_owned_internal(conn, label_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Label"))?;

            let task_project: String = conn.query_row(
                "SELECT project_id FROM stages WHERE id = ?1",
                params![&task.stage_id],
                |row| row.get(0),
            )?;
            if label.project_id != task_project {
                return Err(ApiError::not_found("Label").into());
            }

            conn.execute(
                "INSERT OR IGNORE INTO task_labels (task_id, label_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![task_id, label_id, now],
            )?;

            Ok(())
        })
    }

    /// Detach a label from a task. Missing links are reported, not ignored.
    pub fn remove_task_label(&self, user_id: &str, task_id: &str, label_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            get_task_owned_internal(conn, task_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Task"))?;

            let removed = conn.execute(
                "DELETE FROM task_labels WHERE task_id = ?1 AND label_id = ?2",
                params![task_id, label_id],
            )?;

            if removed == 0 {
                return Err(ApiError::not_found("Task label").into());
            }

            Ok(())
        })
    }
}
