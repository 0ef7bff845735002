//! Stage CRUD plus position bookkeeping within the owning project.

use super::ordering::{self, STAGES};
use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{Stage, StageDetail};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

pub(crate) fn parse_stage_row(row: &Row) -> rusqlite::Result<Stage> {
    Ok(Stage {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        order: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Stage by id without an ownership check. Only for callers that have
/// already proven ownership through another chain.
pub(crate) fn get_stage_internal(conn: &Connection, stage_id: &str) -> Result<Option<Stage>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, position, created_at, updated_at
         FROM stages WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![stage_id], parse_stage_row);

    match result {
        Ok(stage) => Ok(Some(stage)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Stage by id, visible only when its project belongs to the user.
pub(crate) fn get_stage_owned_internal(
    conn: &Connection,
    stage_id: &str,
    user_id: &str,
) -> Result<Option<Stage>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.project_id, s.name, s.position, s.created_at, s.updated_at
         FROM stages s
         JOIN projects p ON p.id = s.project_id
         WHERE s.id = ?1 AND p.user_id = ?2",
    )?;

    let result = stmt.query_row(params![stage_id, user_id], parse_stage_row);

    match result {
        Ok(stage) => Ok(Some(stage)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Stages of a project in board order.
pub(crate) fn list_stages_internal(conn: &Connection, project_id: &str) -> Result<Vec<Stage>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, position, created_at, updated_at
         FROM stages WHERE project_id = ?1 ORDER BY position ASC",
    )?;

    let stages = stmt
        .query_map(params![project_id], parse_stage_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(stages)
}

/// Expand a stage with its tasks, tasks fully expanded.
pub(crate) fn stage_detail_internal(conn: &Connection, stage: Stage) -> Result<StageDetail> {
    let tasks = super::tasks::stage_tasks_detail_internal(conn, &stage.id)?;
    Ok(StageDetail { stage, tasks })
}

impl Database {
    /// Create a stage in a project the user owns, appended unless a
    /// position is requested.
    pub fn create_stage(
        &self,
        user_id: &str,
        project_id: &str,
        name: &str,
        order: Option<i64>,
    ) -> Result<StageDetail> {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            super::projects::get_project_internal(&tx, project_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Project"))?;

            let position = ordering::insert_position(&tx, STAGES, project_id, order)?;

            tx.execute(
                "INSERT INTO stages (id, project_id, name, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, project_id, name, position, now, now],
            )?;

            tx.commit()?;

            Ok(StageDetail {
                stage: Stage {
                    id: id.clone(),
                    project_id: project_id.to_string(),
                    name: name.to_string(),
                    order: position,
                    created_at: now,
                    updated_at: now,
                },
                tasks: Vec::new(),
            })
        })
    }

    /// List a project's stages in board order, tasks expanded.
    pub fn list_stages(&self, user_id: &str, project_id: &str) -> Result<Vec<StageDetail>> {
        self.with_conn(|conn| {
            super::projects::get_project_internal(conn, project_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Project"))?;

            list_stages_internal(conn, project_id)?
                .into_iter()
                .map(|stage| stage_detail_internal(conn, stage))
                .collect()
        })
    }

    /// Get one stage by id, tasks expanded.
    pub fn get_stage(&self, user_id: &str, stage_id: &str) -> Result<Option<StageDetail>> {
        self.with_conn(|conn| {
            let Some(stage) = get_stage_owned_internal(conn, stage_id, user_id)? else {
                return Ok(None);
            };

            Ok(Some(stage_detail_internal(conn, stage)?))
        })
    }

    /// Rename and/or reposition a stage. A position change shifts every
    /// stage between the old and new slot in the same transaction.
    pub fn update_stage(
        &self,
        user_id: &str,
        stage_id: &str,
        name: Option<String>,
        order: Option<i64>,
    ) -> Result<StageDetail> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let stage = get_stage_owned_internal(&tx, stage_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Stage"))?;

            let position = match order {
                Some(requested) => {
                    let siblings = ordering::count(&tx, STAGES, &stage.project_id)?;
                    let target = ordering::move_target(siblings, Some(requested));
                    ordering::shift_for_move(
                        &tx,
                        STAGES,
                        &stage.project_id,
                        stage_id,
                        stage.order,
                        target,
                    )?;
                    target
                }
                None => stage.order,
            };

            let new_name = name.unwrap_or_else(|| stage.name.clone());

            tx.execute(
                "UPDATE stages SET name = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                params![&new_name, position, now, stage_id],
            )?;

            let updated = Stage {
                name: new_name,
                order: position,
                updated_at: now,
                ..stage
            };
            let detail = stage_detail_internal(&tx, updated)?;

            tx.commit()?;
            Ok(detail)
        })
    }

    /// Delete an empty stage and close the gap it leaves. A stage that
    /// still holds tasks is refused.
    pub fn delete_stage(&self, user_id: &str, stage_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let stage = get_stage_owned_internal(&tx, stage_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Stage"))?;

            let task_count = ordering::count(&tx, ordering::TASKS, stage_id)?;
            if task_count > 0 {
                return Err(ApiError::constraint(
                    "Cannot delete stage with tasks. Move or delete tasks first.",
                )
                .into());
            }

            ordering::close_gap(&tx, STAGES, &stage.project_id, stage.order)?;
            tx.execute("DELETE FROM stages WHERE id = ?1", params![stage_id])?;

            tx.commit()?;
            Ok(())
        })
    }
}
