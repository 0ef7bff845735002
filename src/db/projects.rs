//! Project CRUD: default-stage seeding, nested board reads, cascade delete.

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{Project, ProjectDetail, ProjectSummary, Stage};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

/// Stages every new project starts with, in board order.
pub const DEFAULT_STAGES: [&str; 4] = ["Backlog", "To Do", "Doing", "Done"];

pub(crate) fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Project by id, visible only to its owner.
pub(crate) fn get_project_internal(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
) -> Result<Option<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, description, created_at, updated_at
         FROM projects WHERE id = ?1 AND user_id = ?2",
    )?;

    let result = stmt.query_row(params![project_id, user_id], parse_project_row);

    match result {
        Ok(project) => Ok(Some(project)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Project with its stage list and labels, stages not expanded.
fn project_summary_internal(conn: &Connection, project: Project) -> Result<ProjectSummary> {
    let stages = super::stages::list_stages_internal(conn, &project.id)?;
    let labels = super::labels::list_labels_internal(conn, &project.id)?;

    Ok(ProjectSummary {
        project,
        stages,
        labels,
    })
}

impl Database {
    /// Create a project seeded with the four default stages.
    pub fn create_project(
        &self,
        user_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<ProjectSummary> {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO projects (id, user_id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, user_id, name, description, now, now],
            )?;

            let mut stages = Vec::with_capacity(DEFAULT_STAGES.len());
            for (position, stage_name) in DEFAULT_STAGES.iter().enumerate() {
                let stage_id = Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO stages (id, project_id, name, position, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![&stage_id, &id, stage_name, position as i64, now, now],
                )?;
                stages.push(Stage {
                    id: stage_id,
                    project_id: id.clone(),
                    name: stage_name.to_string(),
                    order: position as i64,
                    created_at: now,
                    updated_at: now,
                });
            }

            tx.commit()?;

            Ok(ProjectSummary {
                project: Project {
                    id: id.clone(),
                    user_id: user_id.to_string(),
                    name: name.to_string(),
                    description,
                    created_at: now,
                    updated_at: now,
                },
                stages,
                labels: Vec::new(),
            })
        })
    }

    /// List the user's projects, most recently updated first.
    pub fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, created_at, updated_at
                 FROM projects WHERE user_id = ?1 ORDER BY updated_at DESC",
            )?;

            let projects = stmt
                .query_map(params![user_id], parse_project_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            projects
                .into_iter()
                .map(|project| project_summary_internal(conn, project))
                .collect()
        })
    }

    /// Get one project with the full board nested under it.
    pub fn get_project(&self, user_id: &str, project_id: &str) -> Result<Option<ProjectDetail>> {
        self.with_conn(|conn| {
            let Some(project) = get_project_internal(conn, project_id, user_id)? else {
                return Ok(None);
            };

            let stages = super::stages::list_stages_internal(conn, project_id)?
                .into_iter()
                .map(|stage| super::stages::stage_detail_internal(conn, stage))
                .collect::<Result<Vec<_>>>()?;
            let labels = super::labels::list_labels_internal(conn, project_id)?;

            Ok(Some(ProjectDetail {
                project,
                stages,
                labels,
            }))
        })
    }

    /// Update a project's name and/or description.
    pub fn update_project(
        &self,
        user_id: &str,
        project_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<ProjectSummary> {
        let now = now_ms();

        self.with_conn(|conn| {
            let project = get_project_internal(conn, project_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Project"))?;

            let new_name = name.unwrap_or_else(|| project.name.clone());
            let new_description = description.or_else(|| project.description.clone());

            conn.execute(
                "UPDATE projects SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![&new_name, &new_description, now, project_id],
            )?;

            let updated = Project {
                name: new_name,
                description: new_description,
                updated_at: now,
                ..project
            };

            project_summary_internal(conn, updated)
        })
    }

    /// Delete a project. Stages, tasks, subtasks, labels, and label links
    /// all go with it via the cascades.
    pub fn delete_project(&self, user_id: &str, project_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            get_project_internal(conn, project_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Project"))?;

            conn.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
            Ok(())
        })
    }
}
