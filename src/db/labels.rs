//! Label CRUD, scoped to the owning project.

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::Label;
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

pub(crate) fn parse_label_row(row: &Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
    })
}

/// Labels of a project, oldest first.
pub(crate) fn list_labels_internal(conn: &Connection, project_id: &str) -> Result<Vec<Label>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, color, created_at
         FROM labels WHERE project_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;

    let labels = stmt
        .query_map(params![project_id], parse_label_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(labels)
}

/// Label by id, visible only when its project belongs to the user.
pub(crate) fn get_label_owned_internal(
    conn: &Connection,
    label_id: &str,
    user_id: &str,
) -> Result<Option<Label>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.project_id, l.name, l.color, l.created_at
         FROM labels l
         JOIN projects p ON p.id = l.project_id
         WHERE l.id = ?1 AND p.user_id = ?2",
    )?;

    let result = stmt.query_row(params![label_id, user_id], parse_label_row);

    match result {
        Ok(label) => Ok(Some(label)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a label in a project the user owns.
    pub fn create_label(
        &self,
        user_id: &str,
        project_id: &str,
        name: &str,
        color: &str,
    ) -> Result<Label> {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();

        self.with_conn(|conn| {
            super::projects::get_project_internal(conn, project_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Project"))?;

            conn.execute(
                "INSERT INTO labels (id, project_id, name, color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![&id, project_id, name, color, now],
            )?;

            Ok(Label {
                id: id.clone(),
                project_id: project_id.to_string(),
                name: name.to_string(),
                color: color.to_string(),
                created_at: now,
            })
        })
    }

    /// List a project's labels, oldest first.
    pub fn list_labels(&self, user_id: &str, project_id: &str) -> Result<Vec<Label>> {
        self.with_conn(|conn| {
            super::projects::get_project_internal(conn, project_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Project"))?;

            list_labels_internal(conn, project_id)
        })
    }

    /// Get one label by id.
    pub fn get_label(&self, user_id: &str, label_id: &str) -> Result<Option<Label>> {
        self.with_conn(|conn| get_label_owned_internal(conn, label_id, user_id))
    }

    /// Update a label's name and/or color.
    pub fn update_label(
        &self,
        user_id: &str,
        label_id: &str,
        name: Option<String>,
        color: Option<String>,
    ) -> Result<Label> {
        self.with_conn(|conn| {
            let label = get_label_owned_internal(conn, label_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Label"))?;

            let new_name = name.unwrap_or_else(|| label.name.clone());
            let new_color = color.unwrap_or_else(|| label.color.clone());

            conn.execute(
                "UPDATE labels SET name = ?1, color = ?2 WHERE id = ?3",
                params![&new_name, &new_color, label_id],
            )?;

            Ok(Label {
                id: label.id,
                project_id: label.project_id,
                name: new_name,
                color: new_color,
                created_at: label.created_at,
            })
        })
    }

    /// Delete a label. Task links are removed by the cascade.
    pub fn delete_label(&self, user_id: &str, label_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            get_label_owned_internal(conn, label_id, user_id)?
                .ok_or_else(|| ApiError::not_found("Label"))?;

            conn.execute("DELETE FROM labels WHERE id = ?1", params![label_id])?;
            Ok(())
        })
    }
}
