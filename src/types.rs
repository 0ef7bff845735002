//! Core domain types for the kanban server.
//!
//! All wire-facing structs serialize with camelCase keys. Timestamps are
//! millisecond epoch values. Ordered entities (stages, tasks, subtasks)
//! carry an `order` field that is contiguous and zero-based within their
//! sibling group.

use serde::{Deserialize, Serialize};

/// A registered user. The password hash stays in the db layer and is
/// never part of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A project owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Project with its stage list and labels (list/create/update responses).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub stages: Vec<Stage>,
    pub labels: Vec<Label>,
}

/// Project with the full board nested: stages, their tasks, and each
/// task's subtasks and labels, every level sorted by order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub stages: Vec<StageDetail>,
    pub labels: Vec<Label>,
}

/// An ordered column within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A stage with its tasks, tasks fully expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDetail {
    #[serde(flatten)]
    pub stage: Stage,
    pub tasks: Vec<TaskDetail>,
}

/// An ordered task within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub stage_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A task with its subtasks and labels. `stage` is filled for direct
/// task reads and omitted when the task is nested under its stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub subtasks: Vec<Subtask>,
    pub labels: Vec<Label>,
}

/// An ordered subtask within a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub completed: bool,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A label scoped to a project, attachable to that project's tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub color: String,
    pub created_at: i64,
}
