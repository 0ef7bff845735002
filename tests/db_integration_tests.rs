//! Integration tests for the database layer.
//!
//! These tests verify the core database operations using an in-memory SQLite
//! database. Tests are organized by entity.

use kanban_server::db::Database;
use kanban_server::error::{ApiError, ErrorKind};
use kanban_server::types::User;
use std::thread::sleep;
use std::time::Duration;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

/// Helper to create a user directly in the database.
fn seed_user(db: &Database, email: &str) -> User {
    db.create_user(email, Some("Test User".to_string()), "not-a-real-hash")
        .expect("Failed to create user")
}

/// Extract the typed error from a failed db call.
fn api_error(err: anyhow::Error) -> ApiError {
    err.downcast::<ApiError>().expect("expected an ApiError")
}

mod user_tests {
    use super::*;

    #[test]
    fn create_user_stores_fields() {
        let db = setup_db();

        let user = db
            .create_user("alice@example.com", Some("Alice".to_string()), "hash")
            .expect("Failed to create user");

        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.name, Some("Alice".to_string()));
        assert!(user.created_at > 0);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn create_user_without_name() {
        let db = setup_db();

        let user = db
            .create_user("bob@example.com", None, "hash")
            .expect("Failed to create user");

        assert!(user.name.is_none());
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = setup_db();
        seed_user(&db, "taken@example.com");

        let err = db
            .create_user("taken@example.com", None, "hash")
            .unwrap_err();

        let api = api_error(err);
        assert_eq!(api.kind, ErrorKind::Conflict);
        assert_eq!(api.message, "User with this email already exists");
    }

    #[test]
    fn find_user_by_email_returns_hash() {
        let db = setup_db();
        let user = seed_user(&db, "carol@example.com");

        let (found, hash) = db
            .find_user_by_email("carol@example.com")
            .unwrap()
            .expect("user should exist");

        assert_eq!(found.id, user.id);
        assert_eq!(hash, "not-a-real-hash");
    }

    #[test]
    fn find_user_by_email_returns_none_for_unknown() {
        let db = setup_db();

        let result = db.find_user_by_email("nobody@example.com").unwrap();

        assert!(result.is_none());
    }
}

mod project_tests {
    use super::*;

    #[test]
    fn create_project_seeds_default_stages() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");

        let project = db
            .create_project(&user.id, "Website", None)
            .expect("Failed to create project");

        let names: Vec<&str> = project.stages.iter().map(|s| s.name.as_str()).collect();
        let orders: Vec<i64> = project.stages.iter().map(|s| s.order).collect();
        assert_eq!(names, vec!["Backlog", "To Do", "Doing", "Done"]);
        assert_eq!(orders, vec![0, 1, 2, 3]);
        assert!(project.labels.is_empty());
    }

    #[test]
    fn list_projects_most_recently_updated_first() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");

        let first = db.create_project(&user.id, "First", None).unwrap();
        sleep(Duration::from_millis(5));
        let second = db.create_project(&user.id, "Second", None).unwrap();

        let listed = db.list_projects(&user.id).unwrap();
        assert_eq!(listed[0].project.id, second.project.id);
        assert_eq!(listed[1].project.id, first.project.id);

        // Updating bumps a project back to the front.
        sleep(Duration::from_millis(5));
        db.update_project(&user.id, &first.project.id, Some("First v2".to_string()), None)
            .unwrap();

        let listed = db.list_projects(&user.id).unwrap();
        assert_eq!(listed[0].project.id, first.project.id);
    }

    #[test]
    fn list_projects_is_scoped_to_the_user() {
        let db = setup_db();
        let alice = seed_user(&db, "alice@example.com");
        let bob = seed_user(&db, "bob@example.com");
        db.create_project(&alice.id, "Alice's", None).unwrap();

        let bobs = db.list_projects(&bob.id).unwrap();

        assert!(bobs.is_empty());
    }

    #[test]
    fn get_project_returns_nested_detail() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let stage_id = project.stages[0].id.clone();
        db.create_task(&user.id, &stage_id, "Design", None, None)
            .unwrap();

        let detail = db
            .get_project(&user.id, &project.project.id)
            .unwrap()
            .expect("project should exist");

        assert_eq!(detail.stages.len(), 4);
        assert_eq!(detail.stages[0].tasks.len(), 1);
        assert_eq!(detail.stages[0].tasks[0].task.title, "Design");
        assert_eq!(detail.stages[1].tasks.len(), 0);
    }

    #[test]
    fn get_project_of_another_user_is_none() {
        let db = setup_db();
        let alice = seed_user(&db, "alice@example.com");
        let bob = seed_user(&db, "bob@example.com");
        let project = db.create_project(&alice.id, "Alice's", None).unwrap();

        let result = db.get_project(&bob.id, &project.project.id).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn update_project_of_another_user_is_not_found() {
        let db = setup_db();
        let alice = seed_user(&db, "alice@example.com");
        let bob = seed_user(&db, "bob@example.com");
        let project = db.create_project(&alice.id, "Alice's", None).unwrap();

        let err = db
            .update_project(&bob.id, &project.project.id, Some("Hijacked".to_string()), None)
            .unwrap_err();

        assert_eq!(api_error(err).kind, ErrorKind::NotFound);
    }

    #[test]
    fn update_project_keeps_omitted_fields() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db
            .create_project(&user.id, "Website", Some("A site".to_string()))
            .unwrap();

        let updated = db
            .update_project(&user.id, &project.project.id, Some("Webshop".to_string()), None)
            .unwrap();

        assert_eq!(updated.project.name, "Webshop");
        assert_eq!(updated.project.description, Some("A site".to_string()));
    }

    #[test]
    fn delete_project_cascades_to_children() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let project_id = project.project.id.clone();
        let stage_id = project.stages[0].id.clone();

        let task = db
            .create_task(&user.id, &stage_id, "Design", None, None)
            .unwrap();
        db.create_subtask(&user.id, &task.task.id, "Sketch", None, None)
            .unwrap();
        let label = db
            .create_label(&user.id, &project_id, "urgent", "#FF0000")
            .unwrap();
        db.add_task_label(&user.id, &task.task.id, &label.id).unwrap();

        db.delete_project(&user.id, &project_id).unwrap();

        let counts: (i64, i64, i64, i64, i64) = db
            .with_conn(|conn| {
                Ok((
                    conn.query_row("SELECT COUNT(*) FROM stages", [], |r| r.get(0))?,
                    conn.query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get(0))?,
                    conn.query_row("SELECT COUNT(*) FROM subtasks", [], |r| r.get(0))?,
                    conn.query_row("SELECT COUNT(*) FROM labels", [], |r| r.get(0))?,
                    conn.query_row("SELECT COUNT(*) FROM task_labels", [], |r| r.get(0))?,
                ))
            })
            .unwrap();

        assert_eq!(counts, (0, 0, 0, 0, 0));
    }
}

mod stage_tests {
    use super::*;

    #[test]
    fn create_stage_appends_to_the_board() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();

        let stage = db
            .create_stage(&user.id, &project.project.id, "Review", None)
            .unwrap();

        assert_eq!(stage.stage.order, 4);
        assert!(stage.tasks.is_empty());
    }

    #[test]
    fn create_stage_at_position_shifts_siblings() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();

        let stage = db
            .create_stage(&user.id, &project.project.id, "Triage", Some(1))
            .unwrap();

        assert_eq!(stage.stage.order, 1);
        let stages = db.list_stages(&user.id, &project.project.id).unwrap();
        let pairs: Vec<(&str, i64)> = stages
            .iter()
            .map(|s| (s.stage.name.as_str(), s.stage.order))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Backlog", 0),
                ("Triage", 1),
                ("To Do", 2),
                ("Doing", 3),
                ("Done", 4),
            ]
        );
    }

    #[test]
    fn create_stage_clamps_position_to_append() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();

        let stage = db
            .create_stage(&user.id, &project.project.id, "Later", Some(99))
            .unwrap();

        assert_eq!(stage.stage.order, 4);
    }

    #[test]
    fn create_stage_in_unknown_project_is_not_found() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");

        let err = db
            .create_stage(&user.id, "missing-project", "Review", None)
            .unwrap_err();

        assert_eq!(api_error(err).kind, ErrorKind::NotFound);
    }

    #[test]
    fn rename_stage_keeps_order() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let stage_id = project.stages[2].id.clone();

        let updated = db
            .update_stage(&user.id, &stage_id, Some("In Progress".to_string()), None)
            .unwrap();

        assert_eq!(updated.stage.name, "In Progress");
        assert_eq!(updated.stage.order, 2);
    }

    #[test]
    fn delete_stage_with_tasks_is_refused() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let stage_id = project.stages[1].id.clone();
        db.create_task(&user.id, &stage_id, "Blocker", None, None)
            .unwrap();

        let err = db.delete_stage(&user.id, &stage_id).unwrap_err();

        let api = api_error(err);
        assert_eq!(api.kind, ErrorKind::Constraint);
        assert_eq!(
            api.message,
            "Cannot delete stage with tasks. Move or delete tasks first."
        );

        // Nothing moved.
        let stages = db.list_stages(&user.id, &project.project.id).unwrap();
        let orders: Vec<i64> = stages.iter().map(|s| s.stage.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn stage_of_another_user_is_invisible() {
        let db = setup_db();
        let alice = seed_user(&db, "alice@example.com");
        let bob = seed_user(&db, "bob@example.com");
        let project = db.create_project(&alice.id, "Alice's", None).unwrap();
        let stage_id = project.stages[0].id.clone();

        assert!(db.get_stage(&bob.id, &stage_id).unwrap().is_none());

        let err = db.delete_stage(&bob.id, &stage_id).unwrap_err();
        assert_eq!(api_error(err).kind, ErrorKind::NotFound);
    }
}

mod task_tests {
    use super::*;

    #[test]
    fn create_task_appends_and_expands() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let stage_id = project.stages[0].id.clone();

        db.create_task(&user.id, &stage_id, "First", None, None)
            .unwrap();
        let task = db
            .create_task(
                &user.id,
                &stage_id,
                "Second",
                Some("Details".to_string()),
                None,
            )
            .unwrap();

        assert_eq!(task.task.order, 1);
        assert_eq!(task.task.description, Some("Details".to_string()));
        let stage = task.stage.as_ref().expect("stage should be embedded");
        assert_eq!(stage.id, stage_id);
        assert!(task.subtasks.is_empty());
        assert!(task.labels.is_empty());
    }

    #[test]
    fn create_task_in_foreign_stage_is_not_found() {
        let db = setup_db();
        let alice = seed_user(&db, "alice@example.com");
        let bob = seed_user(&db, "bob@example.com");
        let project = db.create_project(&alice.id, "Alice's", None).unwrap();

        let err = db
            .create_task(&bob.id, &project.stages[0].id, "Sneaky", None, None)
            .unwrap_err();

        assert_eq!(api_error(err).kind, ErrorKind::NotFound);
    }

    #[test]
    fn list_tasks_by_project_orders_by_stage_then_position() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let backlog = project.stages[0].id.clone();
        let todo = project.stages[1].id.clone();

        db.create_task(&user.id, &todo, "T1", None, None).unwrap();
        db.create_task(&user.id, &backlog, "B1", None, None).unwrap();
        db.create_task(&user.id, &backlog, "B2", None, None).unwrap();

        let tasks = db
            .list_tasks_by_project(&user.id, &project.project.id)
            .unwrap();

        let titles: Vec<&str> = tasks.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, vec!["B1", "B2", "T1"]);
    }

    #[test]
    fn get_task_includes_subtasks_and_labels() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let task = db
            .create_task(&user.id, &project.stages[0].id, "Design", None, None)
            .unwrap();
        db.create_subtask(&user.id, &task.task.id, "Sketch", None, None)
            .unwrap();
        let label = db
            .create_label(&user.id, &project.project.id, "ui", "#00FF00")
            .unwrap();
        db.add_task_label(&user.id, &task.task.id, &label.id).unwrap();

        let detail = db
            .get_task(&user.id, &task.task.id)
            .unwrap()
            .expect("task should exist");

        assert_eq!(detail.subtasks.len(), 1);
        assert_eq!(detail.labels.len(), 1);
        assert_eq!(detail.labels[0].name, "ui");
    }

    #[test]
    fn update_task_touches_only_given_fields() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let task = db
            .create_task(
                &user.id,
                &project.stages[0].id,
                "Design",
                Some("Old".to_string()),
                None,
            )
            .unwrap();

        let updated = db
            .update_task(
                &user.id,
                &task.task.id,
                Some("Design v2".to_string()),
                None,
            )
            .unwrap();

        assert_eq!(updated.task.title, "Design v2");
        assert_eq!(updated.task.description, Some("Old".to_string()));
        assert_eq!(updated.task.order, task.task.order);
    }

    #[test]
    fn delete_task_closes_the_gap() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let stage_id = project.stages[0].id.clone();

        db.create_task(&user.id, &stage_id, "A", None, None).unwrap();
        let b = db.create_task(&user.id, &stage_id, "B", None, None).unwrap();
        db.create_task(&user.id, &stage_id, "C", None, None).unwrap();

        db.delete_task(&user.id, &b.task.id).unwrap();

        let tasks = db
            .list_tasks_by_project(&user.id, &project.project.id)
            .unwrap();
        let pairs: Vec<(&str, i64)> = tasks
            .iter()
            .map(|t| (t.task.title.as_str(), t.task.order))
            .collect();
        assert_eq!(pairs, vec![("A", 0), ("C", 1)]);
    }
}

mod subtask_tests {
    use super::*;

    #[test]
    fn create_subtask_defaults_to_not_completed() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let task = db
            .create_task(&user.id, &project.stages[0].id, "Design", None, None)
            .unwrap();

        let subtask = db
            .create_subtask(&user.id, &task.task.id, "Sketch", None, None)
            .unwrap();

        assert!(!subtask.completed);
        assert_eq!(subtask.order, 0);
    }

    #[test]
    fn update_subtask_toggles_completed() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let task = db
            .create_task(&user.id, &project.stages[0].id, "Design", None, None)
            .unwrap();
        let subtask = db
            .create_subtask(&user.id, &task.task.id, "Sketch", None, None)
            .unwrap();

        let updated = db
            .update_subtask(&user.id, &subtask.id, None, Some(true), None)
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.title, "Sketch");
    }

    #[test]
    fn subtask_of_another_user_is_invisible() {
        let db = setup_db();
        let alice = seed_user(&db, "alice@example.com");
        let bob = seed_user(&db, "bob@example.com");
        let project = db.create_project(&alice.id, "Alice's", None).unwrap();
        let task = db
            .create_task(&alice.id, &project.stages[0].id, "Design", None, None)
            .unwrap();
        let subtask = db
            .create_subtask(&alice.id, &task.task.id, "Sketch", None, None)
            .unwrap();

        assert!(db.get_subtask(&bob.id, &subtask.id).unwrap().is_none());

        let err = db
            .update_subtask(&bob.id, &subtask.id, None, Some(true), None)
            .unwrap_err();
        assert_eq!(api_error(err).kind, ErrorKind::NotFound);
    }
}

mod label_tests {
    use super::*;

    #[test]
    fn list_labels_oldest_first() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let project_id = project.project.id.clone();

        db.create_label(&user.id, &project_id, "bug", "#FF0000")
            .unwrap();
        sleep(Duration::from_millis(5));
        db.create_label(&user.id, &project_id, "feature", "#00FF00")
            .unwrap();

        let labels = db.list_labels(&user.id, &project_id).unwrap();
        let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["bug", "feature"]);
    }

    #[test]
    fn attach_label_is_idempotent() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let task = db
            .create_task(&user.id, &project.stages[0].id, "Design", None, None)
            .unwrap();
        let label = db
            .create_label(&user.id, &project.project.id, "ui", "#0000FF")
            .unwrap();

        db.add_task_label(&user.id, &task.task.id, &label.id).unwrap();
        db.add_task_label(&user.id, &task.task.id, &label.id).unwrap();

        let detail = db.get_task(&user.id, &task.task.id).unwrap().unwrap();
        assert_eq!(detail.labels.len(), 1);
    }

    #[test]
    fn attach_label_from_another_project_is_not_found() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let website = db.create_project(&user.id, "Website", None).unwrap();
        let app = db.create_project(&user.id, "App", None).unwrap();
        let task = db
            .create_task(&user.id, &website.stages[0].id, "Design", None, None)
            .unwrap();
        let foreign_label = db
            .create_label(&user.id, &app.project.id, "mobile", "#ABCDEF")
            .unwrap();

        let err = db
            .add_task_label(&user.id, &task.task.id, &foreign_label.id)
            .unwrap_err();

        assert_eq!(api_error(err).kind, ErrorKind::NotFound);
    }

    #[test]
    fn detach_missing_link_is_not_found() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let task = db
            .create_task(&user.id, &project.stages[0].id, "Design", None, None)
            .unwrap();
        let label = db
            .create_label(&user.id, &project.project.id, "ui", "#0000FF")
            .unwrap();

        let err = db
            .remove_task_label(&user.id, &task.task.id, &label.id)
            .unwrap_err();

        assert_eq!(api_error(err).kind, ErrorKind::NotFound);
    }

    #[test]
    fn delete_label_removes_links_but_not_tasks() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let task = db
            .create_task(&user.id, &project.stages[0].id, "Design", None, None)
            .unwrap();
        let label = db
            .create_label(&user.id, &project.project.id, "ui", "#0000FF")
            .unwrap();
        db.add_task_label(&user.id, &task.task.id, &label.id).unwrap();

        db.delete_label(&user.id, &label.id).unwrap();

        let detail = db.get_task(&user.id, &task.task.id).unwrap().unwrap();
        assert!(detail.labels.is_empty());
    }

    #[test]
    fn update_label_changes_color() {
        let db = setup_db();
        let user = seed_user(&db, "owner@example.com");
        let project = db.create_project(&user.id, "Website", None).unwrap();
        let label = db
            .create_label(&user.id, &project.project.id, "ui", "#0000FF")
            .unwrap();

        let updated = db
            .update_label(&user.id, &label.id, None, Some("#123456".to_string()))
            .unwrap();

        assert_eq!(updated.name, "ui");
        assert_eq!(updated.color, "#123456");
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("kanban.db");

        let user_id = {
            let db = Database::open(&path).expect("Failed to open database");
            let user = seed_user(&db, "owner@example.com");
            db.create_project(&user.id, "Website", None).unwrap();
            user.id
        };

        let db = Database::open(&path).expect("Failed to reopen database");
        let projects = db.list_projects(&user_id).unwrap();

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].project.name, "Website");
        assert_eq!(projects[0].stages.len(), 4);
    }
}
