//! Position bookkeeping for ordered sibling groups.
//!
//! Stages within a project, tasks within a stage, and subtasks within a
//! task each carry a `position` column that must stay a gap-free sequence
//! `0..n-1`. Every helper here mutates one sibling group; callers wrap the
//! calls in a transaction together with the row change they accompany.

use anyhow::Result;
use rusqlite::{Connection, params};

/// One ordered sibling group: a table plus the column naming its parent.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SiblingGroup {
    pub table: &'static str,
    pub parent_col: &'static str,
}

pub(crate) const STAGES: SiblingGroup = SiblingGroup {
    table: "stages",
    parent_col: "project_id",
};

pub(crate) const TASKS: SiblingGroup = SiblingGroup {
    table: "tasks",
    parent_col: "stage_id",
};

pub(crate) const SUBTASKS: SiblingGroup = SiblingGroup {
    table: "subtasks",
    parent_col: "task_id",
};

/// Number of rows currently in the group.
pub(crate) fn count(conn: &Connection, group: SiblingGroup, parent_id: &str) -> Result<i64> {
    let n: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            group.table, group.parent_col
        ),
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(n)
}

/// Close the gap left at `removed`: every sibling past it moves down one.
/// The row at `removed` itself is untouched, so this may run before the
/// row is deleted or re-parented.
pub(crate) fn close_gap(
    conn: &Connection,
    group: SiblingGroup,
    parent_id: &str,
    removed: i64,
) -> Result<()> {
    conn.execute(
        &format!(
            "UPDATE {} SET position = position - 1 WHERE {} = ?1 AND position > ?2",
            group.table, group.parent_col
        ),
        params![parent_id, removed],
    )?;
    Ok(())
}

/// Open a slot at `at`: every sibling at or past it moves up one. Used
/// before inserting a row from outside the group.
pub(crate) fn open_slot(
    conn: &Connection,
    group: SiblingGroup,
    parent_id: &str,
    at: i64,
) -> Result<()> {
    conn.execute(
        &format!(
            "UPDATE {} SET position = position + 1 WHERE {} = ?1 AND position >= ?2",
            group.table, group.parent_col
        ),
        params![parent_id, at],
    )?;
    Ok(())
}

/// Shift siblings for a move within the same group, from position `from`
/// to position `to`, leaving the moved row (`item_id`) for the caller to
/// update. Moving down shifts the range `(from, to]` back by one; moving
/// up shifts `[to, from)` forward by one.
pub(crate) fn shift_for_move(
    conn: &Connection,
    group: SiblingGroup,
    parent_id: &str,
    item_id: &str,
    from: i64,
    to: i64,
) -> Result<()> {
    if to > from {
        conn.execute(
            &format!(
                "UPDATE {} SET position = position - 1
                 WHERE {} = ?1 AND position > ?2 AND position <= ?3 AND id != ?4",
                group.table, group.parent_col
            ),
            params![parent_id, from, to, item_id],
        )?;
    } else if to < from {
        conn.execute(
            &format!(
                "UPDATE {} SET position = position + 1
                 WHERE {} = ?1 AND position >= ?2 AND position < ?3 AND id != ?4",
                group.table, group.parent_col
            ),
            params![parent_id, to, from, item_id],
        )?;
    }
    Ok(())
}

/// Resolve the position for a new row and shift siblings if needed.
///
/// With no requested position the row is appended at `count`, touching
/// nothing else. A requested position is clamped to `[0, count]`; a value
/// below `count` opens a slot there, `count` itself degenerates to append.
pub(crate) fn insert_position(
    conn: &Connection,
    group: SiblingGroup,
    parent_id: &str,
    requested: Option<i64>,
) -> Result<i64> {
    let n = count(conn, group, parent_id)?;
    let position = match requested {
        None => n,
        Some(p) => p.clamp(0, n),
    };
    if position < n {
        open_slot(conn, group, parent_id, position)?;
    }
    Ok(position)
}

/// Clamp a requested target for a move within a group of `count` rows
/// (the moved row included). No request means "move to the end".
pub(crate) fn move_target(count: i64, requested: Option<i64>) -> i64 {
    let last = (count - 1).max(0);
    match requested {
        None => last,
        Some(p) => p.clamp(0, last),
    }
}
