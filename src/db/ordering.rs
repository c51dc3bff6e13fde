//! Dense `display_order` maintenance and the task move engine.
//!
//! Every ordered scope (tasks in a section, sections in a project, links of
//! an owner) keeps its `display_order` values equal to `1..=N`. Inserts
//! append at `N + 1`, deletes close the gap they leave, and moves shift the
//! rows between the old and new position by one.

use super::tasks::get_task_internal;
use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{LinkableType, Task, TaskMove};
use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

/// A parent scope whose children carry a dense `display_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Sections of a project.
    ProjectSections(i64),
    /// Tasks of a section.
    SectionTasks(i64),
    /// Links of a project or task.
    OwnerLinks(LinkableType, i64),
}

impl OrderScope {
    fn table(&self) -> &'static str {
        match self {
            OrderScope::ProjectSections(_) => "sections",
            OrderScope::SectionTasks(_) => "tasks",
            OrderScope::OwnerLinks(..) => "links",
        }
    }

    fn filter(&self) -> &'static str {
        match self {
            OrderScope::ProjectSections(_) => "project_id = :owner_id",
            OrderScope::SectionTasks(_) => "section_id = :owner_id",
            OrderScope::OwnerLinks(..) => "linkable_type = :owner_type AND linkable_id = :owner_id",
        }
    }

    /// Named parameters for `filter()` followed by `extra`.
    fn bind<'a>(
        &'a self,
        extra: &[(&'a str, &'a dyn ToSql)],
    ) -> Vec<(&'a str, &'a dyn ToSql)> {
        let mut bound: Vec<(&str, &dyn ToSql)> = match self {
            OrderScope::ProjectSections(id) | OrderScope::SectionTasks(id) => {
                vec![(":owner_id", id as &dyn ToSql)]
            }
            OrderScope::OwnerLinks(kind, id) => {
                vec![(":owner_type", kind as &dyn ToSql), (":owner_id", id as &dyn ToSql)]
            }
        };
        bound.extend_from_slice(extra);
        bound
    }
}

/// Order value for a row appended at the end of the scope.
pub fn next_order(conn: &Connection, scope: OrderScope) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX(display_order), 0) + 1 FROM {} WHERE {}",
        scope.table(),
        scope.filter()
    );
    let next = conn.query_row(&sql, scope.bind(&[]).as_slice(), |row| row.get(0))?;
    Ok(next)
}

/// Number of rows in the scope.
pub fn count(conn: &Connection, scope: OrderScope) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        scope.table(),
        scope.filter()
    );
    let n = conn.query_row(&sql, scope.bind(&[]).as_slice(), |row| row.get(0))?;
    Ok(n)
}

/// Close the gap left by a row removed from `removed_position`.
pub fn close_gap(conn: &Connection, scope: OrderScope, removed_position: i64) -> Result<usize> {
    let sql = format!(
        "UPDATE {} SET display_order = display_order - 1
         WHERE {} AND display_order > :position",
        scope.table(),
        scope.filter()
    );
    let bound = scope.bind(&[(":position", &removed_position as &dyn ToSql)]);
    let changed = conn.execute(&sql, bound.as_slice())?;
    Ok(changed)
}

/// Open a slot at `position` by pushing it and everything after it back by one.
fn open_slot(conn: &Connection, scope: OrderScope, position: i64) -> Result<usize> {
    let sql = format!(
        "UPDATE {} SET display_order = display_order + 1
         WHERE {} AND display_order >= :position",
        scope.table(),
        scope.filter()
    );
    let bound = scope.bind(&[(":position", &position as &dyn ToSql)]);
    let changed = conn.execute(&sql, bound.as_slice())?;
    Ok(changed)
}

/// Shift rows for a same-scope move from `from` to `to`.
///
/// Moving earlier pushes `[to, from)` back by one; moving later pulls
/// `(from, to]` forward by one. The moved row itself is left alone.
fn shift_between(conn: &Connection, scope: OrderScope, from: i64, to: i64) -> Result<usize> {
    let sql = if to < from {
        format!(
            "UPDATE {} SET display_order = display_order + 1
             WHERE {} AND display_order >= :to AND display_order < :from",
            scope.table(),
            scope.filter()
        )
    } else {
        format!(
            "UPDATE {} SET display_order = display_order - 1
             WHERE {} AND display_order > :from AND display_order <= :to",
            scope.table(),
            scope.filter()
        )
    };
    let bound = scope.bind(&[(":from", &from as &dyn ToSql), (":to", &to as &dyn ToSql)]);
    let changed = conn.execute(&sql, bound.as_slice())?;
    Ok(changed)
}

/// Clamp a requested 1-based position into `[1, max]`.
pub fn clamp_position(requested: i64, max: i64) -> i64 {
    requested.clamp(1, max.max(1))
}

fn section_project(conn: &Connection, section_id: i64) -> Result<Option<i64>> {
    let project_id = conn
        .query_row(
            "SELECT project_id FROM sections WHERE id = ?1",
            params![section_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(project_id)
}

impl Database {
    /// Move a task to another position and/or section.
    ///
    /// Runs in a single transaction: on any error the orderings of both
    /// sections are left exactly as they were. Out-of-range positions are
    /// clamped to the valid range of the target section.
    pub fn move_task(&self, task_id: i64, request: &TaskMove) -> Result<Task> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let (old_section, old_position): (i64, i64) = tx
                .query_row(
                    "SELECT section_id, display_order FROM tasks WHERE id = ?1",
                    params![task_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;

            let target_section = request
                .new_section_id
                .filter(|&id| id != old_section);

            match target_section {
                Some(new_section) => {
                    let new_project = section_project(&tx, new_section)?
                        .ok_or_else(|| ApiError::section_not_found(new_section))?;
                    let old_project = section_project(&tx, old_section)?
                        .ok_or_else(|| ApiError::section_not_found(old_section))?;
                    if new_project != old_project {
                        return Err(ApiError::invalid_value(
                            "new_section_id",
                            format!(
                                "Section {} belongs to a different project than task {}",
                                new_section, task_id
                            ),
                        )
                        .into());
                    }

                    close_gap(&tx, OrderScope::SectionTasks(old_section), old_position)?;

                    let dest = OrderScope::SectionTasks(new_section);
                    let new_position = match request.new_position {
                        None => next_order(&tx, dest)?,
                        Some(requested) => {
                            let position = clamp_position(requested, count(&tx, dest)? + 1);
                            open_slot(&tx, dest, position)?;
                            position
                        }
                    };

                    tx.execute(
                        "UPDATE tasks SET section_id = ?1, display_order = ?2, updated_at = ?3
                         WHERE id = ?4",
                        params![new_section, new_position, now_ms(), task_id],
                    )?;

                    info!(
                        task_id,
                        from_section = old_section,
                        to_section = new_section,
                        from = old_position,
                        to = new_position,
                        "Task moved across sections"
                    );
                }
                None => {
                    let scope = OrderScope::SectionTasks(old_section);
                    let Some(requested) = request.new_position else {
                        debug!(task_id, "Move without target; nothing to do");
                        return finish(tx, task_id);
                    };
                    let new_position = clamp_position(requested, count(&tx, scope)?);
                    if new_position == old_position {
                        debug!(task_id, position = old_position, "Task already in place");
                        return finish(tx, task_id);
                    }

                    shift_between(&tx, scope, old_position, new_position)?;
                    tx.execute(
                        "UPDATE tasks SET display_order = ?1, updated_at = ?2 WHERE id = ?3",
                        params![new_position, now_ms(), task_id],
                    )?;

                    info!(
                        task_id,
                        section_id = old_section,
                        from = old_position,
                        to = new_position,
                        "Task reordered"
                    );
                }
            }

            finish(tx, task_id)
        })
    }
}

/// Read back the moved task and commit.
fn finish(tx: rusqlite::Transaction<'_>, task_id: i64) -> Result<Task> {
    let task = get_task_internal(&tx, task_id)?.ok_or_else(|| ApiError::task_not_found(task_id))?;
    tx.commit()?;
    Ok(task)
}
