//! Task CRUD operations.

use super::links::{delete_owner_links, insert_links, links_for, validate_link_inputs};
use super::ordering::{OrderScope, close_gap, next_order};
use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{LinkableType, NewTask, Task, TaskPriority, TaskStatus, TaskUpdate, TaskWithLinks};
use crate::validate::{
    DATE_FORMAT, check_progress, non_blank, parse_date, parse_enum, required_id, required_str,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

/// Read a nullable `YYYY-MM-DD` column.
fn date_column(row: &Row, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| {
            let idx = row.as_ref().column_index(column).unwrap_or_default();
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn date_to_sql(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        section_id: row.get("section_id")?,
        task_number: row.get("task_number")?,
        title: row.get("title")?,
        description: row.get("description")?,
        notes: row.get("notes")?,
        assignee: row.get("assignee")?,
        priority: row.get("priority")?,
        status: row.get("status")?,
        start_date: date_column(row, "start_date")?,
        end_date: date_column(row, "end_date")?,
        actual_start_date: date_column(row, "actual_start_date")?,
        progress: row.get("progress")?,
        display_order: row.get("display_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE id = ?1",
            params![task_id],
            parse_task_row,
        )
        .optional()?;
    Ok(task)
}

/// Tasks of a section in board order.
pub(crate) fn tasks_for_section(conn: &Connection, section_id: i64) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM tasks WHERE section_id = ?1
         ORDER BY display_order ASC, task_number ASC",
    )?;
    let tasks = stmt
        .query_map(params![section_id], parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

fn section_exists(conn: &Connection, section_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sections WHERE id = ?1)",
        params![section_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

impl Database {
    /// Create a task at the end of its section.
    ///
    /// Allocates the next task number of the owning project. Inline links
    /// are created in the same transaction.
    pub fn create_task(&self, input: &NewTask) -> Result<Task> {
        let title = required_str(input.title.as_deref(), "title")?;
        let section_id = required_id(input.section_id, "section_id")?;
        let priority = match input.priority.as_deref() {
            Some(p) => parse_enum(p, "priority", TaskPriority::NAMES, TaskPriority::parse)?,
            None => TaskPriority::default(),
        };
        let status = match input.status.as_deref() {
            Some(s) => parse_enum(s, "status", TaskStatus::NAMES, TaskStatus::parse)?,
            None => TaskStatus::default(),
        };
        let start_date = optional_date(input.start_date.as_deref(), "start_date")?;
        let end_date = optional_date(input.end_date.as_deref(), "end_date")?;
        let actual_start_date =
            optional_date(input.actual_start_date.as_deref(), "actual_start_date")?;
        let progress = check_progress(input.progress.unwrap_or(0))?;
        let links = validate_link_inputs(input.links.as_deref().unwrap_or_default())?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let project_id: i64 = tx
                .query_row(
                    "SELECT project_id FROM sections WHERE id = ?1",
                    params![section_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| ApiError::section_not_found(section_id))?;

            // The counter only ever grows, so numbers of deleted tasks stay retired.
            let task_number: i64 = tx.query_row(
                "UPDATE projects SET last_task_number = last_task_number + 1, updated_at = ?1
                 WHERE id = ?2 RETURNING last_task_number",
                params![now, project_id],
                |row| row.get(0),
            )?;
            let display_order = next_order(&tx, OrderScope::SectionTasks(section_id))?;

            tx.execute(
                "INSERT INTO tasks (
                    section_id, task_number, title, description, notes, assignee,
                    priority, status, start_date, end_date, actual_start_date,
                    progress, display_order, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    section_id,
                    task_number,
                    &title,
                    input.description.as_deref().unwrap_or(""),
                    input.notes.as_deref().unwrap_or(""),
                    input.assignee.as_deref().unwrap_or(""),
                    priority,
                    status,
                    date_to_sql(start_date),
                    date_to_sql(end_date),
                    date_to_sql(actual_start_date),
                    progress,
                    display_order,
                    now,
                    now,
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            insert_links(&tx, LinkableType::Task, task_id, &links)?;

            let task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;
            tx.commit()?;

            info!(
                task_id,
                section_id,
                task_number,
                display_order,
                "Task created"
            );
            Ok(task)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Get a task together with its links.
    pub fn get_task_with_links(&self, task_id: i64) -> Result<TaskWithLinks> {
        self.with_conn(|conn| {
            let task =
                get_task_internal(conn, task_id)?.ok_or_else(|| ApiError::task_not_found(task_id))?;
            let links = links_for(conn, LinkableType::Task, task_id)?;
            Ok(TaskWithLinks { task, links })
        })
    }

    /// List the tasks of a section in board order.
    pub fn list_tasks(&self, section_id: i64) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            if !section_exists(conn, section_id)? {
                return Err(ApiError::section_not_found(section_id).into());
            }
            let tasks = tasks_for_section(conn, section_id)?;
            debug!(section_id, count = tasks.len(), "Listed tasks");
            Ok(tasks)
        })
    }

    /// Update only the supplied task fields.
    ///
    /// Date fields accept an empty string to clear the date. A `links`
    /// array replaces the task's links wholesale.
    pub fn update_task(&self, task_id: i64, input: &TaskUpdate) -> Result<Task> {
        // Build dynamic update query
        let mut updates: Vec<&'static str> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(title) = non_blank(input.title.as_deref(), "title")? {
            updates.push("title = ?");
            params_vec.push(Box::new(title));
        }
        if let Some(ref description) = input.description {
            updates.push("description = ?");
            params_vec.push(Box::new(description.clone()));
        }
        if let Some(ref notes) = input.notes {
            updates.push("notes = ?");
            params_vec.push(Box::new(notes.clone()));
        }
        if let Some(ref assignee) = input.assignee {
            updates.push("assignee = ?");
            params_vec.push(Box::new(assignee.clone()));
        }
        if let Some(ref priority) = input.priority {
            updates.push("priority = ?");
            params_vec.push(Box::new(parse_enum(
                priority,
                "priority",
                TaskPriority::NAMES,
                TaskPriority::parse,
            )?));
        }
        if let Some(ref status) = input.status {
            updates.push("status = ?");
            params_vec.push(Box::new(parse_enum(
                status,
                "status",
                TaskStatus::NAMES,
                TaskStatus::parse,
            )?));
        }
        if let Some(ref date) = input.start_date {
            updates.push("start_date = ?");
            params_vec.push(Box::new(date_to_sql(parse_date(date, "start_date")?)));
        }
        if let Some(ref date) = input.end_date {
            updates.push("end_date = ?");
            params_vec.push(Box::new(date_to_sql(parse_date(date, "end_date")?)));
        }
        if let Some(ref date) = input.actual_start_date {
            updates.push("actual_start_date = ?");
            params_vec.push(Box::new(date_to_sql(parse_date(
                date,
                "actual_start_date",
            )?)));
        }
        if let Some(progress) = input.progress {
            updates.push("progress = ?");
            params_vec.push(Box::new(check_progress(progress)?));
        }
        let links = input
            .links
            .as_deref()
            .map(validate_link_inputs)
            .transpose()?;

        if updates.is_empty() && links.is_none() {
            return Err(ApiError::empty_update().into());
        }

        updates.push("updated_at = ?");
        params_vec.push(Box::new(now_ms()));
        params_vec.push(Box::new(task_id));
        let sql = format!("UPDATE tasks SET {} WHERE id = ?", updates.join(", "));

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();
            let rows_affected = tx.execute(&sql, params_refs.as_slice())?;
            if rows_affected == 0 {
                return Err(ApiError::task_not_found(task_id).into());
            }

            if let Some(ref links) = links {
                delete_owner_links(&tx, LinkableType::Task, task_id)?;
                insert_links(&tx, LinkableType::Task, task_id, links)?;
            }

            let task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;
            tx.commit()?;

            info!(task_id, fields = updates.len() - 1, "Task updated");
            Ok(task)
        })
    }

    /// Delete a task and its links, closing the gap in its section.
    pub fn delete_task(&self, task_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let (section_id, position): (i64, i64) = tx
                .query_row(
                    "SELECT section_id, display_order FROM tasks WHERE id = ?1",
                    params![task_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;

            let links_removed = delete_owner_links(&tx, LinkableType::Task, task_id)?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            close_gap(&tx, OrderScope::SectionTasks(section_id), position)?;

            tx.commit()?;

            info!(task_id, section_id, links_removed, "Task deleted");
            Ok(())
        })
    }
}

fn optional_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value {
        Some(v) => parse_date(v, field),
        None => Ok(None),
    }
}
