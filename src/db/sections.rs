//! Section CRUD operations.

use super::ordering::{OrderScope, close_gap, count, next_order};
use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{NewSection, Section, SectionUpdate};
use crate::validate::{non_blank, required_id, required_str};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

/// Icon used when a section is created without one.
pub const DEFAULT_SECTION_ICON: &str = "📋";

pub fn parse_section_row(row: &Row) -> rusqlite::Result<Section> {
    Ok(Section {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        icon: row.get("icon")?,
        display_order: row.get("display_order")?,
    })
}

/// Resolve a supplied icon: blank means the default icon, absent means none given.
fn section_icon(icon: Option<&str>) -> Option<String> {
    icon.map(|icon| {
        if icon.trim().is_empty() {
            DEFAULT_SECTION_ICON.to_string()
        } else {
            icon.to_string()
        }
    })
}

pub(crate) fn get_section_internal(conn: &Connection, section_id: i64) -> Result<Option<Section>> {
    let section = conn
        .query_row(
            "SELECT * FROM sections WHERE id = ?1",
            params![section_id],
            parse_section_row,
        )
        .optional()?;
    Ok(section)
}

pub(crate) fn sections_for_project(conn: &Connection, project_id: i64) -> Result<Vec<Section>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM sections WHERE project_id = ?1 ORDER BY display_order ASC",
    )?;
    let sections = stmt
        .query_map(params![project_id], parse_section_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sections)
}

pub(crate) fn project_exists(conn: &Connection, project_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
        params![project_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

impl Database {
    /// List the sections of a project in display order.
    pub fn list_sections(&self, project_id: i64) -> Result<Vec<Section>> {
        self.with_conn(|conn| {
            if !project_exists(conn, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }
            let sections = sections_for_project(conn, project_id)?;
            debug!(project_id, count = sections.len(), "Listed sections");
            Ok(sections)
        })
    }

    /// Create a section at the end of its project.
    pub fn create_section(&self, input: &NewSection) -> Result<Section> {
        let name = required_str(input.name.as_deref(), "name")?;
        let project_id = required_id(input.project_id, "project_id")?;
        let icon = section_icon(input.icon.as_deref())
            .unwrap_or_else(|| DEFAULT_SECTION_ICON.to_string());

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !project_exists(&tx, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }
            let display_order = next_order(&tx, OrderScope::ProjectSections(project_id))?;
            tx.execute(
                "INSERT INTO sections (project_id, name, icon, display_order)
                 VALUES (?1, ?2, ?3, ?4)",
                params![project_id, &name, &icon, display_order],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE projects SET updated_at = ?1 WHERE id = ?2",
                params![now_ms(), project_id],
            )?;
            tx.commit()?;

            info!(section_id = id, project_id, display_order, "Section created");
            Ok(Section {
                id,
                project_id,
                name,
                icon,
                display_order,
            })
        })
    }

    /// Get a section by ID.
    pub fn get_section(&self, section_id: i64) -> Result<Option<Section>> {
        self.with_conn(|conn| get_section_internal(conn, section_id))
    }

    /// Update a section's name and/or icon. A blank icon resets it to the default.
    pub fn update_section(&self, section_id: i64, input: &SectionUpdate) -> Result<Section> {
        let name = non_blank(input.name.as_deref(), "name")?;
        let icon = section_icon(input.icon.as_deref());
        if name.is_none() && icon.is_none() {
            return Err(ApiError::empty_update().into());
        }

        self.with_conn(|conn| {
            let rows_affected = conn.execute(
                "UPDATE sections SET name = COALESCE(?1, name), icon = COALESCE(?2, icon)
                 WHERE id = ?3",
                params![name, icon, section_id],
            )?;
            if rows_affected == 0 {
                return Err(ApiError::section_not_found(section_id).into());
            }

            info!(section_id, "Section updated");
            get_section_internal(conn, section_id)?
                .ok_or_else(|| ApiError::section_not_found(section_id).into())
        })
    }

    /// Delete an empty section, closing the gap in its project.
    pub fn delete_section(&self, section_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let section = get_section_internal(&tx, section_id)?
                .ok_or_else(|| ApiError::section_not_found(section_id))?;

            let task_count = count(&tx, OrderScope::SectionTasks(section_id))?;
            if task_count > 0 {
                return Err(ApiError::has_children("a section", "tasks", task_count).into());
            }

            tx.execute("DELETE FROM sections WHERE id = ?1", params![section_id])?;
            close_gap(
                &tx,
                OrderScope::ProjectSections(section.project_id),
                section.display_order,
            )?;
            tx.commit()?;

            info!(section_id, project_id = section.project_id, "Section deleted");
            Ok(())
        })
    }
}
