//! Project CRUD operations and the project list with statistics.

use super::links::delete_owner_links;
use super::ordering::{OrderScope, count};
use super::sections::project_exists;
use super::{Database, escape_like, now_ms};
use crate::error::ApiError;
use crate::types::{
    LinkableType, NewProject, Project, ProjectListQuery, ProjectStatus, ProjectSummary,
    ProjectUpdate,
};
use crate::validate::{non_blank, parse_enum, required_str};
use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

pub fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn get_project_internal(conn: &Connection, project_id: i64) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT * FROM projects WHERE id = ?1",
            params![project_id],
            parse_project_row,
        )
        .optional()?;
    Ok(project)
}

/// Completed share of tasks as a rounded percentage; 0 without tasks.
pub fn completion_percent(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i64
}

fn parse_status(value: &str) -> Result<ProjectStatus, ApiError> {
    parse_enum(value, "status", ProjectStatus::NAMES, ProjectStatus::parse)
}

impl Database {
    /// List projects, most recently updated first.
    ///
    /// `search` matches a literal substring of the name or description;
    /// empty filters are ignored.
    pub fn list_projects(&self, query: &ProjectListQuery) -> Result<Vec<ProjectSummary>> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));
        let status = query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_status)
            .transpose()?;

        let mut sql = String::from(
            "SELECT p.*,
                (SELECT COUNT(*) FROM sections s WHERE s.project_id = p.id) AS section_count,
                (SELECT COUNT(*) FROM tasks t JOIN sections s ON s.id = t.section_id
                  WHERE s.project_id = p.id) AS task_count,
                (SELECT COUNT(*) FROM tasks t JOIN sections s ON s.id = t.section_id
                  WHERE s.project_id = p.id AND t.status = 'completed') AS completed_task_count
             FROM projects p
             WHERE 1=1",
        );
        let mut bound: Vec<(&str, &dyn ToSql)> = Vec::new();
        if let Some(ref pattern) = search {
            sql.push_str(
                " AND (p.name LIKE :search ESCAPE '\\' OR p.description LIKE :search ESCAPE '\\')",
            );
            bound.push((":search", pattern as &dyn ToSql));
        }
        if let Some(ref status) = status {
            sql.push_str(" AND p.status = :status");
            bound.push((":status", status as &dyn ToSql));
        }
        sql.push_str(" ORDER BY p.updated_at DESC, p.id DESC");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let projects = stmt
                .query_map(bound.as_slice(), |row| {
                    let task_count: i64 = row.get("task_count")?;
                    let completed_task_count: i64 = row.get("completed_task_count")?;
                    Ok(ProjectSummary {
                        project: parse_project_row(row)?,
                        section_count: row.get("section_count")?,
                        task_count,
                        completed_task_count,
                        progress: completion_percent(completed_task_count, task_count),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            debug!(count = projects.len(), "Listed projects");
            Ok(projects)
        })
    }

    /// Create a project.
    pub fn create_project(&self, input: &NewProject) -> Result<Project> {
        let name = required_str(input.name.as_deref(), "name")?;
        let status = match input.status.as_deref() {
            Some(s) => parse_status(s)?,
            None => ProjectStatus::default(),
        };
        let description = input.description.clone().unwrap_or_default();
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (name, description, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![&name, &description, status, now, now],
            )?;
            let id = conn.last_insert_rowid();

            info!(project_id = id, status = status.as_str(), "Project created");
            Ok(Project {
                id,
                name,
                description,
                status,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a project by ID.
    pub fn get_project(&self, project_id: i64) -> Result<Option<Project>> {
        self.with_conn(|conn| get_project_internal(conn, project_id))
    }

    /// Update only the supplied project fields.
    pub fn update_project(&self, project_id: i64, input: &ProjectUpdate) -> Result<Project> {
        // Build dynamic update query
        let mut updates: Vec<&'static str> = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(name) = non_blank(input.name.as_deref(), "name")? {
            updates.push("name = ?");
            params_vec.push(Box::new(name));
        }
        if let Some(ref description) = input.description {
            updates.push("description = ?");
            params_vec.push(Box::new(description.clone()));
        }
        if let Some(ref status) = input.status {
            updates.push("status = ?");
            params_vec.push(Box::new(parse_status(status)?));
        }

        if updates.is_empty() {
            return Err(ApiError::empty_update().into());
        }

        updates.push("updated_at = ?");
        params_vec.push(Box::new(now_ms()));
        params_vec.push(Box::new(project_id));
        let sql = format!("UPDATE projects SET {} WHERE id = ?", updates.join(", "));

        self.with_conn(|conn| {
            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
            let rows_affected = conn.execute(&sql, params_refs.as_slice())?;
            if rows_affected == 0 {
                return Err(ApiError::project_not_found(project_id).into());
            }

            info!(project_id, "Project updated");
            get_project_internal(conn, project_id)?
                .ok_or_else(|| ApiError::project_not_found(project_id).into())
        })
    }

    /// Delete a project that has no sections, along with its links.
    pub fn delete_project(&self, project_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !project_exists(&tx, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }
            let section_count = count(&tx, OrderScope::ProjectSections(project_id))?;
            if section_count > 0 {
                return Err(
                    ApiError::has_children("a project", "sections", section_count).into(),
                );
            }

            let links_removed = delete_owner_links(&tx, LinkableType::Project, project_id)?;
            tx.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
            tx.commit()?;

            info!(project_id, links_removed, "Project deleted");
            Ok(())
        })
    }
}
