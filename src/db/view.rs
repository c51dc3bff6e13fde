//! Aggregate project view: project, links, sections, tasks and task links.

use super::Database;
use super::links::{links_for, parse_link_row};
use super::projects::get_project_internal;
use super::sections::sections_for_project;
use super::tasks::tasks_for_section;
use crate::error::ApiError;
use crate::types::{Link, LinkableType, ProjectView, ProjectWithLinks, SectionView, TaskWithLinks};
use anyhow::Result;
use rusqlite::{Connection, params};
use std::collections::HashMap;
use tracing::debug;

/// All task links of a project, grouped by task id, each group in display order.
fn task_links_for_project(conn: &Connection, project_id: i64) -> Result<HashMap<i64, Vec<Link>>> {
    let mut stmt = conn.prepare(
        "SELECT l.* FROM links l
         JOIN tasks t ON t.id = l.linkable_id
         JOIN sections s ON s.id = t.section_id
         WHERE l.linkable_type = 'task' AND s.project_id = ?1
         ORDER BY l.linkable_id ASC, l.display_order ASC",
    )?;
    let mut grouped: HashMap<i64, Vec<Link>> = HashMap::new();
    for link in stmt.query_map(params![project_id], parse_link_row)? {
        let link = link?;
        grouped.entry(link.linkable_id).or_default().push(link);
    }
    Ok(grouped)
}

impl Database {
    /// Assemble the full board snapshot of a project.
    ///
    /// Sections come in display order; tasks in display order, then task
    /// number. Read-only, so no transaction is taken.
    pub fn project_view(&self, project_id: i64) -> Result<ProjectView> {
        self.with_conn(|conn| {
            let project = get_project_internal(conn, project_id)?
                .ok_or_else(|| ApiError::project_not_found(project_id))?;
            let project_links = links_for(conn, LinkableType::Project, project_id)?;
            let mut task_links = task_links_for_project(conn, project_id)?;

            let mut sections = Vec::new();
            for section in sections_for_project(conn, project_id)? {
                let tasks: Vec<TaskWithLinks> = tasks_for_section(conn, section.id)?
                    .into_iter()
                    .map(|task| {
                        let links = task_links.remove(&task.id).unwrap_or_default();
                        TaskWithLinks { task, links }
                    })
                    .collect();
                sections.push(SectionView {
                    section,
                    task_count: tasks.len() as i64,
                    tasks,
                });
            }

            debug!(project_id, sections = sections.len(), "Built project view");
            Ok(ProjectView {
                project: ProjectWithLinks {
                    project,
                    links: project_links,
                },
                sections,
            })
        })
    }
}
