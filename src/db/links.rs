//! Link CRUD operations.
//!
//! Links hang off either a project or a task (`linkable_type` +
//! `linkable_id`) and keep a dense `display_order` per owner.

use super::Database;
use super::ordering::{OrderScope, close_gap, next_order};
use crate::error::ApiError;
use crate::types::{Link, LinkInput, LinkUpdate, LinkableType, NewLink};
use crate::validate::{non_blank, parse_enum, required_id, required_str};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

pub fn parse_link_row(row: &Row) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get("id")?,
        linkable_type: row.get("linkable_type")?,
        linkable_id: row.get("linkable_id")?,
        name: row.get("name")?,
        url: row.get("url")?,
        display_order: row.get("display_order")?,
    })
}

/// Links of an owner in display order.
pub(crate) fn links_for(conn: &Connection, kind: LinkableType, owner_id: i64) -> Result<Vec<Link>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM links WHERE linkable_type = ?1 AND linkable_id = ?2
         ORDER BY display_order ASC",
    )?;
    let links = stmt
        .query_map(params![kind, owner_id], parse_link_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(links)
}

/// Append `(name, url)` pairs to an owner's links, in order.
pub(crate) fn insert_links(
    conn: &Connection,
    kind: LinkableType,
    owner_id: i64,
    links: &[(String, String)],
) -> Result<()> {
    let scope = OrderScope::OwnerLinks(kind, owner_id);
    let mut order = next_order(conn, scope)?;
    let mut stmt = conn.prepare(
        "INSERT INTO links (linkable_type, linkable_id, name, url, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (name, url) in links {
        stmt.execute(params![kind, owner_id, name, url, order])?;
        order += 1;
    }
    Ok(())
}

/// Remove every link of an owner. Returns the number removed.
pub(crate) fn delete_owner_links(conn: &Connection, kind: LinkableType, owner_id: i64) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM links WHERE linkable_type = ?1 AND linkable_id = ?2",
        params![kind, owner_id],
    )?;
    Ok(removed)
}

/// Check inline link entries, returning `(name, url)` pairs.
pub(crate) fn validate_link_inputs(inputs: &[LinkInput]) -> Result<Vec<(String, String)>, ApiError> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, link)| {
            let name = required_str(link.name.as_deref(), &format!("links[{}].name", i))?;
            let url = required_str(link.url.as_deref(), &format!("links[{}].url", i))?;
            Ok((name, url))
        })
        .collect()
}

fn owner_exists(conn: &Connection, kind: LinkableType, owner_id: i64) -> Result<bool> {
    let sql = match kind {
        LinkableType::Project => "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
        LinkableType::Task => "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
    };
    let exists = conn.query_row(sql, params![owner_id], |row| row.get(0))?;
    Ok(exists)
}

fn owner_not_found(kind: LinkableType, owner_id: i64) -> ApiError {
    match kind {
        LinkableType::Project => ApiError::project_not_found(owner_id),
        LinkableType::Task => ApiError::task_not_found(owner_id),
    }
}

fn parse_linkable_type(value: &str) -> Result<LinkableType, ApiError> {
    parse_enum(value, "linkable_type", LinkableType::NAMES, LinkableType::parse)
}

impl Database {
    /// List the links of an owner.
    pub fn list_links(&self, linkable_type: &str, linkable_id: i64) -> Result<Vec<Link>> {
        let kind = parse_linkable_type(linkable_type)?;
        self.with_conn(|conn| {
            if !owner_exists(conn, kind, linkable_id)? {
                return Err(owner_not_found(kind, linkable_id).into());
            }
            let links = links_for(conn, kind, linkable_id)?;
            debug!(linkable_type = kind.as_str(), linkable_id, count = links.len(), "Listed links");
            Ok(links)
        })
    }

    /// Create a link at the end of its owner's links.
    pub fn create_link(&self, input: &NewLink) -> Result<Link> {
        let kind = parse_linkable_type(&required_str(
            input.linkable_type.as_deref(),
            "linkable_type",
        )?)?;
        let owner_id = required_id(input.linkable_id, "linkable_id")?;
        let name = required_str(input.name.as_deref(), "name")?;
        let url = required_str(input.url.as_deref(), "url")?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !owner_exists(&tx, kind, owner_id)? {
                return Err(owner_not_found(kind, owner_id).into());
            }
            let display_order = next_order(&tx, OrderScope::OwnerLinks(kind, owner_id))?;
            tx.execute(
                "INSERT INTO links (linkable_type, linkable_id, name, url, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![kind, owner_id, &name, &url, display_order],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            info!(
                link_id = id,
                linkable_type = kind.as_str(),
                linkable_id = owner_id,
                "Link created"
            );
            Ok(Link {
                id,
                linkable_type: kind,
                linkable_id: owner_id,
                name,
                url,
                display_order,
            })
        })
    }

    /// Get a link by ID.
    pub fn get_link(&self, link_id: i64) -> Result<Option<Link>> {
        self.with_conn(|conn| get_link_internal(conn, link_id))
    }

    /// Update a link's name and/or url.
    pub fn update_link(&self, link_id: i64, input: &LinkUpdate) -> Result<Link> {
        let name = non_blank(input.name.as_deref(), "name")?;
        let url = non_blank(input.url.as_deref(), "url")?;
        if name.is_none() && url.is_none() {
            return Err(ApiError::empty_update().into());
        }

        self.with_conn(|conn| {
            let rows_affected = conn.execute(
                "UPDATE links SET name = COALESCE(?1, name), url = COALESCE(?2, url)
                 WHERE id = ?3",
                params![name, url, link_id],
            )?;
            if rows_affected == 0 {
                return Err(ApiError::link_not_found(link_id).into());
            }

            info!(link_id, "Link updated");
            get_link_internal(conn, link_id)?
                .ok_or_else(|| ApiError::link_not_found(link_id).into())
        })
    }

    /// Delete a link, closing the gap in its owner's ordering.
    pub fn delete_link(&self, link_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let link = get_link_internal(&tx, link_id)?
                .ok_or_else(|| ApiError::link_not_found(link_id))?;
            tx.execute("DELETE FROM links WHERE id = ?1", params![link_id])?;
            close_gap(
                &tx,
                OrderScope::OwnerLinks(link.linkable_type, link.linkable_id),
                link.display_order,
            )?;
            tx.commit()?;

            info!(link_id, "Link deleted");
            Ok(())
        })
    }
}

fn get_link_internal(conn: &Connection, link_id: i64) -> Result<Option<Link>> {
    let link = conn
        .query_row(
            "SELECT * FROM links WHERE id = ?1",
            params![link_id],
            parse_link_row,
        )
        .optional()?;
    Ok(link)
}
