//! Core types for the taskflow service.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    OnHold,
    Archived,
}

impl ProjectStatus {
    pub const NAMES: &'static [&'static str] = &["active", "completed", "on_hold", "archived"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProjectStatus::Active),
            "completed" => Some(ProjectStatus::Completed),
            "on_hold" => Some(ProjectStatus::OnHold),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }
}

/// Task priority. `Separate` marks separator rows in the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
    Separate,
}

impl TaskPriority {
    pub const NAMES: &'static [&'static str] = &["high", "medium", "low", "separate"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
            TaskPriority::Separate => "separate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(TaskPriority::High),
            "medium" => Some(TaskPriority::Medium),
            "low" => Some(TaskPriority::Low),
            "separate" => Some(TaskPriority::Separate),
            _ => None,
        }
    }
}

/// Task progress status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    OnHold,
}

impl TaskStatus {
    pub const NAMES: &'static [&'static str] = &["pending", "in_progress", "completed", "on_hold"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::OnHold => "on_hold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "on_hold" => Some(TaskStatus::OnHold),
            _ => None,
        }
    }
}

/// Kind of entity a link is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkableType {
    Project,
    Task,
}

impl LinkableType {
    pub const NAMES: &'static [&'static str] = &["project", "task"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkableType::Project => "project",
            LinkableType::Task => "task",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "project" => Some(LinkableType::Project),
            "task" => Some(LinkableType::Task),
            _ => None,
        }
    }
}

// Enums are stored as their snake_case names.
macro_rules! sql_text_enum {
    ($($ty:ty),*) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let s = value.as_str()?;
                    <$ty>::parse(s).ok_or_else(|| {
                        FromSqlError::Other(format!("unknown {} value: {}", stringify!($ty), s).into())
                    })
                }
            }
        )*
    };
}

sql_text_enum!(ProjectStatus, TaskPriority, TaskStatus, LinkableType);

/// A project: the top-level container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Project list entry with completion statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub section_count: i64,
    pub task_count: i64,
    pub completed_task_count: i64,
    /// Percentage of completed tasks, rounded.
    pub progress: i64,
}

/// An ordered column of tasks inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub icon: String,
    pub display_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub section_id: i64,
    /// Per-project sequence number, never reused.
    pub task_number: i64,
    pub title: String,
    pub description: String,
    pub notes: String,
    pub assignee: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub progress: i64,
    pub display_order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A named URL attached to a project or a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub linkable_type: LinkableType,
    pub linkable_id: i64,
    pub name: String,
    pub url: String,
    pub display_order: i64,
}

// =============================================================================
// Aggregate view
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithLinks {
    #[serde(flatten)]
    pub task: Task,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionView {
    #[serde(flatten)]
    pub section: Section,
    pub task_count: i64,
    pub tasks: Vec<TaskWithLinks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithLinks {
    #[serde(flatten)]
    pub project: Project,
    pub links: Vec<Link>,
}

/// Full snapshot of a project for rendering the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    pub project: ProjectWithLinks,
    pub sections: Vec<SectionView>,
}

// =============================================================================
// Inputs
// =============================================================================
//
// Required fields are optional here so that a missing field surfaces as a
// validation error naming the field rather than a generic decode failure.
// Enum and date fields are plain strings for the same reason.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSection {
    pub project_id: Option<i64>,
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionUpdate {
    pub name: Option<String>,
    pub icon: Option<String>,
}

/// Link entry inside a task create/update payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkInput {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Task creation payload. Dates use `YYYY-MM-DD`; an empty string means none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub section_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub actual_start_date: Option<String>,
    pub progress: Option<i64>,
    pub links: Option<Vec<LinkInput>>,
}

/// Partial task update. `links`, when present, replaces the task's links.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub actual_start_date: Option<String>,
    pub progress: Option<i64>,
    pub links: Option<Vec<LinkInput>>,
}

/// Drag-and-drop move request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMove {
    pub new_section_id: Option<i64>,
    pub new_position: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLink {
    pub linkable_type: Option<String>,
    pub linkable_id: Option<i64>,
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
}
