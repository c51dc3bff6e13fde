//! Integration tests for the database layer.
//!
//! These tests verify the core database operations using an in-memory SQLite database.
//! Tests are organized by module and functionality.

use taskflow::db::Database;
use taskflow::error::{ApiError, ErrorCode};
use taskflow::types::{
    LinkInput, LinkUpdate, NewLink, NewProject, NewSection, NewTask, Project, ProjectListQuery,
    ProjectStatus, ProjectUpdate, Section, SectionUpdate, Task, TaskMove, TaskPriority, TaskStatus,
    TaskUpdate,
};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn project(db: &Database, name: &str) -> Project {
    db.create_project(&NewProject {
        name: Some(name.to_string()),
        ..Default::default()
    })
    .expect("Failed to create project")
}

fn section(db: &Database, project_id: i64, name: &str) -> Section {
    db.create_section(&NewSection {
        project_id: Some(project_id),
        name: Some(name.to_string()),
        icon: None,
    })
    .expect("Failed to create section")
}

fn task(db: &Database, section_id: i64, title: &str) -> Task {
    db.create_task(&NewTask {
        section_id: Some(section_id),
        title: Some(title.to_string()),
        ..Default::default()
    })
    .expect("Failed to create task")
}

fn link(name: &str, url: &str) -> LinkInput {
    LinkInput {
        name: Some(name.to_string()),
        url: Some(url.to_string()),
    }
}

/// Extract the structured error code from a db-layer error.
fn code(err: anyhow::Error) -> ErrorCode {
    ApiError::from(err).code
}

/// Titles of a section's tasks in board order.
fn titles(db: &Database, section_id: i64) -> Vec<String> {
    db.list_tasks(section_id)
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect()
}

/// Display orders of a section's tasks in board order.
fn orders(db: &Database, section_id: i64) -> Vec<i64> {
    db.list_tasks(section_id)
        .unwrap()
        .into_iter()
        .map(|t| t.display_order)
        .collect()
}

/// A project with one section holding tasks A, B, C, D.
fn board() -> (Database, Project, Section) {
    let db = setup_db();
    let p = project(&db, "Board");
    let s = section(&db, p.id, "Todo");
    for title in ["A", "B", "C", "D"] {
        task(&db, s.id, title);
    }
    (db, p, s)
}

mod project_tests {
    use super::*;

    #[test]
    fn create_project_applies_defaults() {
        let db = setup_db();
        let p = project(&db, "Website");

        assert_eq!(p.name, "Website");
        assert_eq!(p.description, "");
        assert_eq!(p.status, ProjectStatus::Active);
        assert!(p.created_at > 0);
        assert_eq!(p.created_at, p.updated_at);
    }

    #[test]
    fn create_project_requires_name() {
        let db = setup_db();
        let err = db
            .create_project(&NewProject {
                name: Some("  ".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::MissingRequiredField);
    }

    #[test]
    fn create_project_rejects_unknown_status() {
        let db = setup_db();
        let err = db
            .create_project(&NewProject {
                name: Some("X".to_string()),
                status: Some("paused".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn list_projects_reports_counts_and_progress() {
        let db = setup_db();
        let p = project(&db, "Stats");
        let s = section(&db, p.id, "Todo");
        let t1 = task(&db, s.id, "one");
        task(&db, s.id, "two");
        task(&db, s.id, "three");
        db.update_task(
            t1.id,
            &TaskUpdate {
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let list = db.list_projects(&ProjectListQuery::default()).unwrap();
        assert_eq!(list.len(), 1);
        let summary = &list[0];
        assert_eq!(summary.section_count, 1);
        assert_eq!(summary.task_count, 3);
        assert_eq!(summary.completed_task_count, 1);
        assert_eq!(summary.progress, 33);
    }

    #[test]
    fn list_projects_filters_by_search_and_status() {
        let db = setup_db();
        project(&db, "Alpha launch");
        let beta = project(&db, "Beta");
        project(&db, "100% done");
        db.update_project(
            beta.id,
            &ProjectUpdate {
                status: Some("archived".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let found = db
            .list_projects(&ProjectListQuery {
                search: Some("launch".to_string()),
                status: None,
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project.name, "Alpha launch");

        let archived = db
            .list_projects(&ProjectListQuery {
                search: None,
                status: Some("archived".to_string()),
            })
            .unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].project.id, beta.id);

        // Wildcards in the search are literal
        let literal = db
            .list_projects(&ProjectListQuery {
                search: Some("%".to_string()),
                status: None,
            })
            .unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].project.name, "100% done");
    }

    #[test]
    fn list_projects_most_recently_updated_first() {
        let db = setup_db();
        let first = project(&db, "First");
        let second = project(&db, "Second");

        let list = db.list_projects(&ProjectListQuery::default()).unwrap();
        assert_eq!(list[0].project.id, second.id);

        // Adding a section touches the project
        std::thread::sleep(std::time::Duration::from_millis(5));
        section(&db, first.id, "Todo");
        let list = db.list_projects(&ProjectListQuery::default()).unwrap();
        assert_eq!(list[0].project.id, first.id);
    }

    #[test]
    fn update_project_changes_only_supplied_fields() {
        let db = setup_db();
        let p = project(&db, "Original");

        let updated = db
            .update_project(
                p.id,
                &ProjectUpdate {
                    description: Some("Now described".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Original");
        assert_eq!(updated.description, "Now described");
        assert!(updated.updated_at >= p.updated_at);
    }

    #[test]
    fn update_project_errors() {
        let db = setup_db();
        let p = project(&db, "P");

        let err = db.update_project(p.id, &ProjectUpdate::default()).unwrap_err();
        assert_eq!(code(err), ErrorCode::EmptyUpdate);

        let err = db
            .update_project(
                999,
                &ProjectUpdate {
                    name: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::ProjectNotFound);
    }

    #[test]
    fn delete_project_with_sections_is_a_conflict() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");

        let err = db.delete_project(p.id).unwrap_err();
        assert_eq!(code(err), ErrorCode::HasChildren);

        db.delete_section(s.id).unwrap();
        db.delete_project(p.id).unwrap();
        assert!(db.get_project(p.id).unwrap().is_none());
    }

    #[test]
    fn delete_project_removes_its_links() {
        let db = setup_db();
        let p = project(&db, "P");
        let l = db
            .create_link(&NewLink {
                linkable_type: Some("project".to_string()),
                linkable_id: Some(p.id),
                name: Some("Repo".to_string()),
                url: Some("https://example.com".to_string()),
            })
            .unwrap();

        db.delete_project(p.id).unwrap();
        assert!(db.get_link(l.id).unwrap().is_none());
    }

    #[test]
    fn delete_missing_project() {
        let db = setup_db();
        assert_eq!(
            code(db.delete_project(42).unwrap_err()),
            ErrorCode::ProjectNotFound
        );
    }
}

mod section_tests {
    use super::*;

    #[test]
    fn sections_append_in_order_with_default_icon() {
        let db = setup_db();
        let p = project(&db, "P");
        let a = section(&db, p.id, "Todo");
        let b = section(&db, p.id, "Doing");

        assert_eq!(a.display_order, 1);
        assert_eq!(b.display_order, 2);
        assert_eq!(a.icon, "📋");

        let listed: Vec<String> = db
            .list_sections(p.id)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(listed, vec!["Todo", "Doing"]);
    }

    #[test]
    fn create_section_errors() {
        let db = setup_db();

        let err = db
            .create_section(&NewSection {
                project_id: None,
                name: Some("Todo".to_string()),
                icon: None,
            })
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::MissingRequiredField);

        let err = db
            .create_section(&NewSection {
                project_id: Some(404),
                name: Some("Todo".to_string()),
                icon: None,
            })
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::ProjectNotFound);
    }

    #[test]
    fn update_section_keeps_order() {
        let db = setup_db();
        let p = project(&db, "P");
        section(&db, p.id, "First");
        let s = section(&db, p.id, "Second");

        let updated = db
            .update_section(
                s.id,
                &SectionUpdate {
                    name: None,
                    icon: Some("🚀".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Second");
        assert_eq!(updated.icon, "🚀");
        assert_eq!(updated.display_order, 2);

        let err = db.update_section(s.id, &SectionUpdate::default()).unwrap_err();
        assert_eq!(code(err), ErrorCode::EmptyUpdate);
    }

    #[test]
    fn blank_icon_resets_to_default_on_create_and_update() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = db
            .create_section(&NewSection {
                project_id: Some(p.id),
                name: Some("Todo".to_string()),
                icon: Some("  ".to_string()),
            })
            .unwrap();
        assert_eq!(s.icon, "📋");

        db.update_section(
            s.id,
            &SectionUpdate {
                name: None,
                icon: Some("🚀".to_string()),
            },
        )
        .unwrap();
        let reset = db
            .update_section(
                s.id,
                &SectionUpdate {
                    name: None,
                    icon: Some(String::new()),
                },
            )
            .unwrap();
        assert_eq!(reset.icon, "📋");
        assert_eq!(reset.name, "Todo");
    }

    #[test]
    fn delete_section_with_tasks_is_a_conflict() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");
        task(&db, s.id, "Blocker");

        let err = db.delete_section(s.id).unwrap_err();
        assert_eq!(code(err), ErrorCode::HasChildren);
        assert_eq!(db.list_tasks(s.id).unwrap().len(), 1);
    }

    #[test]
    fn delete_section_closes_the_gap() {
        let db = setup_db();
        let p = project(&db, "P");
        section(&db, p.id, "A");
        let b = section(&db, p.id, "B");
        section(&db, p.id, "C");

        db.delete_section(b.id).unwrap();

        let sections = db.list_sections(p.id).unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        let orders: Vec<i64> = sections.iter().map(|s| s.display_order).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(orders, vec![1, 2]);

        // The next section fills the end of the dense range
        assert_eq!(section(&db, p.id, "D").display_order, 3);
    }

    #[test]
    fn list_sections_of_missing_project() {
        let db = setup_db();
        assert_eq!(
            code(db.list_sections(3).unwrap_err()),
            ErrorCode::ProjectNotFound
        );
    }
}

mod task_tests {
    use super::*;

    #[test]
    fn create_task_applies_defaults() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");
        let t = task(&db, s.id, "Write docs");

        assert_eq!(t.title, "Write docs");
        assert_eq!(t.task_number, 1);
        assert_eq!(t.display_order, 1);
        assert_eq!(t.priority, TaskPriority::Medium);
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.progress, 0);
        assert!(t.start_date.is_none());
    }

    #[test]
    fn task_numbers_are_per_project_and_never_reused() {
        let db = setup_db();
        let p1 = project(&db, "One");
        let p2 = project(&db, "Two");
        let s1 = section(&db, p1.id, "Todo");
        let s1b = section(&db, p1.id, "Done");
        let s2 = section(&db, p2.id, "Todo");

        assert_eq!(task(&db, s1.id, "a").task_number, 1);
        assert_eq!(task(&db, s1b.id, "b").task_number, 2);
        let third = task(&db, s1.id, "c");
        assert_eq!(third.task_number, 3);
        assert_eq!(task(&db, s2.id, "other").task_number, 1);

        db.delete_task(third.id).unwrap();
        assert_eq!(task(&db, s1.id, "d").task_number, 4);
    }

    #[test]
    fn create_task_with_all_fields_and_links() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");

        let t = db
            .create_task(&NewTask {
                section_id: Some(s.id),
                title: Some("Ship".to_string()),
                assignee: Some("sam".to_string()),
                priority: Some("high".to_string()),
                status: Some("in_progress".to_string()),
                start_date: Some("2024-03-01".to_string()),
                end_date: Some("".to_string()),
                progress: Some(40),
                links: Some(vec![link("Design", "https://a"), link("PR", "https://b")]),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(t.priority, TaskPriority::High);
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.start_date.unwrap().to_string(), "2024-03-01");
        assert!(t.end_date.is_none());
        assert_eq!(t.progress, 40);

        let with_links = db.get_task_with_links(t.id).unwrap();
        let names: Vec<&str> = with_links.links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Design", "PR"]);
        assert_eq!(with_links.links[1].display_order, 2);
    }

    #[test]
    fn create_task_validation() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");

        let cases = [
            (
                NewTask {
                    section_id: Some(s.id),
                    ..Default::default()
                },
                ErrorCode::MissingRequiredField,
            ),
            (
                NewTask {
                    title: Some("t".to_string()),
                    ..Default::default()
                },
                ErrorCode::MissingRequiredField,
            ),
            (
                NewTask {
                    section_id: Some(s.id),
                    title: Some("t".to_string()),
                    priority: Some("urgent".to_string()),
                    ..Default::default()
                },
                ErrorCode::InvalidFieldValue,
            ),
            (
                NewTask {
                    section_id: Some(s.id),
                    title: Some("t".to_string()),
                    start_date: Some("03/01/2024".to_string()),
                    ..Default::default()
                },
                ErrorCode::InvalidFieldValue,
            ),
            (
                NewTask {
                    section_id: Some(s.id),
                    title: Some("t".to_string()),
                    progress: Some(101),
                    ..Default::default()
                },
                ErrorCode::InvalidFieldValue,
            ),
            (
                NewTask {
                    section_id: Some(s.id),
                    title: Some("t".to_string()),
                    links: Some(vec![LinkInput {
                        name: Some("no url".to_string()),
                        url: None,
                    }]),
                    ..Default::default()
                },
                ErrorCode::MissingRequiredField,
            ),
            (
                NewTask {
                    section_id: Some(999),
                    title: Some("t".to_string()),
                    ..Default::default()
                },
                ErrorCode::SectionNotFound,
            ),
        ];

        for (input, expected) in cases {
            let err = db.create_task(&input).unwrap_err();
            assert_eq!(code(err), expected, "input: {:?}", input);
        }

        // Nothing leaked from the failed creates
        assert!(db.list_tasks(s.id).unwrap().is_empty());
        assert_eq!(task(&db, s.id, "ok").task_number, 1);
    }

    #[test]
    fn update_task_partial_and_clear_dates() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");
        let t = db
            .create_task(&NewTask {
                section_id: Some(s.id),
                title: Some("Plan".to_string()),
                end_date: Some("2024-12-31".to_string()),
                ..Default::default()
            })
            .unwrap();

        let updated = db
            .update_task(
                t.id,
                &TaskUpdate {
                    notes: Some("call vendor".to_string()),
                    end_date: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Plan");
        assert_eq!(updated.notes, "call vendor");
        assert!(updated.end_date.is_none());
        assert_eq!(updated.display_order, t.display_order);
        assert_eq!(updated.task_number, t.task_number);
    }

    #[test]
    fn update_task_links_replace_existing() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");
        let t = db
            .create_task(&NewTask {
                section_id: Some(s.id),
                title: Some("t".to_string()),
                links: Some(vec![link("old", "https://old")]),
                ..Default::default()
            })
            .unwrap();

        db.update_task(
            t.id,
            &TaskUpdate {
                links: Some(vec![link("new1", "https://1"), link("new2", "https://2")]),
                ..Default::default()
            },
        )
        .unwrap();

        let links = db.get_task_with_links(t.id).unwrap().links;
        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["new1", "new2"]);
        assert_eq!(links[0].display_order, 1);

        // An empty array clears them
        db.update_task(
            t.id,
            &TaskUpdate {
                links: Some(vec![]),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(db.get_task_with_links(t.id).unwrap().links.is_empty());
    }

    #[test]
    fn update_task_errors() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");
        let t = task(&db, s.id, "t");

        let err = db.update_task(t.id, &TaskUpdate::default()).unwrap_err();
        assert_eq!(code(err), ErrorCode::EmptyUpdate);

        let err = db
            .update_task(
                t.id,
                &TaskUpdate {
                    status: Some("done".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::InvalidFieldValue);

        let err = db
            .update_task(
                777,
                &TaskUpdate {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::TaskNotFound);
    }

    #[test]
    fn delete_task_closes_gap_and_removes_links() {
        let (db, _, s) = board();
        let b = db.list_tasks(s.id).unwrap()[1].clone();
        let l = db
            .create_link(&NewLink {
                linkable_type: Some("task".to_string()),
                linkable_id: Some(b.id),
                name: Some("doc".to_string()),
                url: Some("https://doc".to_string()),
            })
            .unwrap();

        db.delete_task(b.id).unwrap();

        assert_eq!(titles(&db, s.id), vec!["A", "C", "D"]);
        assert_eq!(orders(&db, s.id), vec![1, 2, 3]);
        assert!(db.get_link(l.id).unwrap().is_none());
        assert_eq!(
            code(db.delete_task(b.id).unwrap_err()),
            ErrorCode::TaskNotFound
        );
    }

    #[test]
    fn list_tasks_of_missing_section() {
        let db = setup_db();
        assert_eq!(
            code(db.list_tasks(5).unwrap_err()),
            ErrorCode::SectionNotFound
        );
    }
}

mod move_tests {
    use super::*;

    fn move_to(db: &Database, task_id: i64, section: Option<i64>, position: Option<i64>) -> Task {
        db.move_task(
            task_id,
            &TaskMove {
                new_section_id: section,
                new_position: position,
            },
        )
        .expect("move failed")
    }

    fn id_of(db: &Database, section_id: i64, title: &str) -> i64 {
        db.list_tasks(section_id)
            .unwrap()
            .into_iter()
            .find(|t| t.title == title)
            .map(|t| t.id)
            .unwrap()
    }

    #[test]
    fn move_earlier_within_section() {
        let (db, _, s) = board();
        let d = id_of(&db, s.id, "D");

        let moved = move_to(&db, d, None, Some(2));
        assert_eq!(moved.display_order, 2);
        assert_eq!(titles(&db, s.id), vec!["A", "D", "B", "C"]);
        assert_eq!(orders(&db, s.id), vec![1, 2, 3, 4]);
    }

    #[test]
    fn move_later_within_section() {
        let (db, _, s) = board();
        let a = id_of(&db, s.id, "A");

        move_to(&db, a, Some(s.id), Some(3));
        assert_eq!(titles(&db, s.id), vec!["B", "C", "A", "D"]);
        assert_eq!(orders(&db, s.id), vec![1, 2, 3, 4]);
    }

    #[test]
    fn move_to_same_position_is_a_no_op() {
        let (db, _, s) = board();
        let b = id_of(&db, s.id, "B");
        let before = db.get_task(b).unwrap().unwrap();

        let moved = move_to(&db, b, None, Some(2));
        assert_eq!(moved.display_order, 2);
        assert_eq!(moved.updated_at, before.updated_at);
        assert_eq!(titles(&db, s.id), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn out_of_range_positions_are_clamped() {
        let (db, _, s) = board();
        let a = id_of(&db, s.id, "A");
        let c = id_of(&db, s.id, "C");

        move_to(&db, a, None, Some(99));
        assert_eq!(titles(&db, s.id), vec!["B", "C", "D", "A"]);

        move_to(&db, c, None, Some(0));
        assert_eq!(titles(&db, s.id), vec!["C", "B", "D", "A"]);
        assert_eq!(orders(&db, s.id), vec![1, 2, 3, 4]);
    }

    #[test]
    fn move_across_sections_at_position() {
        let (db, p, todo) = board();
        let done = section(&db, p.id, "Done");
        task(&db, done.id, "X");
        task(&db, done.id, "Y");
        let b = id_of(&db, todo.id, "B");

        let moved = move_to(&db, b, Some(done.id), Some(2));
        assert_eq!(moved.section_id, done.id);
        assert_eq!(moved.display_order, 2);

        assert_eq!(titles(&db, todo.id), vec!["A", "C", "D"]);
        assert_eq!(orders(&db, todo.id), vec![1, 2, 3]);
        assert_eq!(titles(&db, done.id), vec!["X", "B", "Y"]);
        assert_eq!(orders(&db, done.id), vec![1, 2, 3]);
    }

    #[test]
    fn move_across_sections_without_position_appends() {
        let (db, p, todo) = board();
        let done = section(&db, p.id, "Done");
        task(&db, done.id, "X");
        let a = id_of(&db, todo.id, "A");

        let moved = move_to(&db, a, Some(done.id), None);
        assert_eq!(moved.display_order, 2);
        assert_eq!(titles(&db, done.id), vec!["X", "A"]);
        assert_eq!(orders(&db, todo.id), vec![1, 2, 3]);
    }

    #[test]
    fn move_into_empty_section_clamps_to_first() {
        let (db, p, todo) = board();
        let empty = section(&db, p.id, "Empty");
        let c = id_of(&db, todo.id, "C");

        let moved = move_to(&db, c, Some(empty.id), Some(10));
        assert_eq!(moved.display_order, 1);
        assert_eq!(titles(&db, todo.id), vec!["A", "B", "D"]);
    }

    #[test]
    fn move_keeps_task_number() {
        let (db, p, todo) = board();
        let done = section(&db, p.id, "Done");
        let d = db.get_task(id_of(&db, todo.id, "D")).unwrap().unwrap();

        let moved = move_to(&db, d.id, Some(done.id), Some(1));
        assert_eq!(moved.task_number, d.task_number);
    }

    #[test]
    fn move_errors_leave_ordering_untouched() {
        let (db, _, todo) = board();
        let other = project(&db, "Other");
        let foreign = section(&db, other.id, "Elsewhere");
        let a = id_of(&db, todo.id, "A");

        let err = db
            .move_task(
                a,
                &TaskMove {
                    new_section_id: Some(foreign.id),
                    new_position: Some(1),
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::InvalidFieldValue);

        let err = db
            .move_task(
                a,
                &TaskMove {
                    new_section_id: Some(12345),
                    new_position: Some(1),
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::SectionNotFound);

        let err = db
            .move_task(
                9999,
                &TaskMove {
                    new_section_id: None,
                    new_position: Some(1),
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::TaskNotFound);

        assert_eq!(titles(&db, todo.id), vec!["A", "B", "C", "D"]);
        assert_eq!(orders(&db, todo.id), vec![1, 2, 3, 4]);
    }

    #[test]
    fn failed_cross_section_move_rolls_back_shifted_rows() {
        let (db, p, todo) = board();
        let done = section(&db, p.id, "Done");
        task(&db, done.id, "X");
        task(&db, done.id, "Y");
        let b = id_of(&db, todo.id, "B");

        // Reject the final row update, after both sections were already shifted
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_section_change BEFORE UPDATE OF section_id ON tasks
                 BEGIN
                     SELECT RAISE(ABORT, 'section change rejected');
                 END;",
            )?;
            Ok(())
        })
        .unwrap();

        let err = db
            .move_task(
                b,
                &TaskMove {
                    new_section_id: Some(done.id),
                    new_position: Some(1),
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::DatabaseError);

        assert_eq!(titles(&db, todo.id), vec!["A", "B", "C", "D"]);
        assert_eq!(orders(&db, todo.id), vec![1, 2, 3, 4]);
        assert_eq!(titles(&db, done.id), vec!["X", "Y"]);
        assert_eq!(orders(&db, done.id), vec![1, 2]);
        assert_eq!(db.get_task(b).unwrap().unwrap().section_id, todo.id);
    }

    #[test]
    fn ordering_stays_dense_through_mixed_operations() {
        let (db, p, todo) = board();
        let done = section(&db, p.id, "Done");

        let b = id_of(&db, todo.id, "B");
        let d = id_of(&db, todo.id, "D");
        move_to(&db, b, Some(done.id), None);
        move_to(&db, d, Some(done.id), Some(1));
        task(&db, todo.id, "E");
        db.delete_task(id_of(&db, todo.id, "A")).unwrap();
        move_to(&db, id_of(&db, done.id, "B"), Some(todo.id), Some(2));

        for s in [todo.id, done.id] {
            let o = orders(&db, s);
            let expected: Vec<i64> = (1..=o.len() as i64).collect();
            assert_eq!(o, expected);
        }
        assert_eq!(titles(&db, todo.id), vec!["C", "B", "E"]);
        assert_eq!(titles(&db, done.id), vec!["D"]);
    }
}

mod link_tests {
    use super::*;

    fn new_link(kind: &str, owner: i64, name: &str) -> NewLink {
        NewLink {
            linkable_type: Some(kind.to_string()),
            linkable_id: Some(owner),
            name: Some(name.to_string()),
            url: Some(format!("https://example.com/{}", name)),
        }
    }

    #[test]
    fn links_append_per_owner() {
        let db = setup_db();
        let p = project(&db, "P");
        let s = section(&db, p.id, "Todo");
        let t = task(&db, s.id, "t");

        let l1 = db.create_link(&new_link("project", p.id, "repo")).unwrap();
        let l2 = db.create_link(&new_link("project", p.id, "wiki")).unwrap();
        let l3 = db.create_link(&new_link("task", t.id, "ticket")).unwrap();

        assert_eq!(l1.display_order, 1);
        assert_eq!(l2.display_order, 2);
        assert_eq!(l3.display_order, 1);

        let project_links = db.list_links("project", p.id).unwrap();
        assert_eq!(project_links.len(), 2);
        assert_eq!(db.list_links("task", t.id).unwrap().len(), 1);
    }

    #[test]
    fn create_link_errors() {
        let db = setup_db();
        let p = project(&db, "P");

        let err = db.create_link(&new_link("section", p.id, "x")).unwrap_err();
        assert_eq!(code(err), ErrorCode::InvalidFieldValue);

        let err = db.create_link(&new_link("task", 55, "x")).unwrap_err();
        assert_eq!(code(err), ErrorCode::TaskNotFound);

        let mut missing_url = new_link("project", p.id, "x");
        missing_url.url = None;
        let err = db.create_link(&missing_url).unwrap_err();
        assert_eq!(code(err), ErrorCode::MissingRequiredField);
    }

    #[test]
    fn update_and_delete_link() {
        let db = setup_db();
        let p = project(&db, "P");
        let a = db.create_link(&new_link("project", p.id, "a")).unwrap();
        let b = db.create_link(&new_link("project", p.id, "b")).unwrap();
        db.create_link(&new_link("project", p.id, "c")).unwrap();

        let updated = db
            .update_link(
                a.id,
                &LinkUpdate {
                    name: Some("renamed".to_string()),
                    url: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.url, a.url);

        let view_links = db.project_view(p.id).unwrap().project.links;
        let names: Vec<&str> = view_links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["renamed", "b", "c"]);

        db.delete_link(b.id).unwrap();
        let view_links = db.project_view(p.id).unwrap().project.links;
        let names: Vec<&str> = view_links.iter().map(|l| l.name.as_str()).collect();
        let orders: Vec<i64> = view_links.iter().map(|l| l.display_order).collect();
        assert_eq!(names, vec!["renamed", "c"]);
        assert_eq!(orders, vec![1, 2]);

        assert_eq!(
            code(db.delete_link(b.id).unwrap_err()),
            ErrorCode::LinkNotFound
        );
        assert_eq!(
            code(db.update_link(a.id, &LinkUpdate::default()).unwrap_err()),
            ErrorCode::EmptyUpdate
        );
    }
}

mod view_tests {
    use super::*;

    #[test]
    fn project_view_assembles_board() {
        let (db, p, todo) = board();
        let done = section(&db, p.id, "Done");
        let x = task(&db, done.id, "X");
        db.create_link(&NewLink {
            linkable_type: Some("project".to_string()),
            linkable_id: Some(p.id),
            name: Some("repo".to_string()),
            url: Some("https://repo".to_string()),
        })
        .unwrap();
        db.create_link(&NewLink {
            linkable_type: Some("task".to_string()),
            linkable_id: Some(x.id),
            name: Some("pr".to_string()),
            url: Some("https://pr".to_string()),
        })
        .unwrap();

        let view = db.project_view(p.id).unwrap();
        assert_eq!(view.project.project.id, p.id);
        assert_eq!(view.project.links.len(), 1);
        assert_eq!(view.sections.len(), 2);

        let first = &view.sections[0];
        assert_eq!(first.section.id, todo.id);
        assert_eq!(first.task_count, 4);
        let titles: Vec<&str> = first.tasks.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C", "D"]);
        assert!(first.tasks.iter().all(|t| t.links.is_empty()));

        let second = &view.sections[1];
        assert_eq!(second.task_count, 1);
        assert_eq!(second.tasks[0].links[0].name, "pr");
    }

    #[test]
    fn project_view_reflects_moves() {
        let (db, _, todo) = board();
        let p_id = db.get_section(todo.id).unwrap().unwrap().project_id;
        let d = db.list_tasks(todo.id).unwrap()[3].id;
        db.move_task(
            d,
            &TaskMove {
                new_section_id: None,
                new_position: Some(1),
            },
        )
        .unwrap();

        let view = db.project_view(p_id).unwrap();
        let titles: Vec<&str> = view.sections[0]
            .tasks
            .iter()
            .map(|t| t.task.title.as_str())
            .collect();
        assert_eq!(titles, vec!["D", "A", "B", "C"]);
    }

    #[test]
    fn project_view_of_missing_project() {
        let db = setup_db();
        assert_eq!(
            code(db.project_view(8).unwrap_err()),
            ErrorCode::ProjectNotFound
        );
    }
}

mod storage_tests {
    use super::*;

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskflow.db");

        let project_id = {
            let db = Database::open(&path).unwrap();
            let p = project(&db, "Persistent");
            let s = section(&db, p.id, "Todo");
            task(&db, s.id, "kept");
            p.id
        };

        let db = Database::open(&path).unwrap();
        let view = db.project_view(project_id).unwrap();
        assert_eq!(view.project.project.name, "Persistent");
        assert_eq!(view.sections[0].tasks[0].task.title, "kept");
        assert_eq!(db.schema_version().unwrap(), 1);
    }
}
