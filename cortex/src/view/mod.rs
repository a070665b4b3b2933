// View engine - computed presentation state per view type

mod calendar;
mod cards;
mod gallery;
mod my_day;
mod table;
mod todo;

pub use calendar::DayWindow;
pub use cards::{compute_cards, CardGroup, CardsState};
pub use gallery::{compute_gallery, GalleryBadge, GalleryItem, GalleryState};
pub use my_day::{
    compute_my_day, record_perfect_day, toggle_streak, HabitState, HabitStreak, MyDayState,
    PerfectStreak,
};
pub use table::{compute_table, TableRow, TableState};
pub use todo::{compute_todo, toggled_value, TodoState};

use crate::error::Result;
use crate::query;
use crate::record::Record;
use crate::relation::Catalog;
use crate::schema::{Database, Field, View, ViewConfig};
use serde::Serialize;

/// Computed state of any view type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewState {
    Table(TableState),
    Cards(CardsState),
    Todo(TodoState),
    MyDay(MyDayState),
    Gallery(GalleryState),
}

/// Inputs every view type starts from: the visible fields in schema order
/// and the filtered, sorted records.
#[derive(Debug, Clone)]
pub struct Prepared<'a> {
    pub visible_fields: Vec<&'a Field>,
    pub records: Vec<&'a Record>,
}

pub fn prepare<'a>(database: &'a Database, view: &View) -> Prepared<'a> {
    let visible_fields = database
        .fields
        .iter()
        .filter(|f| view.visible_fields.contains(&f.id))
        .collect();
    let records = query::evaluate(&database.records, &database.fields, view);
    Prepared {
        visible_fields,
        records,
    }
}

/// Derive a view's state from a database snapshot.
pub fn compute(
    database: &Database,
    view: &View,
    catalog: &Catalog,
    days: DayWindow,
) -> Result<ViewState> {
    log::debug!(
        "computing {:?} view '{}' over {} records",
        view.view_type(),
        view.name,
        database.records.len()
    );
    let prepared = prepare(database, view);

    Ok(match &view.config {
        ViewConfig::Table => ViewState::Table(compute_table(view, &prepared, catalog)),
        ViewConfig::Cards { cards_config } => {
            ViewState::Cards(compute_cards(database, cards_config, &prepared, catalog)?)
        }
        ViewConfig::Todo { todo_config } => {
            ViewState::Todo(compute_todo(database, todo_config, &prepared)?)
        }
        ViewConfig::MyDay { my_day_config } => {
            ViewState::MyDay(compute_my_day(database, my_day_config, &prepared, days)?)
        }
        ViewConfig::Gallery { gallery_config } => {
            ViewState::Gallery(compute_gallery(database, gallery_config, &prepared)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Value, Values};
    use crate::schema::{
        CardsViewConfig, FieldType, GalleryViewConfig, RelationConfig, SelectOption,
        SortCondition, TodoViewConfig,
    };
    use chrono::{NaiveDate, Utc};

    fn field(id: &str, name: &str, field_type: FieldType) -> Field {
        Field {
            id: id.into(),
            name: name.into(),
            field_type,
            options: None,
            relation_config: None,
            required: false,
        }
    }

    fn record(id: &str, order: i64, values: &[(&str, Value)]) -> Record {
        let now = Utc::now();
        Record {
            id: id.into(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Values>(),
            order,
            created_at: now,
            updated_at: now,
        }
    }

    fn database(id: &str, fields: Vec<Field>, records: Vec<Record>) -> Database {
        let now = Utc::now();
        Database {
            id: id.into(),
            name: id.into(),
            description: None,
            icon: "database".into(),
            color: "gray".into(),
            fields,
            records,
            views: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn view(config: ViewConfig, visible: &[&str]) -> View {
        View {
            id: "v".into(),
            name: "V".into(),
            config,
            filters: Vec::new(),
            sorts: Vec::new(),
            visible_fields: visible.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn days() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    #[test]
    fn test_prepare_keeps_schema_order_of_visible_fields() {
        let db = database(
            "db",
            vec![
                field("a", "A", FieldType::Text),
                field("b", "B", FieldType::Text),
                field("c", "C", FieldType::Text),
            ],
            vec![],
        );
        let prepared = prepare(&db, &view(ViewConfig::Table, &["c", "a"]));
        let ids: Vec<&str> = prepared.visible_fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_table_reorder_disabled_under_sort() {
        let db = database("db", vec![field("a", "A", FieldType::Text)], vec![]);
        let mut v = view(ViewConfig::Table, &["a"]);
        let ViewState::Table(state) = compute(&db, &v, &Catalog::default(), days()).unwrap() else {
            panic!("expected table state");
        };
        assert!(state.can_reorder);

        v.sorts.push(SortCondition::asc("a"));
        let ViewState::Table(state) = compute(&db, &v, &Catalog::default(), days()).unwrap() else {
            panic!("expected table state");
        };
        assert!(!state.can_reorder);
    }

    #[test]
    fn test_cards_group_children_and_progress() {
        let projects = database(
            "projects",
            vec![field("name", "Name", FieldType::Text)],
            vec![
                record("p1", 0, &[("name", Value::text("Site"))]),
                record("p2", 1, &[("name", Value::text("Book"))]),
            ],
        );
        let mut project_rel = field("project", "Project", FieldType::Relation);
        project_rel.relation_config = Some(RelationConfig {
            database_id: "projects".into(),
            multiple: false,
        });
        let tasks = database(
            "tasks",
            vec![
                field("title", "Title", FieldType::Text),
                project_rel,
                field("done", "Done", FieldType::Checkbox),
            ],
            vec![
                record("t1", 0, &[("project", Value::text("p1")), ("done", Value::Bool(true))]),
                record("t2", 1, &[("project", Value::text("p1"))]),
                record("t3", 2, &[("project", Value::text("p1")), ("done", Value::text("true"))]),
                record("t4", 3, &[("project", Value::text("zz"))]),
            ],
        );
        let catalog = Catalog::new([projects.clone(), tasks]);
        let v = view(
            ViewConfig::Cards {
                cards_config: CardsViewConfig {
                    source_database_id: "tasks".into(),
                    group_by_field_id: "project".into(),
                },
            },
            &["name"],
        );

        let ViewState::Cards(state) = compute(&projects, &v, &catalog, days()).unwrap() else {
            panic!("expected cards state");
        };
        assert_eq!(state.groups.len(), 2);
        let site = &state.groups[0];
        assert_eq!(site.title, "Site");
        assert_eq!(site.children.len(), 3);
        assert_eq!(site.completed, 2);
        assert!((site.progress.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        let book = &state.groups[1];
        assert!(book.children.is_empty());
        assert_eq!(book.progress, Some(0.0));
    }

    #[test]
    fn test_cards_missing_source_is_invalid() {
        let db = database("projects", vec![], vec![]);
        let v = view(
            ViewConfig::Cards {
                cards_config: CardsViewConfig {
                    source_database_id: "gone".into(),
                    group_by_field_id: "x".into(),
                },
            },
            &[],
        );
        assert!(compute(&db, &v, &Catalog::default(), days()).is_err());
    }

    #[test]
    fn test_todo_partitions_in_query_order() {
        let db = database(
            "todos",
            vec![field("done", "Done", FieldType::Checkbox)],
            vec![
                record("c", 2, &[("done", Value::Bool(true))]),
                record("a", 0, &[("done", Value::Bool(false))]),
                record("b", 1, &[("done", Value::text("true"))]),
                record("d", 3, &[]),
            ],
        );
        let v = view(
            ViewConfig::Todo {
                todo_config: TodoViewConfig {
                    checkbox_field_id: "done".into(),
                    show_completed: false,
                    completed_collapsed: true,
                },
            },
            &["done"],
        );
        let ViewState::Todo(state) = compute(&db, &v, &Catalog::default(), days()).unwrap() else {
            panic!("expected todo state");
        };
        let ids = |rs: &[Record]| rs.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&state.incomplete), vec!["a", "d"]);
        assert_eq!(ids(&state.complete), vec!["b", "c"]);
        assert!(!state.show_completed);
        assert_eq!(toggled_value(&db.records[1], "done"), Value::Bool(true));
        assert_eq!(toggled_value(&db.records[2], "done"), Value::Bool(false));
    }

    #[test]
    fn test_my_day_counts_pending() {
        let db = database(
            "habits",
            vec![
                field("name", "Name", FieldType::Text),
                field("last", "Last", FieldType::Date),
                field("streak", "Streak", FieldType::Number),
            ],
            vec![
                record(
                    "h1",
                    0,
                    &[("last", Value::text("2026-10-16")), ("streak", Value::Number(3.0))],
                ),
                record(
                    "h2",
                    1,
                    &[("last", Value::text("2026-10-10")), ("streak", Value::Number(5.0))],
                ),
            ],
        );
        let v = view(
            ViewConfig::MyDay {
                my_day_config: crate::schema::MyDayViewConfig {
                    date_field_id: "last".into(),
                    streak_field_id: "streak".into(),
                    perfect_streak: 4,
                    last_perfect_day: NaiveDate::from_ymd_opt(2026, 10, 1),
                },
            },
            &["name"],
        );
        let ViewState::MyDay(state) = compute(&db, &v, &Catalog::default(), days()).unwrap() else {
            panic!("expected my_day state");
        };
        assert_eq!(state.completed, 1);
        assert_eq!(state.pending, 1);
        assert!(!state.all_done);
        assert_eq!(state.habits[0].display_streak, 3);
        assert_eq!(state.habits[1].display_streak, 0);
        assert_eq!(state.habits[1].streak.streak, 5);
        assert!(!state.perfect_streak_active);
        assert_eq!(state.display_perfect_streak, 0);
        assert_eq!(state.perfect_streak.count, 4);
    }

    #[test]
    fn test_gallery_badges_from_named_selects() {
        let mut status = field("status", "Status", FieldType::Select);
        status.options = Some(vec![SelectOption {
            id: "o1".into(),
            label: "Watching".into(),
            color: "blue".into(),
        }]);
        let mut genre = field("genre", "Genre", FieldType::Select);
        genre.options = status.options.clone();
        let db = database(
            "movies",
            vec![
                field("title", "Title", FieldType::Text),
                field("poster", "Poster", FieldType::Url),
                status,
                genre,
            ],
            vec![record(
                "m1",
                0,
                &[
                    ("title", Value::text("Heat")),
                    ("poster", Value::text("https://img/heat.jpg")),
                    ("status", Value::text("o1")),
                    ("genre", Value::text("o1")),
                ],
            )],
        );
        let v = view(
            ViewConfig::Gallery {
                gallery_config: GalleryViewConfig {
                    image_field_id: "poster".into(),
                },
            },
            &["title"],
        );
        let ViewState::Gallery(state) = compute(&db, &v, &Catalog::default(), days()).unwrap() else {
            panic!("expected gallery state");
        };
        let item = &state.items[0];
        assert_eq!(item.title, "Heat");
        assert_eq!(item.image_url.as_deref(), Some("https://img/heat.jpg"));
        assert_eq!(item.badges.len(), 1);
        assert_eq!(item.badges[0].label, "Watching");
    }
}
