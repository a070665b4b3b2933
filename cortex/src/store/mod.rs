use crate::db::RowStore;
use crate::error::{CortexError, Result};
use crate::ids::{self, IdStrategy};
use crate::metadata::{map_candidate, MetadataCandidate};
use crate::record::{Record, Value, Values, MAX_ORDER};
use crate::relation::{relation_value, Catalog};
use crate::schema::{
    diff_field, CardsViewConfig, Database, DatabasePatch, DatabaseTemplate, Field, FieldPatch,
    FieldType, GalleryViewConfig, MyDayViewConfig, NewDatabase, NewField, NewView,
    SortCondition, TodoViewConfig, View, ViewConfig, ViewPatch, ViewTemplate, ViewType,
};
use crate::snapshot::{self, ImportMode, ImportReport, Snapshot};
use crate::validation;
use crate::view::{
    self, record_perfect_day, toggle_streak, toggled_value, DayWindow, HabitStreak,
    PerfectStreak, ViewState,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Name of the table view every new database starts with.
pub const DEFAULT_VIEW_NAME: &str = "All";

/// Where the store lives and how strictly writes are validated.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    /// Reject invalid record values instead of logging them.
    pub strict: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: None,
            strict: true,
        }
    }
}

impl StoreConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }
}

/// Outcome of toggling a habit in a MyDay view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitToggle {
    pub record: Record,
    pub completed_today: bool,
    pub streak: HabitStreak,
    pub perfect_streak: PerfectStreak,
    /// True when this toggle completed the last pending habit of the day.
    pub perfect_day: bool,
}

/// The main entry point for Cortex.
/// Validates every mutation against the schema, commits it through the row
/// store and derives view state from fresh snapshots.
pub struct Store {
    rows: RowStore,
    config: StoreConfig,
}

impl Store {
    /// Open a store with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let rows = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                RowStore::open(path)?
            }
            None => RowStore::open_in_memory()?,
        };
        log::debug!(
            "opened store at {} (strict: {})",
            config
                .path
                .as_deref()
                .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string()),
            config.strict
        );
        Ok(Store { rows, config })
    }

    /// Open a strict store backed by a file.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Store::open(StoreConfig::at(path.as_ref()))
    }

    /// Open a strict in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Store::open(StoreConfig::default())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── Databases ────────────────────────────────────────────────────

    /// Create an empty database with its default table view.
    pub fn create_database(&self, new: NewDatabase) -> Result<Database> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(CortexError::Validation(
                "Database name must not be empty".into(),
            ));
        }

        let now = Utc::now();
        let database = Database {
            id: ids::generate(IdStrategy::Uuid),
            name: name.to_string(),
            description: new.description,
            icon: new.icon,
            color: new.color,
            fields: Vec::new(),
            records: Vec::new(),
            views: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.rows.with_transaction(|rows| {
            rows.upsert_database(&database)?;
            rows.upsert_view(&database.id, &default_view(&database))
        })?;
        log::info!("created database '{}' ({})", database.name, database.id);
        self.get_database(&database.id)
    }

    /// Create a database with fields and views from a template in one go.
    pub fn create_database_from_template(&self, template: &DatabaseTemplate) -> Result<Database> {
        self.rows.with_transaction(|_| {
            let mut new = NewDatabase::named(template.name.clone());
            new.description = template.description.clone();
            if let Some(icon) = &template.icon {
                new.icon = icon.clone();
            }
            if let Some(color) = &template.color {
                new.color = color.clone();
            }
            let created = self.create_database(new)?;

            for field_template in &template.fields {
                let target = match (&field_template.field_type, &field_template.target) {
                    (FieldType::Relation, Some(target)) => {
                        Some(self.resolve_target(target, &template.name, &created.id)?)
                    }
                    (FieldType::Relation, None) => {
                        return Err(CortexError::InvalidOperation(format!(
                            "template relation field '{}' has no target",
                            field_template.name
                        )))
                    }
                    _ => None,
                };
                self.add_field(&created.id, field_template.to_new_field(target))?;
            }

            if !template.views.is_empty() {
                let database = self.get_database(&created.id)?;
                for view_template in &template.views {
                    let new_view = self.view_from_template(&database, view_template)?;
                    self.add_view(&created.id, new_view)?;
                }
                for default in database.views.iter() {
                    self.rows.delete_view(&created.id, &default.id)?;
                }
            }

            self.get_database(&created.id)
        })
    }

    /// Relation targets in templates name a database by id or name; the
    /// template's own name points at the database being created.
    fn resolve_target(&self, target: &str, own_name: &str, own_id: &str) -> Result<String> {
        if target.eq_ignore_ascii_case(own_name) {
            return Ok(own_id.to_string());
        }
        self.find_database(target)?
            .map(|db| db.id)
            .ok_or_else(|| {
                CortexError::InvalidOperation(format!("template target database '{target}' not found"))
            })
    }

    fn view_from_template(&self, database: &Database, template: &ViewTemplate) -> Result<NewView> {
        let field_id = |db: &Database, name: &Option<String>, what: &str| -> Result<String> {
            let name = name.as_deref().ok_or_else(|| {
                CortexError::InvalidOperation(format!(
                    "template view '{}' needs {what}",
                    template.name
                ))
            })?;
            db.resolve_field(name).map(|f| f.id.clone()).ok_or_else(|| {
                CortexError::InvalidOperation(format!(
                    "template view '{}' names unknown field '{name}' on '{}'",
                    template.name, db.name
                ))
            })
        };

        let config = match template.view_type {
            ViewType::Table => ViewConfig::Table,
            ViewType::Todo => ViewConfig::Todo {
                todo_config: TodoViewConfig {
                    checkbox_field_id: field_id(database, &template.checkbox_field, "checkbox_field")?,
                    show_completed: template.show_completed.unwrap_or(true),
                    completed_collapsed: false,
                },
            },
            ViewType::MyDay => ViewConfig::MyDay {
                my_day_config: MyDayViewConfig {
                    date_field_id: field_id(database, &template.date_field, "date_field")?,
                    streak_field_id: field_id(database, &template.streak_field, "streak_field")?,
                    perfect_streak: 0,
                    last_perfect_day: None,
                },
            },
            ViewType::Gallery => ViewConfig::Gallery {
                gallery_config: GalleryViewConfig {
                    image_field_id: field_id(database, &template.image_field, "image_field")?,
                },
            },
            ViewType::Cards => {
                let source_name = template.source_database.as_deref().ok_or_else(|| {
                    CortexError::InvalidOperation(format!(
                        "template view '{}' needs source_database",
                        template.name
                    ))
                })?;
                let source = if source_name.eq_ignore_ascii_case(&database.name) {
                    database.clone()
                } else {
                    self.find_database(source_name)?.ok_or_else(|| {
                        CortexError::InvalidOperation(format!(
                            "template source database '{source_name}' not found"
                        ))
                    })?
                };
                ViewConfig::Cards {
                    cards_config: CardsViewConfig {
                        group_by_field_id: field_id(&source, &template.group_by_field, "group_by_field")?,
                        source_database_id: source.id,
                    },
                }
            }
        };

        let mut new_view = NewView::new(template.name.clone(), config);
        for sort in &template.sorts {
            let id = field_id(database, &Some(sort.field.clone()), "a sort field")?;
            new_view.sorts.push(SortCondition {
                field_id: id,
                direction: sort.direction,
            });
        }
        Ok(new_view)
    }

    /// Get a database with all of its fields, records and views.
    pub fn get_database(&self, id: &str) -> Result<Database> {
        self.rows
            .load_database(id)?
            .ok_or_else(|| CortexError::not_found("Database", id))
    }

    /// Find a database by id, then by case-insensitive name.
    pub fn find_database(&self, key: &str) -> Result<Option<Database>> {
        if let Some(db) = self.rows.load_database(key)? {
            return Ok(Some(db));
        }
        let named = self
            .rows
            .list_database_rows()?
            .into_iter()
            .find(|db| db.name.eq_ignore_ascii_case(key.trim()));
        match named {
            Some(db) => self.rows.load_database(&db.id),
            None => Ok(None),
        }
    }

    pub fn list_databases(&self) -> Result<Vec<Database>> {
        self.rows.load_all()
    }

    pub fn update_database(&self, id: &str, patch: DatabasePatch) -> Result<Database> {
        let mut database = self.get_database(id)?;
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(CortexError::Validation(
                    "Database name must not be empty".into(),
                ));
            }
            database.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            database.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(icon) = patch.icon {
            database.icon = icon;
        }
        if let Some(color) = patch.color {
            database.color = color;
        }
        database.updated_at = Utc::now();
        self.rows.upsert_database(&database)?;
        Ok(database)
    }

    /// Delete a database with its fields, records and views. Relations from
    /// other databases into it are left to dangle.
    pub fn delete_database(&self, id: &str) -> Result<()> {
        let deleted = self.rows.with_transaction(|rows| rows.delete_database(id))?;
        if !deleted {
            return Err(CortexError::not_found("Database", id));
        }
        log::info!("deleted database {id}");
        Ok(())
    }

    // ── Fields ───────────────────────────────────────────────────────

    /// Add a field and make it visible in every existing view.
    pub fn add_field(&self, database_id: &str, new: NewField) -> Result<Field> {
        self.rows.with_transaction(|rows| {
            let database = self.get_database(database_id)?;
            let mut field = Field {
                id: ids::generate(IdStrategy::Uuid),
                name: new.name.trim().to_string(),
                field_type: new.field_type,
                options: new.options,
                relation_config: new.relation_config,
                required: new.required,
            };
            prepare_field(&mut field)?;
            validation::check_field(&field, &self.catalog()?)?;

            rows.upsert_field(database_id, &field)?;
            for mut view in database.views {
                view.visible_fields.push(field.id.clone());
                rows.upsert_view(database_id, &view)?;
            }
            rows.touch_database(database_id, Utc::now())?;

            log::info!(
                "added {} field '{}' to '{}'",
                field.field_type,
                field.name,
                database.name
            );
            Ok(field)
        })
    }

    /// Update a field in place. Stored values are never migrated; risky
    /// changes are logged.
    pub fn update_field(&self, database_id: &str, field_id: &str, patch: FieldPatch) -> Result<Field> {
        let database = self.get_database(database_id)?;
        let old = database
            .field(field_id)
            .cloned()
            .ok_or_else(|| CortexError::not_found("Field", field_id))?;

        let mut field = old.clone();
        if let Some(name) = patch.name {
            field.name = name.trim().to_string();
        }
        if let Some(field_type) = patch.field_type {
            field.field_type = field_type;
        }
        if let Some(options) = patch.options {
            field.options = Some(options);
        } else if !field.field_type.has_options() {
            field.options = None;
        }
        if let Some(relation_config) = patch.relation_config {
            field.relation_config = Some(relation_config);
        } else if field.field_type != FieldType::Relation {
            field.relation_config = None;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        prepare_field(&mut field)?;
        validation::check_field(&field, &self.catalog()?)?;

        for change in diff_field(&old, &field) {
            if change.is_safe() {
                log::info!("{}: {}", database.name, change.describe(&field.name));
            } else {
                log::warn!("{}: {}", database.name, change.describe(&field.name));
            }
        }

        self.rows.with_transaction(|rows| {
            rows.upsert_field(database_id, &field)?;
            rows.touch_database(database_id, Utc::now())
        })?;
        Ok(field)
    }

    /// Delete a field, stripping it from every record and every view in the
    /// same transaction.
    pub fn delete_field(&self, database_id: &str, field_id: &str) -> Result<()> {
        self.rows.with_transaction(|rows| {
            let database = self.get_database(database_id)?;
            if database.field(field_id).is_none() {
                return Err(CortexError::not_found("Field", field_id));
            }
            rows.delete_field(database_id, field_id)?;

            let now = Utc::now();
            for mut record in database.records {
                if record.values.remove(field_id).is_some() {
                    record.updated_at = now;
                    rows.upsert_record(database_id, &record)?;
                }
            }
            for mut view in database.views {
                if view.prune_field(field_id) {
                    rows.upsert_view(database_id, &view)?;
                }
            }
            rows.touch_database(database_id, now)?;

            log::info!("deleted field {field_id} from '{}'", database.name);
            Ok(())
        })
    }

    // ── Records ──────────────────────────────────────────────────────

    /// Add a record at the end of the manual order.
    pub fn add_record(&self, database_id: &str, values: Values) -> Result<Record> {
        self.rows.with_transaction(|rows| {
            let database = self.get_database(database_id)?;
            validation::check_values(&database, &values, &values, self.config.strict)?;

            let order = match rows.max_record_order(database_id)? {
                None => 0,
                Some(max) => max
                    .checked_add(1)
                    .filter(|next| *next <= MAX_ORDER)
                    .ok_or_else(|| {
                        CortexError::InvalidOperation(format!(
                            "record order of '{}' is exhausted; reorder its records first",
                            database.name
                        ))
                    })?,
            };
            let now = Utc::now();
            let mut record = Record {
                id: ids::generate(IdStrategy::Ulid),
                values,
                order,
                created_at: now,
                updated_at: now,
            };
            retain_known(&database, &mut record);

            rows.upsert_record(database_id, &record)?;
            rows.touch_database(database_id, now)?;
            log::debug!("added record {} to '{}'", record.id, database.name);
            Ok(record)
        })
    }

    /// Merge `partial` into a record's values. Keys not in `partial` are kept;
    /// a `null` clears its key.
    pub fn update_record(&self, database_id: &str, record_id: &str, partial: Values) -> Result<Record> {
        self.rows.with_transaction(|_| {
            let database = self.get_database(database_id)?;
            let record = database
                .record(record_id)
                .cloned()
                .ok_or_else(|| CortexError::not_found("Record", record_id))?;
            self.patch_record(&database, record, partial)
        })
    }

    fn patch_record(&self, database: &Database, mut record: Record, partial: Values) -> Result<Record> {
        let mut merged = record.values.clone();
        merged.extend(partial.iter().map(|(k, v)| (k.clone(), v.clone())));
        validation::check_values(database, &partial, &merged, self.config.strict)?;

        record.merge(partial);
        retain_known(database, &mut record);
        record.updated_at = Utc::now();

        self.rows.upsert_record(&database.id, &record)?;
        self.rows.touch_database(&database.id, record.updated_at)?;
        Ok(record)
    }

    /// Delete a record. Siblings keep their order values.
    pub fn delete_record(&self, database_id: &str, record_id: &str) -> Result<()> {
        self.rows.with_transaction(|rows| {
            if rows.get_database_row(database_id)?.is_none() {
                return Err(CortexError::not_found("Database", database_id));
            }
            if !rows.delete_record(database_id, record_id)? {
                return Err(CortexError::not_found("Record", record_id));
            }
            rows.touch_database(database_id, Utc::now())
        })
    }

    /// Give each listed record its index as the new manual order. Records not
    /// listed keep their old order. Unknown ids fail the whole reorder.
    pub fn reorder_records(&self, database_id: &str, ordered_ids: &[String]) -> Result<()> {
        self.rows.with_transaction(|rows| {
            if rows.get_database_row(database_id)?.is_none() {
                return Err(CortexError::not_found("Database", database_id));
            }
            for (index, record_id) in ordered_ids.iter().enumerate() {
                if !rows.set_record_order(database_id, record_id, index as i64)? {
                    return Err(CortexError::not_found("Record", record_id));
                }
            }
            rows.touch_database(database_id, Utc::now())
        })
    }

    /// Drag-reorder from a view. Refused while the view has sorts.
    pub fn reorder_view_records(
        &self,
        database_id: &str,
        view_id: &str,
        ordered_ids: &[String],
    ) -> Result<()> {
        let view = self.get_view(database_id, view_id)?;
        if !view.sorts.is_empty() {
            return Err(CortexError::InvalidOperation(format!(
                "view '{}' is sorted; manual reordering is disabled",
                view.name
            )));
        }
        self.reorder_records(database_id, ordered_ids)
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn get_view(&self, database_id: &str, view_id: &str) -> Result<View> {
        if self.rows.get_database_row(database_id)?.is_none() {
            return Err(CortexError::not_found("Database", database_id));
        }
        self.rows
            .get_view(database_id, view_id)?
            .ok_or_else(|| CortexError::not_found("View", view_id))
    }

    /// Add a view. Without explicit visible fields every field is shown.
    pub fn add_view(&self, database_id: &str, new: NewView) -> Result<View> {
        let database = self.get_database(database_id)?;
        if new.name.trim().is_empty() {
            return Err(CortexError::Validation("View name must not be empty".into()));
        }
        let view = View {
            id: ids::generate(IdStrategy::Uuid),
            name: new.name.trim().to_string(),
            config: new.config,
            filters: new.filters,
            sorts: new.sorts,
            visible_fields: new.visible_fields.unwrap_or_else(|| database.field_ids()),
        };
        self.check_view(&database, &view)?;

        self.rows.with_transaction(|rows| {
            rows.upsert_view(database_id, &view)?;
            rows.touch_database(database_id, Utc::now())
        })?;
        log::info!(
            "added {:?} view '{}' to '{}'",
            view.view_type(),
            view.name,
            database.name
        );
        Ok(view)
    }

    pub fn update_view(&self, database_id: &str, view_id: &str, patch: ViewPatch) -> Result<View> {
        let database = self.get_database(database_id)?;
        let mut view = database
            .view(view_id)
            .cloned()
            .ok_or_else(|| CortexError::not_found("View", view_id))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(CortexError::Validation("View name must not be empty".into()));
            }
            view.name = name.trim().to_string();
        }
        if let Some(config) = patch.config {
            view.config = config;
        }
        if let Some(filters) = patch.filters {
            view.filters = filters;
        }
        if let Some(sorts) = patch.sorts {
            view.sorts = sorts;
        }
        if let Some(visible_fields) = patch.visible_fields {
            view.visible_fields = visible_fields;
        }
        self.check_view(&database, &view)?;

        self.rows.with_transaction(|rows| {
            rows.upsert_view(database_id, &view)?;
            rows.touch_database(database_id, Utc::now())
        })?;
        Ok(view)
    }

    fn check_view(&self, database: &Database, view: &View) -> Result<()> {
        validation::check_view_references(database, view)?;
        match &view.config {
            // Only cards look outside this database
            ViewConfig::Cards { .. } => {
                validation::check_view_config(database, &view.config, &self.catalog()?)
            }
            _ => validation::check_view_config(database, &view.config, &Catalog::default()),
        }
    }

    /// Delete a view. The last view of a database cannot be deleted.
    pub fn delete_view(&self, database_id: &str, view_id: &str) -> Result<()> {
        self.rows.with_transaction(|rows| {
            let view = self.get_view(database_id, view_id)?;
            if rows.count_views(database_id)? <= 1 {
                return Err(CortexError::InvalidOperation(format!(
                    "cannot delete '{}', the last view of its database",
                    view.name
                )));
            }
            rows.delete_view(database_id, view_id)?;
            rows.touch_database(database_id, Utc::now())
        })
    }

    /// Compute a view's state for the local calendar day.
    pub fn compute_view(&self, database_id: &str, view_id: &str) -> Result<ViewState> {
        self.compute_for(database_id, view_id, DayWindow::current())
    }

    /// Compute a view's state as of `today`.
    pub fn compute_view_on(
        &self,
        database_id: &str,
        view_id: &str,
        today: NaiveDate,
    ) -> Result<ViewState> {
        self.compute_for(database_id, view_id, DayWindow::new(today))
    }

    fn compute_for(&self, database_id: &str, view_id: &str, days: DayWindow) -> Result<ViewState> {
        let catalog = self.catalog()?;
        let database = catalog
            .get(database_id)
            .ok_or_else(|| CortexError::not_found("Database", database_id))?;
        let view = database
            .view(view_id)
            .ok_or_else(|| CortexError::not_found("View", view_id))?;
        view::compute(database, view, &catalog, days)
    }

    /// Flip a record's checkbox in a todo view.
    pub fn toggle_todo(&self, database_id: &str, view_id: &str, record_id: &str) -> Result<Record> {
        self.rows.with_transaction(|_| {
            let database = self.get_database(database_id)?;
            let view = database
                .view(view_id)
                .ok_or_else(|| CortexError::not_found("View", view_id))?;
            let ViewConfig::Todo { todo_config } = &view.config else {
                return Err(CortexError::InvalidOperation(format!(
                    "view '{}' is not a todo view",
                    view.name
                )));
            };
            let record = database
                .record(record_id)
                .cloned()
                .ok_or_else(|| CortexError::not_found("Record", record_id))?;

            let field_id = todo_config.checkbox_field_id.clone();
            let value = toggled_value(&record, &field_id);
            self.patch_record(&database, record, Values::from([(field_id, value)]))
        })
    }

    /// Toggle a habit for the local calendar day.
    pub fn toggle_habit(&self, database_id: &str, view_id: &str, record_id: &str) -> Result<HabitToggle> {
        self.toggle_in_window(database_id, view_id, record_id, DayWindow::current())
    }

    /// Toggle a habit as of `today`.
    pub fn toggle_habit_on(
        &self,
        database_id: &str,
        view_id: &str,
        record_id: &str,
        today: NaiveDate,
    ) -> Result<HabitToggle> {
        self.toggle_in_window(database_id, view_id, record_id, DayWindow::new(today))
    }

    /// The record's streak and the view's perfect streak are read and written
    /// in one transaction.
    fn toggle_in_window(
        &self,
        database_id: &str,
        view_id: &str,
        record_id: &str,
        days: DayWindow,
    ) -> Result<HabitToggle> {
        self.rows.with_transaction(|rows| {
            let database = self.get_database(database_id)?;
            let view = database
                .view(view_id)
                .ok_or_else(|| CortexError::not_found("View", view_id))?;
            let ViewConfig::MyDay { my_day_config } = &view.config else {
                return Err(CortexError::InvalidOperation(format!(
                    "view '{}' is not a my_day view",
                    view.name
                )));
            };
            validation::check_view_config(&database, &view.config, &Catalog::default())?;
            let record = database
                .record(record_id)
                .cloned()
                .ok_or_else(|| CortexError::not_found("Record", record_id))?;

            let pending: Vec<&str> = view::prepare(&database, view)
                .records
                .into_iter()
                .filter(|r| !HabitStreak::read(r, my_day_config).completed_today(days))
                .map(|r| r.id.as_str())
                .collect();

            let current = HabitStreak::read(&record, my_day_config);
            let next = toggle_streak(current, days);
            let completing = !current.completed_today(days);
            let last_pending = completing && pending == [record_id];

            let partial = Values::from([
                (
                    my_day_config.date_field_id.clone(),
                    next.last_completed.map_or(Value::Null, Value::from),
                ),
                (
                    my_day_config.streak_field_id.clone(),
                    Value::Number(next.streak as f64),
                ),
            ]);
            let record = self.patch_record(&database, record, partial)?;

            let mut perfect = PerfectStreak::from_config(my_day_config);
            if last_pending {
                let recorded = record_perfect_day(perfect, days);
                if recorded != perfect {
                    let mut config = my_day_config.clone();
                    recorded.apply_to(&mut config);
                    let mut updated = view.clone();
                    updated.config = ViewConfig::MyDay {
                        my_day_config: config,
                    };
                    rows.upsert_view(database_id, &updated)?;
                    log::info!(
                        "perfect day in '{}': streak {}",
                        view.name,
                        recorded.count
                    );
                }
                perfect = recorded;
            }

            Ok(HabitToggle {
                completed_today: next.completed_today(days),
                streak: next,
                record,
                perfect_streak: perfect,
                perfect_day: last_pending,
            })
        })
    }

    /// Create a child record in a cards view's source database, already
    /// linked to `parent_id`.
    pub fn quick_add_card(
        &self,
        database_id: &str,
        view_id: &str,
        parent_id: &str,
        mut values: Values,
    ) -> Result<Record> {
        self.rows.with_transaction(|_| {
            let database = self.get_database(database_id)?;
            let view = database
                .view(view_id)
                .ok_or_else(|| CortexError::not_found("View", view_id))?;
            let ViewConfig::Cards { cards_config } = &view.config else {
                return Err(CortexError::InvalidOperation(format!(
                    "view '{}' is not a cards view",
                    view.name
                )));
            };
            if database.record(parent_id).is_none() {
                return Err(CortexError::not_found("Record", parent_id));
            }
            let catalog = self.catalog()?;
            validation::check_view_config(&database, &view.config, &catalog)?;
            let source = catalog
                .get(&cards_config.source_database_id)
                .ok_or_else(|| CortexError::not_found("Database", &cards_config.source_database_id))?;
            let group_by = source
                .field(&cards_config.group_by_field_id)
                .ok_or_else(|| CortexError::not_found("Field", &cards_config.group_by_field_id))?;

            values.insert(group_by.id.clone(), relation_value(group_by, parent_id));
            self.add_record(&source.id, values)
        })
    }

    // ── Bulk ─────────────────────────────────────────────────────────

    pub fn export_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(self.rows.load_all()?))
    }

    /// Import a snapshot in one transaction.
    pub fn import_snapshot(&self, incoming: &Snapshot, mode: ImportMode) -> Result<ImportReport> {
        self.rows
            .with_transaction(|rows| snapshot::apply(rows, incoming, mode, default_view))
    }

    /// Add a record pre-filled from an external metadata search result.
    pub fn add_record_from_metadata(
        &self,
        database_id: &str,
        candidate: &MetadataCandidate,
    ) -> Result<Record> {
        let database = self.get_database(database_id)?;
        let values = map_candidate(&database, candidate);
        log::debug!(
            "mapped '{}' onto {} fields of '{}'",
            candidate.title,
            values.len(),
            database.name
        );
        self.add_record(database_id, values)
    }

    /// Get status information: location, strictness and per-database counts.
    pub fn status(&self) -> Result<serde_json::Value> {
        let databases = self.rows.load_all()?;
        let summary: Vec<serde_json::Value> = databases
            .iter()
            .map(|db| {
                serde_json::json!({
                    "id": db.id,
                    "name": db.name,
                    "fields": db.fields.len(),
                    "records": db.records.len(),
                    "views": db.views.len(),
                    "updatedAt": db.updated_at,
                })
            })
            .collect();

        Ok(serde_json::json!({
            "path": self.config.path.as_ref().map(|p| p.display().to_string()),
            "strict": self.config.strict,
            "databases": summary,
            "totalRecords": databases.iter().map(|db| db.records.len()).sum::<usize>(),
        }))
    }

    fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::new(self.rows.load_all()?))
    }
}

/// The table view showing every field, used for new and view-less databases.
fn default_view(database: &Database) -> View {
    View {
        id: ids::generate(IdStrategy::Uuid),
        name: DEFAULT_VIEW_NAME.to_string(),
        config: ViewConfig::Table,
        filters: Vec::new(),
        sorts: Vec::new(),
        visible_fields: database.field_ids(),
    }
}

/// Assign missing option ids and reject duplicates.
fn prepare_field(field: &mut Field) -> Result<()> {
    let Some(options) = field.options.as_mut() else {
        return Ok(());
    };
    let mut seen = HashSet::new();
    for option in options.iter_mut() {
        if option.id.trim().is_empty() {
            option.id = ids::generate(IdStrategy::Nanoid);
        }
        if !seen.insert(option.id.clone()) {
            return Err(CortexError::Validation(format!(
                "Field '{}' has duplicate option id '{}'",
                field.name, option.id
            )));
        }
    }
    Ok(())
}

/// Nulls clear their key; keys of unknown fields are never stored.
fn retain_known(database: &Database, record: &mut Record) {
    record
        .values
        .retain(|key, value| !value.is_null() && database.field(key).is_some());
}
