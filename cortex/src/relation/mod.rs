// Relation resolver - display names and cross-database lookups

use crate::record::{Record, Value};
use crate::schema::{Database, Field, FieldType};
use serde::Serialize;
use std::collections::HashMap;

/// Id-addressed lookup table over every loaded database.
///
/// Relations are plain ids; nothing holds a reference into another database,
/// so cycles between databases are harmless.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    databases: HashMap<String, Database>,
}

impl Catalog {
    pub fn new(databases: impl IntoIterator<Item = Database>) -> Self {
        Catalog {
            databases: databases.into_iter().map(|db| (db.id.clone(), db)).collect(),
        }
    }

    pub fn get(&self, database_id: &str) -> Option<&Database> {
        self.databases.get(database_id)
    }

    pub fn insert(&mut self, database: Database) {
        self.databases.insert(database.id.clone(), database);
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Look up a record in another database. Dangling ids resolve to `None`.
    pub fn record(&self, database_id: &str, record_id: &str) -> Option<&Record> {
        self.get(database_id).and_then(|db| db.record(record_id))
    }
}

/// One resolved (or dangling) reference of a relation value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationBadge {
    pub record_id: String,
    /// `None` when the target database or record no longer exists.
    pub label: Option<String>,
}

impl RelationBadge {
    pub fn is_resolved(&self) -> bool {
        self.label.is_some()
    }
}

/// The ids held by a relation value, whether single or multiple.
pub fn relation_ids(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::Text(id)) if !id.is_empty() => vec![id.as_str()],
        Some(Value::List(ids)) => ids.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Value to store for a relation pointing at `target_id`, shaped by `multiple`.
pub fn relation_value(field: &Field, target_id: &str) -> Value {
    if field.is_multiple_relation() {
        Value::list([target_id])
    } else {
        Value::text(target_id)
    }
}

/// Display name of a record: its "name"/"title" field, then the first text
/// field with a value, then a synthetic `Record xxxxxx` label.
pub fn display_name(database: &Database, record: &Record) -> String {
    let titled = database
        .fields
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case("name") || f.name.eq_ignore_ascii_case("title"));

    if let Some(text) = titled.and_then(|f| present_text(record, f)) {
        return text;
    }

    database
        .fields
        .iter()
        .filter(|f| f.field_type == FieldType::Text)
        .find_map(|f| present_text(record, f))
        .unwrap_or_else(|| synthetic_label(&record.id))
}

/// Resolve a record id in `target` to its display name. Missing database or
/// record yields `None`.
pub fn resolve_display_name(target: Option<&Database>, record_id: &str) -> Option<String> {
    let database = target?;
    let record = database.record(record_id)?;
    Some(display_name(database, record))
}

/// Badges for every id in a relation field's value on `record`.
pub fn resolve_relation(catalog: &Catalog, field: &Field, record: &Record) -> Vec<RelationBadge> {
    let Some(config) = &field.relation_config else {
        return Vec::new();
    };
    let target = catalog.get(&config.database_id);
    relation_ids(record.get(&field.id))
        .into_iter()
        .map(|id| RelationBadge {
            record_id: id.to_string(),
            label: resolve_display_name(target, id),
        })
        .collect()
}

fn present_text(record: &Record, field: &Field) -> Option<String> {
    record
        .get(&field.id)
        .filter(|v| !crate::record::is_empty(Some(v)))
        .map(Value::to_display_string)
}

fn synthetic_label(record_id: &str) -> String {
    let prefix: String = record_id.chars().take(6).collect();
    format!("Record {prefix}")
}
