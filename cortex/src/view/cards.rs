use super::Prepared;
use crate::error::{CortexError, Result};
use crate::record::{is_checked, Record};
use crate::relation::{display_name, Catalog};
use crate::schema::{CardsViewConfig, Database, FieldType};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsState {
    pub source_database_id: String,
    pub group_by_field_id: String,
    /// Checkbox field on the source database that drives progress, if any.
    pub progress_field_id: Option<String>,
    pub groups: Vec<CardGroup>,
}

/// One parent record of the current database and its children from the source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardGroup {
    pub parent: Record,
    pub title: String,
    pub children: Vec<Record>,
    pub completed: usize,
    /// `completed / children`, 0 without children. `None` without a checkbox field.
    pub progress: Option<f64>,
}

pub fn compute_cards(
    database: &Database,
    config: &CardsViewConfig,
    prepared: &Prepared<'_>,
    catalog: &Catalog,
) -> Result<CardsState> {
    let source = catalog.get(&config.source_database_id).ok_or_else(|| {
        CortexError::InvalidOperation(format!(
            "cards view source database '{}' does not exist",
            config.source_database_id
        ))
    })?;
    if source.field(&config.group_by_field_id).is_none() {
        return Err(CortexError::InvalidOperation(format!(
            "cards view group field '{}' is missing on '{}'",
            config.group_by_field_id, source.name
        )));
    }

    let progress_field = source
        .fields
        .iter()
        .find(|f| f.field_type == FieldType::Checkbox);

    let mut children_pool: Vec<&Record> = source.records.iter().collect();
    children_pool.sort_by_key(|r| r.order);

    let groups = prepared
        .records
        .iter()
        .map(|parent| {
            let children: Vec<Record> = children_pool
                .iter()
                .filter(|child| child.references(&config.group_by_field_id, &parent.id))
                .map(|child| (*child).clone())
                .collect();

            let completed = progress_field.map_or(0, |f| {
                children.iter().filter(|c| is_checked(c.get(&f.id))).count()
            });
            let progress = progress_field.map(|_| {
                if children.is_empty() {
                    0.0
                } else {
                    completed as f64 / children.len() as f64
                }
            });

            CardGroup {
                parent: (*parent).clone(),
                title: display_name(database, parent),
                children,
                completed,
                progress,
            }
        })
        .collect();

    Ok(CardsState {
        source_database_id: config.source_database_id.clone(),
        group_by_field_id: config.group_by_field_id.clone(),
        progress_field_id: progress_field.map(|f| f.id.clone()),
        groups,
    })
}
