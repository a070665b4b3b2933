use super::Prepared;
use crate::record::Record;
use crate::relation::{resolve_relation, Catalog, RelationBadge};
use crate::schema::{Field, FieldType, View};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    pub columns: Vec<Field>,
    pub rows: Vec<TableRow>,
    /// Manual drag-reorder only makes sense without active sorts.
    pub can_reorder: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub record: Record,
    /// Resolved badges for each visible relation column.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, Vec<RelationBadge>>,
}

pub fn compute_table(
    view: &View,
    prepared: &Prepared<'_>,
    catalog: &Catalog,
) -> TableState {
    let relation_columns: Vec<&Field> = prepared
        .visible_fields
        .iter()
        .copied()
        .filter(|f| f.field_type == FieldType::Relation)
        .collect();

    let rows = prepared
        .records
        .iter()
        .map(|record| TableRow {
            record: (*record).clone(),
            relations: relation_columns
                .iter()
                .map(|f| (f.id.clone(), resolve_relation(catalog, f, record)))
                .collect(),
        })
        .collect();

    TableState {
        columns: prepared.visible_fields.iter().map(|f| (*f).clone()).collect(),
        rows,
        can_reorder: view.sorts.is_empty(),
    }
}
