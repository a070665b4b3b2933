use super::Prepared;
use crate::error::{CortexError, Result};
use crate::record::{Record, Value};
use crate::relation::display_name;
use crate::schema::{Database, Field, FieldType, GalleryViewConfig};
use serde::Serialize;

/// Select fields whose names mark them as poster overlays.
const BADGE_FIELD_NAMES: [&str; 2] = ["type", "status"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryState {
    pub image_field_id: String,
    pub items: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub record: Record,
    pub title: String,
    pub image_url: Option<String>,
    pub badges: Vec<GalleryBadge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryBadge {
    pub field_id: String,
    pub label: String,
    pub color: String,
}

pub fn compute_gallery(
    database: &Database,
    config: &GalleryViewConfig,
    prepared: &Prepared<'_>,
) -> Result<GalleryState> {
    match database.field(&config.image_field_id) {
        Some(f) if f.field_type == FieldType::Url => {}
        _ => {
            return Err(CortexError::InvalidOperation(format!(
                "gallery view needs url field '{}' on '{}'",
                config.image_field_id, database.name
            )))
        }
    }

    let badge_fields: Vec<&Field> = database
        .fields
        .iter()
        .filter(|f| f.field_type == FieldType::Select)
        .filter(|f| {
            BADGE_FIELD_NAMES
                .iter()
                .any(|name| f.name.eq_ignore_ascii_case(name))
        })
        .collect();

    let items = prepared
        .records
        .iter()
        .map(|record| GalleryItem {
            record: (*record).clone(),
            title: display_name(database, record),
            image_url: record
                .get(&config.image_field_id)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            badges: badge_fields
                .iter()
                .filter_map(|f| badge(f, record))
                .collect(),
        })
        .collect();

    Ok(GalleryState {
        image_field_id: config.image_field_id.clone(),
        items,
    })
}

fn badge(field: &Field, record: &Record) -> Option<GalleryBadge> {
    let option_id = record.get(&field.id).and_then(Value::as_str)?;
    let option = field.option(option_id)?;
    Some(GalleryBadge {
        field_id: field.id.clone(),
        label: option.label.clone(),
        color: option.color.clone(),
    })
}
