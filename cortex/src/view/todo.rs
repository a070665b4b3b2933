use super::Prepared;
use crate::error::{CortexError, Result};
use crate::record::{is_checked, Record, Value};
use crate::schema::{Database, TodoViewConfig};
use serde::Serialize;

/// Records split by the checkbox field, each side in query order.
/// `show_completed` and `completed_collapsed` are display hints only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoState {
    pub checkbox_field_id: String,
    pub incomplete: Vec<Record>,
    pub complete: Vec<Record>,
    pub show_completed: bool,
    pub completed_collapsed: bool,
}

pub fn compute_todo(
    database: &Database,
    config: &TodoViewConfig,
    prepared: &Prepared<'_>,
) -> Result<TodoState> {
    if database.field(&config.checkbox_field_id).is_none() {
        return Err(CortexError::InvalidOperation(format!(
            "todo view checkbox field '{}' is missing on '{}'",
            config.checkbox_field_id, database.name
        )));
    }

    let (complete, incomplete): (Vec<&Record>, Vec<&Record>) = prepared
        .records
        .iter()
        .copied()
        .partition(|r| is_checked(r.get(&config.checkbox_field_id)));

    Ok(TodoState {
        checkbox_field_id: config.checkbox_field_id.clone(),
        incomplete: incomplete.into_iter().cloned().collect(),
        complete: complete.into_iter().cloned().collect(),
        show_completed: config.show_completed,
        completed_collapsed: config.completed_collapsed,
    })
}

/// The checkbox value after toggling `record`.
pub fn toggled_value(record: &Record, checkbox_field_id: &str) -> Value {
    Value::Bool(!is_checked(record.get(checkbox_field_id)))
}
