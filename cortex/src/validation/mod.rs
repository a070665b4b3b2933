use crate::error::{CortexError, Result};
use crate::record::{is_empty, parse_day, Value, Values};
use crate::relation::Catalog;
use crate::schema::{Database, Field, FieldType, View, ViewConfig};
use regex::Regex;
use std::sync::OnceLock;

/// Result of validating a record write
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/$.?#][^\s]*$").expect("valid url pattern")
    })
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern")
    })
}

/// Validate a record write against the database's fields.
///
/// `written` holds the keys of this write and is type-checked; `merged` is the
/// full value bag after the merge and is checked for required fields.
/// In non-strict mode every issue is a warning.
pub fn validate_values(
    database: &Database,
    written: &Values,
    merged: &Values,
    strict: bool,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (key, value) in written {
        match database.field(key) {
            Some(field) => {
                if !value.is_null() {
                    validate_field_value(field, value, strict, &mut result);
                }
            }
            None => add_issue(
                &mut result,
                strict,
                format!("Unknown field '{key}' in database '{}'", database.name),
            ),
        }
    }

    for field in database.fields.iter().filter(|f| f.required) {
        if is_empty(merged.get(&field.id)) {
            add_issue(
                &mut result,
                strict,
                format!("Required field '{}' is missing", field.name),
            );
        }
    }

    result
}

fn validate_field_value(field: &Field, value: &Value, strict: bool, result: &mut ValidationResult) {
    let name = &field.name;
    match field.field_type {
        FieldType::Text => expect_kind(field, value, matches!(value, Value::Text(_)), strict, result),
        FieldType::Number => {
            expect_kind(field, value, matches!(value, Value::Number(_)), strict, result)
        }
        FieldType::Checkbox => {
            let ok = matches!(value, Value::Bool(_))
                || matches!(value, Value::Text(s) if s == "true" || s == "false");
            expect_kind(field, value, ok, strict, result);
        }
        FieldType::Select => match value {
            Value::Text(id) => {
                if field.options.is_some() && field.option(id).is_none() {
                    add_issue(
                        result,
                        strict,
                        format!("Field '{name}' has no option with id '{id}'"),
                    );
                }
            }
            _ => expect_kind(field, value, false, strict, result),
        },
        FieldType::Multiselect => match value {
            Value::List(ids) => {
                for id in ids {
                    if field.option(id).is_none() {
                        add_issue(
                            result,
                            strict,
                            format!("Field '{name}' has no option with id '{id}'"),
                        );
                    }
                }
            }
            _ => expect_kind(field, value, false, strict, result),
        },
        FieldType::Date => match value {
            Value::Text(s) if s.is_empty() || parse_day(s).is_some() => {}
            Value::Text(s) => add_issue(
                result,
                strict,
                format!("Field '{name}' expected a date, got '{s}'"),
            ),
            _ => expect_kind(field, value, false, strict, result),
        },
        FieldType::Url => check_pattern(field, value, url_pattern(), "URL", strict, result),
        FieldType::Email => check_pattern(field, value, email_pattern(), "email address", strict, result),
        FieldType::Relation => {
            let ok = if field.is_multiple_relation() {
                matches!(value, Value::List(_))
            } else {
                matches!(value, Value::Text(_))
            };
            expect_kind(field, value, ok, strict, result);
        }
    }
}

fn expect_kind(field: &Field, value: &Value, ok: bool, strict: bool, result: &mut ValidationResult) {
    if !ok {
        add_issue(
            result,
            strict,
            format!(
                "Field '{}' ({}) cannot hold a {} value",
                field.name,
                field.field_type,
                value.kind()
            ),
        );
    }
}

fn check_pattern(
    field: &Field,
    value: &Value,
    pattern: &Regex,
    what: &str,
    strict: bool,
    result: &mut ValidationResult,
) {
    match value {
        Value::Text(s) if s.is_empty() || pattern.is_match(s) => {}
        Value::Text(s) => add_issue(
            result,
            strict,
            format!("Field '{}' expected a valid {what}, got '{s}'", field.name),
        ),
        _ => expect_kind(field, value, false, strict, result),
    }
}

fn add_issue(result: &mut ValidationResult, strict: bool, message: String) {
    if strict {
        result.errors.push(message);
    } else {
        result.warnings.push(message);
    }
}

/// Validate and report. Errors fail the write, warnings are logged.
pub fn check_values(
    database: &Database,
    written: &Values,
    merged: &Values,
    strict: bool,
) -> Result<()> {
    let result = validate_values(database, written, merged, strict);

    if !result.is_ok() {
        return Err(CortexError::Validation(format!(
            "Record validation failed:\n  - {}",
            result.errors.join("\n  - ")
        )));
    }
    for warning in &result.warnings {
        log::warn!("{}: {warning}", database.name);
    }
    Ok(())
}

/// Field definitions must be internally consistent and relations must target
/// an existing database.
pub fn check_field(field: &Field, catalog: &Catalog) -> Result<()> {
    if field.name.trim().is_empty() {
        return Err(CortexError::Validation("Field name must not be empty".into()));
    }
    if field.options.as_ref().is_some_and(|o| !o.is_empty()) && !field.field_type.has_options() {
        return Err(CortexError::Validation(format!(
            "Field '{}' of type {} cannot have options",
            field.name, field.field_type
        )));
    }
    match (field.field_type, &field.relation_config) {
        (FieldType::Relation, None) => Err(CortexError::Validation(format!(
            "Relation field '{}' needs a target database",
            field.name
        ))),
        (FieldType::Relation, Some(config)) if catalog.get(&config.database_id).is_none() => {
            Err(CortexError::Validation(format!(
                "Relation field '{}' targets missing database '{}'",
                field.name, config.database_id
            )))
        }
        _ => Ok(()),
    }
}

/// Every field a view lists must exist on the database, and each filter must
/// use an operator its field type allows.
pub fn check_view_references(database: &Database, view: &View) -> Result<()> {
    for field_id in view.referenced_fields() {
        if database.field(field_id).is_none() {
            return Err(CortexError::Validation(format!(
                "View '{}' references unknown field '{field_id}'",
                view.name
            )));
        }
    }
    for filter in &view.filters {
        if let Some(field) = database.field(&filter.field_id) {
            if !field.field_type.allowed_operators().contains(&filter.operator) {
                return Err(CortexError::Validation(format!(
                    "View '{}' filters {} field '{}' with unsupported operator {:?}",
                    view.name, field.field_type, field.name, filter.operator
                )));
            }
        }
    }
    Ok(())
}

/// A view type's config must name fields of the right type.
pub fn check_view_config(database: &Database, config: &ViewConfig, catalog: &Catalog) -> Result<()> {
    match config {
        ViewConfig::Table => Ok(()),
        ViewConfig::Todo { todo_config } => {
            require_field(database, &todo_config.checkbox_field_id, &[FieldType::Checkbox], "todo")
        }
        ViewConfig::MyDay { my_day_config } => {
            require_field(database, &my_day_config.date_field_id, &[FieldType::Date], "my_day")?;
            require_field(
                database,
                &my_day_config.streak_field_id,
                &[FieldType::Number],
                "my_day",
            )
        }
        ViewConfig::Gallery { gallery_config } => {
            require_field(database, &gallery_config.image_field_id, &[FieldType::Url], "gallery")
        }
        ViewConfig::Cards { cards_config } => {
            let source = catalog.get(&cards_config.source_database_id).ok_or_else(|| {
                CortexError::InvalidOperation(format!(
                    "cards view source database '{}' does not exist",
                    cards_config.source_database_id
                ))
            })?;
            let group_by = &cards_config.group_by_field_id;
            require_field(source, group_by, &[FieldType::Relation], "cards")?;
            let points_here = source
                .field(group_by)
                .and_then(|f| f.relation_config.as_ref())
                .is_some_and(|rc| rc.database_id == database.id);
            if points_here {
                Ok(())
            } else {
                Err(CortexError::InvalidOperation(format!(
                    "cards group field '{group_by}' does not point at database '{}'",
                    database.name
                )))
            }
        }
    }
}

fn require_field(
    database: &Database,
    field_id: &str,
    types: &[FieldType],
    view_kind: &str,
) -> Result<()> {
    match database.field(field_id) {
        Some(field) if types.contains(&field.field_type) => Ok(()),
        Some(field) => Err(CortexError::InvalidOperation(format!(
            "{view_kind} view needs a {} field, '{}' is {}",
            types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join("/"),
            field.name,
            field.field_type
        ))),
        None => Err(CortexError::InvalidOperation(format!(
            "{view_kind} view needs field '{field_id}' on database '{}'",
            database.name
        ))),
    }
}
