use crate::record::{parse_day, Record, TypedValue, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::views::{FilterOperator, View};

/// A user-defined database: schema, rows and saved views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub views: Vec<View>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Database {
    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn record(&self, record_id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == record_id)
    }

    pub fn view(&self, view_id: &str) -> Option<&View> {
        self.views.iter().find(|v| v.id == view_id)
    }

    /// Case-insensitive lookup by field name.
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Resolve a field by id first, then by case-insensitive name.
    pub fn resolve_field(&self, key: &str) -> Option<&Field> {
        self.field(key).or_else(|| self.field_named(key))
    }

    pub fn field_ids(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.id.clone()).collect()
    }
}

fn default_icon() -> String {
    "database".to_string()
}

fn default_color() -> String {
    "gray".to_string()
}

/// A typed column definition within a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_config: Option<RelationConfig>,
    #[serde(default)]
    pub required: bool,
}

/// Field type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Multiselect,
    Date,
    Checkbox,
    Url,
    Email,
    Relation,
}

impl FieldType {
    pub fn has_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Multiselect)
    }

    /// Operators a filter builder may attach to a field of this type.
    /// The evaluator itself does not enforce this table.
    pub fn allowed_operators(self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            FieldType::Text | FieldType::Url | FieldType::Email => {
                &[Equals, NotEquals, Contains, NotContains, IsEmpty, IsNotEmpty]
            }
            FieldType::Number | FieldType::Date => {
                &[Equals, NotEquals, Gt, Lt, Gte, Lte, IsEmpty, IsNotEmpty]
            }
            FieldType::Select => &[Equals, NotEquals, IsEmpty, IsNotEmpty],
            FieldType::Multiselect | FieldType::Relation => {
                &[Contains, NotContains, IsEmpty, IsNotEmpty]
            }
            FieldType::Checkbox => &[Equals, NotEquals],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Date => "date",
            FieldType::Checkbox => "checkbox",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::Relation => "relation",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s.trim()).map_err(|_| format!("unknown field type '{s}'"))
    }
}

/// One choice of a select or multiselect field. The id is what records store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
}

/// Target of a relation field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationConfig {
    pub database_id: String,
    #[serde(default)]
    pub multiple: bool,
}

impl Field {
    pub fn option(&self, option_id: &str) -> Option<&SelectOption> {
        self.options
            .as_deref()
            .and_then(|opts| opts.iter().find(|o| o.id == option_id))
    }

    /// Case-insensitive lookup of an option by its label.
    pub fn option_labelled(&self, label: &str) -> Option<&SelectOption> {
        self.options.as_deref().and_then(|opts| {
            opts.iter()
                .find(|o| o.label.eq_ignore_ascii_case(label.trim()))
        })
    }

    pub fn is_multiple_relation(&self) -> bool {
        self.relation_config.as_ref().is_some_and(|c| c.multiple)
    }

    /// Interpret a stored value through this field's type.
    /// Returns `None` when the value does not fit the type.
    pub fn read<'a>(&self, value: &'a Value) -> Option<TypedValue<'a>> {
        match (self.field_type, value) {
            (FieldType::Text, Value::Text(s)) => Some(TypedValue::Text(s)),
            (FieldType::Number, Value::Number(n)) => Some(TypedValue::Number(*n)),
            (FieldType::Select, Value::Text(s)) => Some(TypedValue::OptionId(s)),
            (FieldType::Multiselect, Value::List(ids)) => Some(TypedValue::OptionIdSet(ids)),
            (FieldType::Date, Value::Text(s)) => parse_day(s).map(TypedValue::DateIso),
            (FieldType::Checkbox, Value::Bool(b)) => Some(TypedValue::Bool(*b)),
            (FieldType::Checkbox, Value::Text(s)) if s == "true" || s == "false" => {
                Some(TypedValue::Bool(s == "true"))
            }
            (FieldType::Url, Value::Text(s)) => Some(TypedValue::Url(s)),
            (FieldType::Email, Value::Text(s)) => Some(TypedValue::Email(s)),
            (FieldType::Relation, Value::Text(s)) if !self.is_multiple_relation() => {
                Some(TypedValue::RelationId(s))
            }
            (FieldType::Relation, Value::List(ids)) if self.is_multiple_relation() => {
                Some(TypedValue::RelationIds(ids))
            }
            _ => None,
        }
    }
}

/// Input for creating a field. The id is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Option<Vec<SelectOption>>,
    #[serde(default)]
    pub relation_config: Option<RelationConfig>,
    #[serde(default)]
    pub required: bool,
}

impl NewField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        NewField {
            name: name.into(),
            field_type,
            options: None,
            relation_config: None,
            required: false,
        }
    }

    pub fn with_options<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(
            labels
                .into_iter()
                .map(|label| SelectOption {
                    id: String::new(),
                    label: label.into(),
                    color: default_color(),
                })
                .collect(),
        );
        self
    }

    pub fn with_relation(mut self, database_id: impl Into<String>, multiple: bool) -> Self {
        self.relation_config = Some(RelationConfig {
            database_id: database_id.into(),
            multiple,
        });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Partial update of a field. Absent members are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub options: Option<Vec<SelectOption>>,
    #[serde(default)]
    pub relation_config: Option<RelationConfig>,
    #[serde(default)]
    pub required: Option<bool>,
}

/// Input for creating a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDatabase {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
}

impl NewDatabase {
    pub fn named(name: impl Into<String>) -> Self {
        NewDatabase {
            name: name.into(),
            description: None,
            icon: default_icon(),
            color: default_color(),
        }
    }
}

/// Partial update of a database's own attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabasePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn field(field_type: FieldType) -> Field {
        Field {
            id: "f".into(),
            name: "F".into(),
            field_type,
            options: None,
            relation_config: None,
            required: false,
        }
    }

    #[test]
    fn test_field_type_from_str() {
        assert_eq!("multiselect".parse::<FieldType>(), Ok(FieldType::Multiselect));
        assert_eq!(" url ".parse::<FieldType>(), Ok(FieldType::Url));
        assert!("blob".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_read_typed_values() {
        let date = field(FieldType::Date);
        assert_eq!(
            date.read(&Value::text("2026-01-02")),
            Some(TypedValue::DateIso(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()))
        );
        assert_eq!(date.read(&Value::Number(3.0)), None);

        let checkbox = field(FieldType::Checkbox);
        assert_eq!(checkbox.read(&Value::text("true")), Some(TypedValue::Bool(true)));
        assert_eq!(checkbox.read(&Value::text("yes")), None);

        let mut relation = field(FieldType::Relation);
        relation.relation_config = Some(RelationConfig {
            database_id: "db".into(),
            multiple: true,
        });
        assert!(matches!(
            relation.read(&Value::list(["a"])),
            Some(TypedValue::RelationIds(_))
        ));
        assert_eq!(relation.read(&Value::text("a")), None);
    }

    #[test]
    fn test_allowed_operators() {
        assert!(FieldType::Text
            .allowed_operators()
            .contains(&FilterOperator::Contains));
        assert!(!FieldType::Checkbox
            .allowed_operators()
            .contains(&FilterOperator::Gt));
    }

    #[test]
    fn test_field_deserializes_camel_case() {
        let f: Field = serde_json::from_str(
            r#"{"id":"f1","name":"Project","type":"relation","relationConfig":{"databaseId":"db1","multiple":false}}"#,
        )
        .unwrap();
        assert_eq!(f.field_type, FieldType::Relation);
        assert_eq!(f.relation_config.unwrap().database_id, "db1");
        assert!(!f.required);
    }
}
