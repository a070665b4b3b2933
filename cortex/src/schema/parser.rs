use crate::error::Result;
use super::types::{FieldType, NewField, SelectOption};
use super::views::{SortDirection, ViewType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete database definition loaded from YAML, with views referring
/// to fields by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldTemplate>,
    #[serde(default)]
    pub views: Vec<ViewTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<OptionTemplate>,
    /// Target database id or name, for relation fields.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub multiple: bool,
}

/// Options may be written as a bare label or as `{label, color}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionTemplate {
    Label(String),
    Full {
        label: String,
        #[serde(default)]
        color: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub view_type: ViewType,
    #[serde(default)]
    pub checkbox_field: Option<String>,
    #[serde(default)]
    pub show_completed: Option<bool>,
    #[serde(default)]
    pub date_field: Option<String>,
    #[serde(default)]
    pub streak_field: Option<String>,
    #[serde(default)]
    pub image_field: Option<String>,
    #[serde(default)]
    pub source_database: Option<String>,
    #[serde(default)]
    pub group_by_field: Option<String>,
    #[serde(default)]
    pub sorts: Vec<SortTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortTemplate {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl FieldTemplate {
    /// The field input with the relation target already resolved to an id.
    pub fn to_new_field(&self, relation_target: Option<String>) -> NewField {
        let mut field = NewField::new(self.name.clone(), self.field_type);
        field.required = self.required;
        if self.field_type.has_options() {
            field.options = Some(
                self.options
                    .iter()
                    .map(|o| match o {
                        OptionTemplate::Label(label) => SelectOption {
                            id: String::new(),
                            label: label.clone(),
                            color: "gray".into(),
                        },
                        OptionTemplate::Full { label, color } => SelectOption {
                            id: String::new(),
                            label: label.clone(),
                            color: color.clone().unwrap_or_else(|| "gray".into()),
                        },
                    })
                    .collect(),
            );
        }
        if let Some(target) = relation_target {
            field = field.with_relation(target, self.multiple);
        }
        field
    }
}

/// Parse a database template file.
pub fn parse_template(path: &Path) -> Result<DatabaseTemplate> {
    let content = std::fs::read_to_string(path)?;
    parse_template_str(&content)
}

/// Parse a database template from a YAML string.
pub fn parse_template_str(content: &str) -> Result<DatabaseTemplate> {
    let template: DatabaseTemplate = serde_yaml::from_str(content)?;
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let template = parse_template_str(
            r#"
name: Habits
icon: sun
fields:
  - { name: Name, type: text, required: true }
  - { name: Last done, type: date }
  - { name: Streak, type: number }
  - name: Area
    type: select
    options: [Health, { label: Work, color: blue }]
views:
  - { name: Today, type: my_day, date_field: Last done, streak_field: Streak }
  - name: By streak
    type: table
    sorts: [{ field: Streak, direction: desc }]
"#,
        )
        .unwrap();

        assert_eq!(template.name, "Habits");
        assert_eq!(template.fields.len(), 4);
        assert!(template.fields[0].required);
        assert_eq!(template.views[0].view_type, ViewType::MyDay);
        assert_eq!(template.views[1].sorts[0].direction, SortDirection::Desc);

        let area = template.fields[3].to_new_field(None);
        let options = area.options.unwrap();
        assert_eq!(options[0].label, "Health");
        assert_eq!(options[1].color, "blue");
    }

    #[test]
    fn test_relation_field_template() {
        let template = parse_template_str(
            "name: Tasks\nfields:\n  - { name: Project, type: relation, target: Projects }\n",
        )
        .unwrap();
        let field = template.fields[0].to_new_field(Some("db-projects".into()));
        let config = field.relation_config.unwrap();
        assert_eq!(config.database_id, "db-projects");
        assert!(!config.multiple);
    }

    #[test]
    fn test_invalid_field_type_rejected() {
        let result = parse_template_str("name: X\nfields:\n  - { name: A, type: blob }\n");
        assert!(result.is_err());
    }
}
