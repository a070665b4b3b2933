use super::types::{Field, FieldType};
use std::collections::HashSet;

/// A single change between two versions of a field definition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Renamed { from: String, to: String },
    TypeChanged { from: FieldType, to: FieldType },
    OptionAdded { option_id: String },
    OptionRemoved { option_id: String },
    RequiredChanged { required: bool },
    RelationRetargeted { from: Option<String>, to: Option<String> },
}

impl FieldChange {
    /// Whether existing record values stay meaningful after this change.
    pub fn is_safe(&self) -> bool {
        match self {
            FieldChange::Renamed { .. } => true,
            FieldChange::OptionAdded { .. } => true,
            FieldChange::RequiredChanged { .. } => true,
            FieldChange::TypeChanged { .. } => false,
            FieldChange::OptionRemoved { .. } => false,
            FieldChange::RelationRetargeted { .. } => false,
        }
    }

    pub fn describe(&self, field: &str) -> String {
        match self {
            FieldChange::Renamed { from, to } => {
                format!("Field '{}' renamed to '{}'", from, to)
            }
            FieldChange::TypeChanged { from, to } => {
                format!(
                    "Field '{}' type changed {} -> {} (stored values are not migrated)",
                    field, from, to
                )
            }
            FieldChange::OptionAdded { option_id } => {
                format!("Option '{}' added to '{}'", option_id, field)
            }
            FieldChange::OptionRemoved { option_id } => {
                format!(
                    "Option '{}' removed from '{}' (records may still hold it)",
                    option_id, field
                )
            }
            FieldChange::RequiredChanged { required } => {
                format!("Field '{}' required = {}", field, required)
            }
            FieldChange::RelationRetargeted { from, to } => {
                format!(
                    "Relation '{}' retargeted {:?} -> {:?} (existing ids are not rewritten)",
                    field, from, to
                )
            }
        }
    }
}

/// Compare two versions of a field and list what changed.
pub fn diff_field(old: &Field, new: &Field) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if old.name != new.name {
        changes.push(FieldChange::Renamed {
            from: old.name.clone(),
            to: new.name.clone(),
        });
    }

    if old.field_type != new.field_type {
        changes.push(FieldChange::TypeChanged {
            from: old.field_type,
            to: new.field_type,
        });
    }

    let option_ids = |f: &Field| -> HashSet<String> {
        f.options
            .iter()
            .flatten()
            .map(|o| o.id.clone())
            .collect()
    };
    let old_options = option_ids(old);
    let new_options = option_ids(new);

    let mut added: Vec<_> = new_options.difference(&old_options).cloned().collect();
    added.sort();
    for option_id in added {
        changes.push(FieldChange::OptionAdded { option_id });
    }

    let mut removed: Vec<_> = old_options.difference(&new_options).cloned().collect();
    removed.sort();
    for option_id in removed {
        changes.push(FieldChange::OptionRemoved { option_id });
    }

    if old.required != new.required {
        changes.push(FieldChange::RequiredChanged {
            required: new.required,
        });
    }

    let target = |f: &Field| f.relation_config.as_ref().map(|c| c.database_id.clone());
    if target(old) != target(new) {
        changes.push(FieldChange::RelationRetargeted {
            from: target(old),
            to: target(new),
        });
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SelectOption;

    fn select(options: &[&str]) -> Field {
        Field {
            id: "f1".into(),
            name: "Status".into(),
            field_type: FieldType::Select,
            options: Some(
                options
                    .iter()
                    .map(|id| SelectOption {
                        id: id.to_string(),
                        label: id.to_uppercase(),
                        color: "gray".into(),
                    })
                    .collect(),
            ),
            relation_config: None,
            required: false,
        }
    }

    #[test]
    fn test_no_changes() {
        let f = select(&["o1"]);
        assert!(diff_field(&f, &f.clone()).is_empty());
    }

    #[test]
    fn test_option_changes() {
        let changes = diff_field(&select(&["o1", "o2"]), &select(&["o2", "o3"]));
        assert_eq!(
            changes,
            vec![
                FieldChange::OptionAdded { option_id: "o3".into() },
                FieldChange::OptionRemoved { option_id: "o1".into() },
            ]
        );
        assert!(changes[0].is_safe());
        assert!(!changes[1].is_safe());
    }

    #[test]
    fn test_type_change_is_unsafe() {
        let old = select(&[]);
        let mut new = old.clone();
        new.field_type = FieldType::Text;
        new.options = Some(Vec::new());
        let changes = diff_field(&old, &new);
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].is_safe());
        assert!(changes[0].describe("Status").contains("not migrated"));
    }
}
