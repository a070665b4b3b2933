// Records - rows of field values with a manual order rank

mod value;

pub use value::{
    compare_values, is_checked, is_empty, is_missing, number_of, parse_day, TypedValue, Value,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest manual order a record may carry; beyond it JSON clients lose
/// integer precision.
pub const MAX_ORDER: i64 = (1 << 53) - 1;

/// Field id to value. Absent keys are empty.
pub type Values = BTreeMap<String, Value>;

/// A single row in a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub values: Values,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id)
    }

    /// Merge-patch: keys in `partial` overwrite, every other key is kept.
    pub fn merge(&mut self, partial: Values) {
        for (key, value) in partial {
            self.values.insert(key, value);
        }
    }

    /// Whether a relation value on this record points at `target_id`.
    pub fn references(&self, field_id: &str, target_id: &str) -> bool {
        match self.get(field_id) {
            Some(Value::Text(id)) => id == target_id,
            Some(Value::List(ids)) => ids.iter().any(|id| id == target_id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: Values) -> Record {
        let now = Utc::now();
        Record {
            id: "r1".into(),
            values,
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_merge_keeps_untouched_keys() {
        let mut r = record(Values::from([
            ("a".to_string(), Value::text("x")),
            ("b".to_string(), Value::Number(1.0)),
        ]));
        r.merge(Values::from([("b".to_string(), Value::Number(2.0))]));
        assert_eq!(r.get("a"), Some(&Value::text("x")));
        assert_eq!(r.get("b"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_merge_disjoint_keys_compose() {
        let mut sequential = record(Values::new());
        sequential.merge(Values::from([("a".to_string(), Value::Number(1.0))]));
        sequential.merge(Values::from([("b".to_string(), Value::Number(2.0))]));

        let mut once = record(Values::new());
        once.merge(Values::from([
            ("a".to_string(), Value::Number(1.0)),
            ("b".to_string(), Value::Number(2.0)),
        ]));

        assert_eq!(sequential.values, once.values);
    }

    #[test]
    fn test_references() {
        let r = record(Values::from([
            ("single".to_string(), Value::text("p1")),
            ("multi".to_string(), Value::list(["p2", "p3"])),
        ]));
        assert!(r.references("single", "p1"));
        assert!(r.references("multi", "p3"));
        assert!(!r.references("multi", "p1"));
        assert!(!r.references("missing", "p1"));
    }
}
