// Query engine - filter and sort evaluation over a database's records

use crate::record::{compare_values, is_empty, is_missing, number_of, Record, Value};
use crate::schema::{Field, FilterCondition, FilterOperator, SortCondition, SortDirection, View};
use std::cmp::Ordering;

/// Apply a view's filters (as a conjunction) and sorts to `records`.
///
/// With no sorts, records come back in ascending manual `order`. Operator and
/// field type compatibility is not re-checked here.
pub fn evaluate<'a>(records: &'a [Record], _fields: &[Field], view: &View) -> Vec<&'a Record> {
    let mut matched: Vec<&Record> = records
        .iter()
        .filter(|r| matches_all(r, &view.filters))
        .collect();
    sort_records(&mut matched, &view.sorts);
    matched
}

pub fn matches_all(record: &Record, filters: &[FilterCondition]) -> bool {
    filters.iter().all(|f| matches_filter(record, f))
}

/// Evaluate a single condition against a record's raw value.
pub fn matches_filter(record: &Record, condition: &FilterCondition) -> bool {
    let v = record.get(&condition.field_id);
    let c = condition.value.as_ref();

    match condition.operator {
        FilterOperator::Equals => strict_equals(v, c),
        FilterOperator::NotEquals => !strict_equals(v, c),
        FilterOperator::Contains => contains_ignore_case(v, c),
        FilterOperator::NotContains => !contains_ignore_case(v, c),
        FilterOperator::IsEmpty => is_empty(v),
        FilterOperator::IsNotEmpty => !is_empty(v),
        // NaN on either side makes every comparison false
        FilterOperator::Gt => number_of(v) > number_of(c),
        FilterOperator::Lt => number_of(v) < number_of(c),
        FilterOperator::Gte => number_of(v) >= number_of(c),
        FilterOperator::Lte => number_of(v) <= number_of(c),
    }
}

fn strict_equals(v: Option<&Value>, c: Option<&Value>) -> bool {
    match (v, c) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn contains_ignore_case(v: Option<&Value>, c: Option<&Value>) -> bool {
    let haystack = v.map(Value::to_display_string).unwrap_or_default();
    let needle = c.map(Value::to_display_string).unwrap_or_default();
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Sort in place. Stable, so full ties keep their incoming order.
pub fn sort_records(records: &mut [&Record], sorts: &[SortCondition]) {
    if sorts.is_empty() {
        records.sort_by_key(|r| r.order);
        return;
    }
    records.sort_by(|a, b| compare_records(a, b, sorts));
}

/// Multi-key comparator. A missing value always sorts after a present one,
/// whichever the direction.
pub fn compare_records(a: &Record, b: &Record, sorts: &[SortCondition]) -> Ordering {
    for sort in sorts {
        let av = a.get(&sort.field_id);
        let bv = b.get(&sort.field_id);

        let a_missing = is_missing(av);
        let b_missing = is_missing(bv);
        if a_missing && b_missing {
            continue;
        }
        if a_missing {
            return Ordering::Greater;
        }
        if b_missing {
            return Ordering::Less;
        }

        let (Some(av), Some(bv)) = (av, bv) else {
            continue;
        };
        let ord = compare_values(av, bv);
        if ord == Ordering::Equal {
            continue;
        }
        return match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Values;
    use crate::schema::ViewConfig;
    use chrono::Utc;

    fn record(id: &str, order: i64, values: &[(&str, Value)]) -> Record {
        let now = Utc::now();
        Record {
            id: id.into(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Values>(),
            order,
            created_at: now,
            updated_at: now,
        }
    }

    fn view(filters: Vec<FilterCondition>, sorts: Vec<SortCondition>) -> View {
        View {
            id: "v".into(),
            name: "All".into(),
            config: ViewConfig::Table,
            filters,
            sorts,
            visible_fields: Vec::new(),
        }
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_no_sorts_uses_manual_order() {
        let records = vec![
            record("c", 2, &[]),
            record("a", 0, &[]),
            record("b", 1, &[]),
        ];
        let result = evaluate(&records, &[], &view(vec![], vec![]));
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_equals_is_strict() {
        let records = vec![
            record("n", 0, &[("f", Value::Number(1.0))]),
            record("t", 1, &[("f", Value::text("1"))]),
        ];
        let cond = FilterCondition::new("f", FilterOperator::Equals, Some(Value::text("1")));
        let result = evaluate(&records, &[], &view(vec![cond], vec![]));
        assert_eq!(ids(&result), vec!["t"]);
    }

    #[test]
    fn test_equals_null_matches_stored_null_only() {
        let records = vec![
            record("absent", 0, &[]),
            record("null", 1, &[("f", Value::Null)]),
        ];
        let cond: FilterCondition =
            serde_json::from_str(r#"{"fieldId": "f", "operator": "equals", "value": null}"#).unwrap();
        assert_eq!(ids(&evaluate(&records, &[], &view(vec![cond], vec![]))), vec!["null"]);
    }

    #[test]
    fn test_contains_case_insensitive() {
        let records = vec![
            record("a", 0, &[("f", Value::text("Hello World"))]),
            record("b", 1, &[("f", Value::text("bye"))]),
            record("c", 2, &[]),
        ];
        let contains = FilterCondition::new("f", FilterOperator::Contains, Some(Value::text("WORLD")));
        assert_eq!(ids(&evaluate(&records, &[], &view(vec![contains], vec![]))), vec!["a"]);

        let not_contains =
            FilterCondition::new("f", FilterOperator::NotContains, Some(Value::text("world")));
        assert_eq!(
            ids(&evaluate(&records, &[], &view(vec![not_contains], vec![]))),
            vec!["b", "c"]
        );
    }

    #[test]
    fn test_contains_without_value_matches_everything() {
        let records = vec![record("a", 0, &[]), record("b", 1, &[("f", Value::text("x"))])];
        let cond = FilterCondition::new("f", FilterOperator::Contains, None);
        assert_eq!(evaluate(&records, &[], &view(vec![cond], vec![])).len(), 2);
    }

    #[test]
    fn test_empty_partition() {
        let records = vec![
            record("absent", 0, &[]),
            record("null", 1, &[("f", Value::Null)]),
            record("blank", 2, &[("f", Value::text(""))]),
            record("zero", 3, &[("f", Value::Number(0.0))]),
            record("false", 4, &[("f", Value::Bool(false))]),
            record("list", 5, &[("f", Value::list(Vec::<String>::new()))]),
        ];
        let empty = evaluate(
            &records,
            &[],
            &view(vec![FilterCondition::new("f", FilterOperator::IsEmpty, None)], vec![]),
        );
        let not_empty = evaluate(
            &records,
            &[],
            &view(vec![FilterCondition::new("f", FilterOperator::IsNotEmpty, None)], vec![]),
        );
        assert_eq!(ids(&empty), vec!["absent", "null", "blank"]);
        assert_eq!(ids(&not_empty), vec!["zero", "false", "list"]);
        assert_eq!(empty.len() + not_empty.len(), records.len());
    }

    #[test]
    fn test_numeric_comparisons() {
        let records = vec![
            record("a", 0, &[("n", Value::Number(5.0))]),
            record("b", 1, &[("n", Value::text("12"))]),
            record("c", 2, &[("n", Value::text("abc"))]),
            record("d", 3, &[]),
        ];
        let gt = FilterCondition::new("n", FilterOperator::Gt, Some(Value::Number(6.0)));
        assert_eq!(ids(&evaluate(&records, &[], &view(vec![gt], vec![]))), vec!["b"]);

        let lte = FilterCondition::new("n", FilterOperator::Lte, Some(Value::text("5")));
        assert_eq!(ids(&evaluate(&records, &[], &view(vec![lte], vec![]))), vec!["a"]);

        let nan = FilterCondition::new("n", FilterOperator::Gte, Some(Value::text("x")));
        assert!(evaluate(&records, &[], &view(vec![nan], vec![])).is_empty());
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let records = vec![
            record("a", 0, &[("s", Value::text("o1")), ("n", Value::Number(1.0))]),
            record("b", 1, &[("s", Value::text("o1")), ("n", Value::Number(9.0))]),
        ];
        let filters = vec![
            FilterCondition::new("s", FilterOperator::Equals, Some(Value::text("o1"))),
            FilterCondition::new("n", FilterOperator::Gt, Some(Value::Number(5.0))),
        ];
        assert_eq!(ids(&evaluate(&records, &[], &view(filters, vec![]))), vec!["b"]);
    }

    #[test]
    fn test_missing_values_sort_last_in_both_directions() {
        let records = vec![
            record("none", 0, &[]),
            record("two", 1, &[("n", Value::Number(2.0))]),
            record("one", 2, &[("n", Value::Number(1.0))]),
        ];
        let asc = evaluate(&records, &[], &view(vec![], vec![SortCondition::asc("n")]));
        assert_eq!(ids(&asc), vec!["one", "two", "none"]);

        let desc = evaluate(&records, &[], &view(vec![], vec![SortCondition::desc("n")]));
        assert_eq!(ids(&desc), vec!["two", "one", "none"]);
    }

    #[test]
    fn test_secondary_sort_breaks_ties() {
        let records = vec![
            record("a", 0, &[("g", Value::text("x")), ("n", Value::Number(1.0))]),
            record("b", 1, &[("g", Value::text("y")), ("n", Value::Number(5.0))]),
            record("c", 2, &[("g", Value::text("x")), ("n", Value::Number(3.0))]),
        ];
        let sorts = vec![SortCondition::asc("g"), SortCondition::desc("n")];
        assert_eq!(ids(&evaluate(&records, &[], &view(vec![], sorts))), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_reversed_direction_keeps_ties_adjacent() {
        let records = vec![
            record("a1", 0, &[("g", Value::text("a"))]),
            record("b1", 1, &[("g", Value::text("b"))]),
            record("a2", 2, &[("g", Value::text("a"))]),
            record("b2", 3, &[("g", Value::text("b"))]),
        ];
        let asc = evaluate(&records, &[], &view(vec![], vec![SortCondition::asc("g")]));
        assert_eq!(ids(&asc), vec!["a1", "a2", "b1", "b2"]);
        let desc = evaluate(&records, &[], &view(vec![], vec![SortCondition::desc("g")]));
        assert_eq!(ids(&desc), vec!["b1", "b2", "a1", "a2"]);
    }

    #[test]
    fn test_mixed_kinds_sort_without_panicking() {
        let records: Vec<Record> = (0..240)
            .map(|i| {
                let value = match i % 4 {
                    0 => Value::text(format!("x{}", (i * 7) % 13)),
                    1 => Value::Number(((i * 31) % 17) as f64),
                    2 => Value::text(format!("{}", (i * 11) % 19)),
                    _ => Value::Bool(i % 3 == 0),
                };
                record(&format!("r{i}"), i, &[("f", value)])
            })
            .collect();

        let asc = evaluate(&records, &[], &view(vec![], vec![SortCondition::asc("f")]));
        assert_eq!(asc.len(), records.len());
        for pair in asc.windows(2) {
            assert_ne!(
                compare_values(pair[0].get("f").unwrap(), pair[1].get("f").unwrap()),
                Ordering::Greater
            );
        }

        let desc = evaluate(&records, &[], &view(vec![], vec![SortCondition::desc("f")]));
        assert!(matches!(desc[0].get("f"), Some(Value::Text(_))));
        assert!(matches!(desc.last().and_then(|r| r.get("f")), Some(Value::Bool(false))));
    }
}
