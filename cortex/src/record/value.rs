// Record values - the dynamic per-field value bag and its loose coercions

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A raw value stored in a record under a field id.
///
/// The representation is whatever the interchange JSON can carry. Use
/// [`crate::schema::Field::read`] to get a typed view for a specific field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

/// A value interpreted through its field's type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue<'a> {
    Text(&'a str),
    Number(f64),
    OptionId(&'a str),
    OptionIdSet(&'a [String]),
    DateIso(NaiveDate),
    Bool(bool),
    Url(&'a str),
    Email(&'a str),
    RelationId(&'a str),
    RelationIds(&'a [String]),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// String form used by substring filters and display.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::List(items) => items.join(","),
        }
    }

    /// Numeric coercion. Non-numeric input yields NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::Number(n) => *n,
            Value::Text(s) => parse_numeric_text(s),
            Value::List(items) => match items.as_slice() {
                [] => 0.0,
                [only] => parse_numeric_text(only),
                _ => f64::NAN,
            },
        }
    }

    /// Date portion of a text value, accepting `YYYY-MM-DD` or RFC 3339.
    pub fn to_date(&self) -> Option<NaiveDate> {
        self.as_str().and_then(parse_day)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Text(d.format("%Y-%m-%d").to_string())
    }
}

/// True for absent, null and empty-string values.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Text(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// True for absent or null values. Empty strings are present.
pub fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Checkbox truthiness: only `true` and the text `"true"` count as done.
pub fn is_checked(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Text(s)) => s == "true",
        _ => false,
    }
}

/// Numeric coercion of an optional value; absent is NaN.
pub fn number_of(value: Option<&Value>) -> f64 {
    value.map_or(f64::NAN, Value::to_number)
}

/// Total ordering used by sorting.
///
/// Values rank by kind first (null, bool, number, then text and lists), and
/// compare within a kind. Text and lists compare by display string. NaN sorts
/// after every other number.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    kind_rank(a).cmp(&kind_rank(b)).then_with(|| match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(*x, *y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::List(_) | Value::Text(_), Value::List(_) | Value::Text(_)) => {
            a.to_display_string().cmp(&b.to_display_string())
        }
        _ => Ordering::Equal,
    })
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::Text(_) | Value::List(_) => 3,
    }
}

fn compare_numbers(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Parse a day from `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn parse_numeric_text(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    // Rust accepts "inf" and "nan" spellings that are not numbers here
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_deserialization() {
        let raw = r#"[null, true, 3, 2.5, "o1", ["a", "b"]]"#;
        let values: Vec<Value> = serde_json::from_str(raw).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(3.0),
                Value::Number(2.5),
                Value::text("o1"),
                Value::list(["a", "b"]),
            ]
        );
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Number(3.0).to_display_string(), "3");
        assert_eq!(Value::Number(3.5).to_display_string(), "3.5");
        assert_eq!(Value::Bool(false).to_display_string(), "false");
        assert_eq!(Value::list(["a", "b"]).to_display_string(), "a,b");
        assert_eq!(Value::Null.to_display_string(), "");
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(Value::text(" 12 ").to_number(), 12.0);
        assert_eq!(Value::text("").to_number(), 0.0);
        assert!(Value::text("abc").to_number().is_nan());
        assert!(Value::text("inf").to_number().is_nan());
        assert_eq!(Value::text("1e3").to_number(), 1000.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert!(Value::list(["1", "2"]).to_number().is_nan());
        assert!(number_of(None).is_nan());
    }

    #[test]
    fn test_emptiness() {
        assert!(is_empty(None));
        assert!(is_empty(Some(&Value::Null)));
        assert!(is_empty(Some(&Value::text(""))));
        assert!(!is_empty(Some(&Value::Bool(false))));
        assert!(!is_empty(Some(&Value::list(Vec::<String>::new()))));
        assert!(!is_missing(Some(&Value::text(""))));
    }

    #[test]
    fn test_is_checked() {
        assert!(is_checked(Some(&Value::Bool(true))));
        assert!(is_checked(Some(&Value::text("true"))));
        assert!(!is_checked(Some(&Value::text("yes"))));
        assert!(!is_checked(None));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&Value::Number(2.0), &Value::Number(10.0)), Ordering::Less);
        assert_eq!(compare_values(&Value::text("10"), &Value::text("2")), Ordering::Less);
        assert_eq!(compare_values(&Value::Number(10.0), &Value::text("2")), Ordering::Less);
        assert_eq!(compare_values(&Value::text("x"), &Value::Number(1.0)), Ordering::Greater);
        assert_eq!(compare_values(&Value::Bool(true), &Value::Number(0.0)), Ordering::Less);
        assert_eq!(compare_values(&Value::Number(f64::NAN), &Value::Number(1e9)), Ordering::Greater);
        assert_eq!(compare_values(&Value::Number(f64::NAN), &Value::Number(f64::NAN)), Ordering::Equal);
    }

    #[test]
    fn test_parse_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        assert_eq!(parse_day("2026-03-04"), Some(day));
        assert_eq!(parse_day("2026-03-04T22:10:00Z"), Some(day));
        assert_eq!(parse_day("2026-03-04T08:00:00.000"), Some(day));
        assert_eq!(parse_day("yesterday"), None);
    }
}
