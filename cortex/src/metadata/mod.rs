// Metadata mapping - pre-fill record values from an external search result

use crate::record::{Value, Values};
use crate::schema::{Database, Field, FieldType};
use serde::{Deserialize, Serialize};

/// One search result from an external metadata provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataCandidate {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Runtime in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub seasons: Option<u32>,
    #[serde(default)]
    pub director: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Title,
    Year,
    Overview,
    Rating,
    Poster,
    Genres,
    Duration,
    Seasons,
    Director,
}

const ALIASES: &[(Attribute, &[&str])] = &[
    (Attribute::Title, &["title", "name"]),
    (Attribute::Year, &["year", "release year"]),
    (Attribute::Overview, &["overview", "description", "synopsis", "plot"]),
    (Attribute::Rating, &["rating", "score"]),
    (Attribute::Poster, &["poster", "poster url", "cover", "image"]),
    (Attribute::Genres, &["genre", "genres"]),
    (Attribute::Duration, &["duration", "runtime"]),
    (Attribute::Seasons, &["seasons"]),
    (Attribute::Director, &["director"]),
];

fn attribute_for(field_name: &str) -> Option<Attribute> {
    let name = field_name.trim();
    ALIASES
        .iter()
        .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
        .map(|(attr, _)| *attr)
}

/// Raw candidate data before it is shaped for a field type.
enum Raw<'a> {
    Text(String),
    Number(f64),
    Labels(&'a [String]),
}

impl MetadataCandidate {
    fn raw(&self, attribute: Attribute) -> Option<Raw<'_>> {
        let text = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Raw::Text(s.to_string()))
        };
        match attribute {
            Attribute::Title => Some(Raw::Text(self.title.trim().to_string()))
                .filter(|_| !self.title.trim().is_empty()),
            Attribute::Year => self.year.map(|y| Raw::Number(y as f64)),
            Attribute::Overview => text(&self.overview),
            Attribute::Rating => self.rating.map(Raw::Number),
            Attribute::Poster => text(&self.poster_url),
            Attribute::Genres => Some(Raw::Labels(&self.genres)).filter(|_| !self.genres.is_empty()),
            Attribute::Duration => self.duration.map(|d| Raw::Number(d as f64)),
            Attribute::Seasons => self.seasons.map(|s| Raw::Number(s as f64)),
            Attribute::Director => text(&self.director),
        }
    }
}

/// Map a candidate onto a database's fields by case-insensitive name.
///
/// Values are shaped for each field's type; anything that cannot be shaped
/// (e.g. a genre with no matching option) is dropped.
pub fn map_candidate(database: &Database, candidate: &MetadataCandidate) -> Values {
    let mut values = Values::new();
    for field in &database.fields {
        let Some(attribute) = attribute_for(&field.name) else {
            continue;
        };
        let Some(raw) = candidate.raw(attribute) else {
            continue;
        };
        if let Some(value) = shape(field, raw) {
            values.insert(field.id.clone(), value);
        }
    }
    values
}

fn shape(field: &Field, raw: Raw<'_>) -> Option<Value> {
    match (field.field_type, raw) {
        (FieldType::Text | FieldType::Url | FieldType::Email, Raw::Text(s)) => Some(Value::Text(s)),
        (FieldType::Text, Raw::Number(n)) => Some(Value::Number(n).to_display_string().into()),
        (FieldType::Text, Raw::Labels(labels)) => Some(Value::Text(labels.join(", "))),
        (FieldType::Number, Raw::Number(n)) => Some(Value::Number(n)),
        (FieldType::Number, Raw::Text(s)) => s.parse::<f64>().ok().map(Value::Number),
        (FieldType::Date, Raw::Number(year)) if year.fract() == 0.0 => {
            Some(Value::Text(format!("{:04}-01-01", year as i64)))
        }
        (FieldType::Select, Raw::Labels(labels)) => labels
            .iter()
            .find_map(|l| field.option_labelled(l))
            .map(|o| Value::Text(o.id.clone())),
        (FieldType::Select, Raw::Text(s)) => field.option_labelled(&s).map(|o| Value::Text(o.id.clone())),
        (FieldType::Multiselect, Raw::Labels(labels)) => {
            let ids: Vec<String> = labels
                .iter()
                .filter_map(|l| field.option_labelled(l))
                .map(|o| o.id.clone())
                .collect();
            (!ids.is_empty()).then_some(Value::List(ids))
        }
        (FieldType::Multiselect, Raw::Text(s)) => field
            .option_labelled(&s)
            .map(|o| Value::List(vec![o.id.clone()])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SelectOption;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn field(id: &str, name: &str, field_type: FieldType) -> Field {
        Field {
            id: id.into(),
            name: name.into(),
            field_type,
            options: None,
            relation_config: None,
            required: false,
        }
    }

    fn options(pairs: &[(&str, &str)]) -> Option<Vec<SelectOption>> {
        Some(
            pairs
                .iter()
                .map(|(id, label)| SelectOption {
                    id: id.to_string(),
                    label: label.to_string(),
                    color: "gray".into(),
                })
                .collect(),
        )
    }

    fn movies() -> Database {
        let mut genre = field("genre", "Genre", FieldType::Multiselect);
        genre.options = options(&[("g1", "Drama"), ("g2", "Crime"), ("g3", "Comedy")]);
        let now = Utc::now();
        Database {
            id: "movies".into(),
            name: "Movies".into(),
            description: None,
            icon: "film".into(),
            color: "red".into(),
            fields: vec![
                field("title", "Title", FieldType::Text),
                field("year", "Year", FieldType::Number),
                field("plot", "Plot", FieldType::Text),
                field("poster", "Poster URL", FieldType::Url),
                genre,
                field("runtime", "Runtime", FieldType::Number),
                field("seen", "Seen", FieldType::Checkbox),
            ],
            records: Vec::new(),
            views: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn heat() -> MetadataCandidate {
        MetadataCandidate {
            title: "Heat".into(),
            year: Some(1995),
            overview: Some("A heist.".into()),
            rating: Some(8.3),
            poster_url: Some("https://img.example/heat.jpg".into()),
            genres: vec!["crime".into(), "Thriller".into(), "Drama".into()],
            duration: Some(170),
            seasons: None,
            director: Some("Michael Mann".into()),
        }
    }

    #[test]
    fn test_maps_by_alias_and_type() {
        let values = map_candidate(&movies(), &heat());
        assert_eq!(values.get("title"), Some(&Value::text("Heat")));
        assert_eq!(values.get("year"), Some(&Value::Number(1995.0)));
        assert_eq!(values.get("plot"), Some(&Value::text("A heist.")));
        assert_eq!(
            values.get("poster"),
            Some(&Value::text("https://img.example/heat.jpg"))
        );
        assert_eq!(values.get("runtime"), Some(&Value::Number(170.0)));
        assert!(!values.contains_key("seen"));
    }

    #[test]
    fn test_genres_become_option_ids() {
        let values = map_candidate(&movies(), &heat());
        assert_eq!(values.get("genre"), Some(&Value::list(["g2", "g1"])));
    }

    #[test]
    fn test_single_select_takes_first_match() {
        let mut db = movies();
        db.fields[4].field_type = FieldType::Select;
        let values = map_candidate(&db, &heat());
        assert_eq!(values.get("genre"), Some(&Value::text("g2")));
    }

    #[test]
    fn test_unmatched_genres_dropped() {
        let candidate = MetadataCandidate {
            title: "Alien".into(),
            genres: vec!["Horror".into()],
            ..Default::default()
        };
        let values = map_candidate(&movies(), &candidate);
        assert!(!values.contains_key("genre"));
        assert!(!values.contains_key("year"));
    }

    #[test]
    fn test_candidate_deserializes_camel_case() {
        let c: MetadataCandidate = serde_json::from_str(
            r#"{"title":"Dark","posterUrl":"https://x/y.png","genres":["Sci-Fi"],"seasons":3}"#,
        )
        .unwrap();
        assert_eq!(c.poster_url.as_deref(), Some("https://x/y.png"));
        assert_eq!(c.seasons, Some(3));
    }
}
