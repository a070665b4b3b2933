use crate::record::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A saved filter/sort/visibility configuration plus its type-specific config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub config: ViewConfig,
    #[serde(default)]
    pub filters: Vec<FilterCondition>,
    #[serde(default)]
    pub sorts: Vec<SortCondition>,
    #[serde(default)]
    pub visible_fields: Vec<String>,
}

impl View {
    pub fn view_type(&self) -> ViewType {
        self.config.view_type()
    }

    /// Drop every reference to `field_id` from visibility, filters and sorts.
    /// Returns true if anything changed.
    pub fn prune_field(&mut self, field_id: &str) -> bool {
        let before = (self.visible_fields.len(), self.filters.len(), self.sorts.len());
        self.visible_fields.retain(|id| id != field_id);
        self.filters.retain(|f| f.field_id != field_id);
        self.sorts.retain(|s| s.field_id != field_id);
        before != (self.visible_fields.len(), self.filters.len(), self.sorts.len())
    }

    /// Every field id this view's lists reference.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.visible_fields
            .iter()
            .map(String::as_str)
            .chain(self.filters.iter().map(|f| f.field_id.as_str()))
            .chain(self.sorts.iter().map(|s| s.field_id.as_str()))
    }
}

/// Exactly one type-specific config, keyed by the view's `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewConfig {
    Table,
    Cards {
        #[serde(rename = "cardsConfig")]
        cards_config: CardsViewConfig,
    },
    Todo {
        #[serde(rename = "todoConfig")]
        todo_config: TodoViewConfig,
    },
    MyDay {
        #[serde(rename = "myDayConfig")]
        my_day_config: MyDayViewConfig,
    },
    Gallery {
        #[serde(rename = "galleryConfig")]
        gallery_config: GalleryViewConfig,
    },
}

impl ViewConfig {
    pub fn view_type(&self) -> ViewType {
        match self {
            ViewConfig::Table => ViewType::Table,
            ViewConfig::Cards { .. } => ViewType::Cards,
            ViewConfig::Todo { .. } => ViewType::Todo,
            ViewConfig::MyDay { .. } => ViewType::MyDay,
            ViewConfig::Gallery { .. } => ViewType::Gallery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Table,
    Cards,
    Todo,
    MyDay,
    Gallery,
}

impl std::str::FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s.trim()).map_err(|_| format!("unknown view type '{s}'"))
    }
}

/// Groups a source database's records under each record of this database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsViewConfig {
    pub source_database_id: String,
    /// Relation field on the source database pointing back at this one.
    pub group_by_field_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoViewConfig {
    pub checkbox_field_id: String,
    #[serde(default = "default_true")]
    pub show_completed: bool,
    #[serde(default)]
    pub completed_collapsed: bool,
}

/// Daily habit tracking. `perfect_streak` and `last_perfect_day` are shared
/// view-level state, not per-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyDayViewConfig {
    pub date_field_id: String,
    pub streak_field_id: String,
    #[serde(default)]
    pub perfect_streak: u32,
    #[serde(default)]
    pub last_perfect_day: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryViewConfig {
    pub image_field_id: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    pub field_id: String,
    pub operator: FilterOperator,
    /// `None` when the key is absent. An explicit JSON `null` is
    /// `Some(Value::Null)` and only equals a stored null.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FilterCondition {
    pub fn new(field_id: impl Into<String>, operator: FilterOperator, value: Option<Value>) -> Self {
        FilterCondition {
            field_id: field_id.into(),
            operator,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    IsEmpty,
    IsNotEmpty,
    Gt,
    Lt,
    Gte,
    Lte,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortCondition {
    pub field_id: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortCondition {
    pub fn asc(field_id: impl Into<String>) -> Self {
        SortCondition {
            field_id: field_id.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field_id: impl Into<String>) -> Self {
        SortCondition {
            field_id: field_id.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Input for creating a view. `visible_fields: None` shows every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewView {
    pub name: String,
    #[serde(flatten)]
    pub config: ViewConfig,
    #[serde(default)]
    pub filters: Vec<FilterCondition>,
    #[serde(default)]
    pub sorts: Vec<SortCondition>,
    #[serde(default)]
    pub visible_fields: Option<Vec<String>>,
}

impl NewView {
    pub fn new(name: impl Into<String>, config: ViewConfig) -> Self {
        NewView {
            name: name.into(),
            config,
            filters: Vec::new(),
            sorts: Vec::new(),
            visible_fields: None,
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        NewView::new(name, ViewConfig::Table)
    }
}

/// Partial update of a view. Absent members are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Option<ViewConfig>,
    #[serde(default)]
    pub filters: Option<Vec<FilterCondition>>,
    #[serde(default)]
    pub sorts: Option<Vec<SortCondition>>,
    #[serde(default)]
    pub visible_fields: Option<Vec<String>>,
}
