mod changes;
mod parser;
mod types;
mod views;

pub use changes::{diff_field, FieldChange};
pub use parser::{
    parse_template, parse_template_str, DatabaseTemplate, FieldTemplate, OptionTemplate,
    SortTemplate, ViewTemplate,
};
pub use types::{
    Database, DatabasePatch, Field, FieldPatch, FieldType, NewDatabase, NewField, RelationConfig,
    SelectOption,
};
pub use views::{
    CardsViewConfig, FilterCondition, FilterOperator, GalleryViewConfig, MyDayViewConfig, NewView,
    SortCondition, SortDirection, TodoViewConfig, View, ViewConfig, ViewPatch, ViewType,
};
