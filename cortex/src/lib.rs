pub mod db;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod query;
pub mod record;
pub mod relation;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod validation;
pub mod view;

pub use error::{CortexError, Result};
pub use metadata::MetadataCandidate;
pub use record::{Record, Value, Values};
pub use schema::{Database, Field, FieldType, View, ViewConfig};
pub use snapshot::{ImportMode, ImportReport, Snapshot};
pub use store::{HabitToggle, Store, StoreConfig};
pub use view::ViewState;
