use thiserror::Error;

#[derive(Error, Debug)]
pub enum CortexError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

impl CortexError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        CortexError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CortexError>;
