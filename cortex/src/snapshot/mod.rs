// Snapshot - versioned bulk export/import of every database

use crate::db::RowStore;
use crate::error::{CortexError, Result};
use crate::record::MAX_ORDER;
use crate::schema::{Database, View};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current snapshot format version. Newer snapshots are refused.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub databases: Vec<Database>,
}

impl Snapshot {
    pub fn new(databases: Vec<Database>) -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            databases,
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn check_version(&self) -> Result<()> {
        if self.version == 0 || self.version > SNAPSHOT_VERSION {
            return Err(CortexError::Snapshot(format!(
                "unsupported snapshot version {} (this build reads up to {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        Ok(())
    }
}

/// `Merge` upserts by id; `Replace` wipes every database first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Merge,
    Replace,
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "replace" => Ok(ImportMode::Replace),
            other => Err(format!("unknown import mode '{other}' (expected merge or replace)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub mode: ImportMode,
    pub databases: usize,
    pub fields: usize,
    pub records: usize,
    pub views: usize,
    /// Databases that arrived without views and received the default one.
    pub default_views_added: usize,
}

/// Write a snapshot's contents into the row store. The caller owns the
/// transaction; `default_view` builds the view for databases that have none.
pub(crate) fn apply(
    rows: &RowStore,
    snapshot: &Snapshot,
    mode: ImportMode,
    default_view: impl Fn(&Database) -> View,
) -> Result<ImportReport> {
    snapshot.check_version()?;

    if mode == ImportMode::Replace {
        rows.clear_all()?;
    }

    let mut report = ImportReport {
        mode,
        ..Default::default()
    };

    for database in &snapshot.databases {
        if database.id.trim().is_empty() {
            return Err(CortexError::Snapshot(format!(
                "database '{}' has no id",
                database.name
            )));
        }
        rows.upsert_database(database)?;
        for field in &database.fields {
            rows.upsert_field(&database.id, field)?;
        }
        for record in &database.records {
            if !(-MAX_ORDER..=MAX_ORDER).contains(&record.order) {
                return Err(CortexError::Snapshot(format!(
                    "record {} in '{}' has out-of-range order {}",
                    record.id, database.name, record.order
                )));
            }
            rows.upsert_record(&database.id, record)?;
        }
        for view in &database.views {
            rows.upsert_view(&database.id, view)?;
        }

        if rows.count_views(&database.id)? == 0 {
            let stored = rows
                .load_database(&database.id)?
                .ok_or_else(|| CortexError::not_found("Database", &database.id))?;
            rows.upsert_view(&database.id, &default_view(&stored))?;
            report.default_views_added += 1;
        }

        report.databases += 1;
        report.fields += database.fields.len();
        report.records += database.records.len();
        report.views += database.views.len();
    }

    log::info!(
        "imported snapshot ({:?}): {} databases, {} records",
        mode,
        report.databases,
        report.records
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = Snapshot::new(Vec::new());
        let json = snapshot.to_json_pretty().unwrap();
        assert!(json.contains("\"exportedAt\""));
        assert!(json.contains("\"version\": 1"));
        assert_eq!(Snapshot::from_json(&json).unwrap().version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_newer_version_refused() {
        let json = r#"{"version": 2, "exportedAt": "2026-10-16T00:00:00Z", "databases": []}"#;
        let err = Snapshot::from_json(json).unwrap_err();
        assert!(matches!(err, CortexError::Snapshot(_)));
    }

    #[test]
    fn test_import_mode_from_str() {
        assert_eq!("Merge".parse::<ImportMode>(), Ok(ImportMode::Merge));
        assert_eq!(" replace".parse::<ImportMode>(), Ok(ImportMode::Replace));
        assert!("append".parse::<ImportMode>().is_err());
    }
}
