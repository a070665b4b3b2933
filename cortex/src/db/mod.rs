use crate::error::Result;
use crate::record::{Record, Values};
use crate::schema::{Database, Field, View};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// The row store behind the engine: one table per entity, nested data as JSON.
pub struct RowStore {
    conn: Connection,
}

impl RowStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = RowStore { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = RowStore { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    fn initialize_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS databases (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                icon TEXT NOT NULL,
                color TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS fields (
                database_id TEXT NOT NULL REFERENCES databases(id) ON DELETE CASCADE,
                id TEXT NOT NULL,
                position INTEGER NOT NULL,
                data_json TEXT NOT NULL,
                PRIMARY KEY (database_id, id)
            );

            CREATE TABLE IF NOT EXISTS records (
                database_id TEXT NOT NULL REFERENCES databases(id) ON DELETE CASCADE,
                id TEXT NOT NULL,
                sort_order INTEGER NOT NULL,
                values_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (database_id, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_order ON records(database_id, sort_order);

            CREATE TABLE IF NOT EXISTS views (
                database_id TEXT NOT NULL REFERENCES databases(id) ON DELETE CASCADE,
                id TEXT NOT NULL,
                position INTEGER NOT NULL,
                data_json TEXT NOT NULL,
                PRIMARY KEY (database_id, id)
            );
            ",
        )?;
        Ok(())
    }

    // ── Databases ────────────────────────────────────────────────────

    /// Insert or update a database's own attributes. Children are untouched.
    pub fn upsert_database(&self, db: &Database) -> Result<()> {
        self.conn.execute(
            "INSERT INTO databases (id, name, description, icon, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                icon = excluded.icon,
                color = excluded.color,
                updated_at = excluded.updated_at",
            params![
                db.id,
                db.name,
                db.description,
                db.icon,
                db.color,
                db.created_at,
                db.updated_at
            ],
        )?;
        Ok(())
    }

    /// Get a database row without its fields, records or views.
    pub fn get_database_row(&self, id: &str) -> Result<Option<Database>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, name, description, icon, color, created_at, updated_at
                 FROM databases WHERE id = ?1",
                params![id],
                database_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// List all database rows, oldest first.
    pub fn list_database_rows(&self) -> Result<Vec<Database>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, icon, color, created_at, updated_at
             FROM databases ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([], database_from_row)?;

        let mut dbs = Vec::new();
        for row in rows {
            dbs.push(row?);
        }
        Ok(dbs)
    }

    /// Load a database with all of its fields, records and views.
    pub fn load_database(&self, id: &str) -> Result<Option<Database>> {
        let Some(mut db) = self.get_database_row(id)? else {
            return Ok(None);
        };
        db.fields = self.list_fields(id)?;
        db.records = self.list_records(id)?;
        db.views = self.list_views(id)?;
        Ok(Some(db))
    }

    /// Load every database with its children.
    pub fn load_all(&self) -> Result<Vec<Database>> {
        let mut dbs = self.list_database_rows()?;
        for db in &mut dbs {
            db.fields = self.list_fields(&db.id)?;
            db.records = self.list_records(&db.id)?;
            db.views = self.list_views(&db.id)?;
        }
        Ok(dbs)
    }

    pub fn touch_database(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE databases SET updated_at = ?2 WHERE id = ?1",
            params![id, at],
        )?;
        Ok(())
    }

    /// Delete a database and everything it owns. Returns false if absent.
    pub fn delete_database(&self, id: &str) -> Result<bool> {
        // Children first; cascade is not relied on
        self.conn
            .execute("DELETE FROM fields WHERE database_id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM records WHERE database_id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM views WHERE database_id = ?1", params![id])?;
        let deleted = self
            .conn
            .execute("DELETE FROM databases WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Remove every database and child row.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM fields; DELETE FROM records; DELETE FROM views; DELETE FROM databases;",
        )?;
        Ok(())
    }

    // ── Fields ───────────────────────────────────────────────────────

    /// Insert a field at the end of the schema, or update it in place.
    pub fn upsert_field(&self, database_id: &str, field: &Field) -> Result<()> {
        let data_json = serde_json::to_string(field)?;
        self.conn.execute(
            "INSERT INTO fields (database_id, id, position, data_json)
             VALUES (?1, ?2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM fields WHERE database_id = ?1), ?3)
             ON CONFLICT(database_id, id) DO UPDATE SET data_json = excluded.data_json",
            params![database_id, field.id, data_json],
        )?;
        Ok(())
    }

    pub fn list_fields(&self, database_id: &str) -> Result<Vec<Field>> {
        let mut stmt = self.conn.prepare(
            "SELECT data_json FROM fields WHERE database_id = ?1 ORDER BY position, id",
        )?;
        let rows = stmt.query_map(params![database_id], |row| row.get::<_, String>(0))?;

        let mut fields = Vec::new();
        for row in rows {
            fields.push(serde_json::from_str(&row?)?);
        }
        Ok(fields)
    }

    pub fn delete_field(&self, database_id: &str, id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM fields WHERE database_id = ?1 AND id = ?2",
            params![database_id, id],
        )?;
        Ok(deleted > 0)
    }

    // ── Records ──────────────────────────────────────────────────────

    pub fn upsert_record(&self, database_id: &str, record: &Record) -> Result<()> {
        let values_json = serde_json::to_string(&record.values)?;
        self.conn.execute(
            "INSERT INTO records (database_id, id, sort_order, values_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(database_id, id) DO UPDATE SET
                sort_order = excluded.sort_order,
                values_json = excluded.values_json,
                updated_at = excluded.updated_at",
            params![
                database_id,
                record.id,
                record.order,
                values_json,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn get_record(&self, database_id: &str, id: &str) -> Result<Option<Record>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, sort_order, values_json, created_at, updated_at
                 FROM records WHERE database_id = ?1 AND id = ?2",
                params![database_id, id],
                record_columns,
            )
            .optional()?;
        result.map(RecordColumns::into_record).transpose()
    }

    /// All records of a database in manual order.
    pub fn list_records(&self, database_id: &str) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sort_order, values_json, created_at, updated_at
             FROM records WHERE database_id = ?1 ORDER BY sort_order, created_at, id",
        )?;
        let rows = stmt.query_map(params![database_id], record_columns)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    pub fn delete_record(&self, database_id: &str, id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM records WHERE database_id = ?1 AND id = ?2",
            params![database_id, id],
        )?;
        Ok(deleted > 0)
    }

    /// Highest manual order in a database, `None` when it has no records.
    pub fn max_record_order(&self, database_id: &str) -> Result<Option<i64>> {
        let max = self.conn.query_row(
            "SELECT MAX(sort_order) FROM records WHERE database_id = ?1",
            params![database_id],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }

    pub fn set_record_order(&self, database_id: &str, id: &str, order: i64) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE records SET sort_order = ?3 WHERE database_id = ?1 AND id = ?2",
            params![database_id, id, order],
        )?;
        Ok(updated > 0)
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Insert a view at the end of the list, or update it in place.
    pub fn upsert_view(&self, database_id: &str, view: &View) -> Result<()> {
        let data_json = serde_json::to_string(view)?;
        self.conn.execute(
            "INSERT INTO views (database_id, id, position, data_json)
             VALUES (?1, ?2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM views WHERE database_id = ?1), ?3)
             ON CONFLICT(database_id, id) DO UPDATE SET data_json = excluded.data_json",
            params![database_id, view.id, data_json],
        )?;
        Ok(())
    }

    pub fn get_view(&self, database_id: &str, id: &str) -> Result<Option<View>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT data_json FROM views WHERE database_id = ?1 AND id = ?2",
                params![database_id, id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    pub fn list_views(&self, database_id: &str) -> Result<Vec<View>> {
        let mut stmt = self.conn.prepare(
            "SELECT data_json FROM views WHERE database_id = ?1 ORDER BY position, id",
        )?;
        let rows = stmt.query_map(params![database_id], |row| row.get::<_, String>(0))?;

        let mut views = Vec::new();
        for row in rows {
            views.push(serde_json::from_str(&row?)?);
        }
        Ok(views)
    }

    pub fn count_views(&self, database_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM views WHERE database_id = ?1",
            params![database_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn delete_view(&self, database_id: &str, id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM views WHERE database_id = ?1 AND id = ?2",
            params![database_id, id],
        )?;
        Ok(deleted > 0)
    }

    // ── Transaction Support ──────────────────────────────────────────

    /// Begin a write transaction, taking the write lock up front.
    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    /// Commit the current transaction.
    pub fn commit_transaction(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Rollback the current transaction.
    pub fn rollback_transaction(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    /// Inside an already open transaction `f` simply joins it.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback_transaction() {
                    log::error!("rollback failed after '{e}': {rollback}");
                }
                Err(e)
            }
        }
    }
}

fn database_from_row(row: &Row<'_>) -> rusqlite::Result<Database> {
    Ok(Database {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        color: row.get(4)?,
        fields: Vec::new(),
        records: Vec::new(),
        views: Vec::new(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Raw record columns before the values JSON is decoded.
struct RecordColumns {
    id: String,
    order: i64,
    values_json: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecordColumns {
    fn into_record(self) -> Result<Record> {
        let values: Values = serde_json::from_str(&self.values_json)?;
        Ok(Record {
            id: self.id,
            values,
            order: self.order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn record_columns(row: &Row<'_>) -> rusqlite::Result<RecordColumns> {
    Ok(RecordColumns {
        id: row.get(0)?,
        order: row.get(1)?,
        values_json: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}
