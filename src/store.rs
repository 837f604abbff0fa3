use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::record::PredictionRecord;

/// Namespace key the ledger blob is stored under, in every backend.
pub const STORE_KEY: &str = "fp_tracker";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("ledger file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ledger database: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("ledger store is read-only")]
    ReadOnly,
    #[error("record {id} has non-finite probabilities")]
    NonFinite { id: String },
}

/// Durable home of the whole ledger. Every `save` replaces the full
/// collection; there are no partial writes.
pub trait RecordStore {
    /// Never fails: missing or unreadable data loads as an empty ledger.
    fn load(&self) -> Vec<PredictionRecord>;
    fn save(&mut self, records: &[PredictionRecord]) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// JSON has no NaN or infinity; serde_json would write `null` and the
/// whole blob would stop parsing.
pub fn encode(records: &[PredictionRecord]) -> Result<String, StoreError> {
    if let Some(bad) = records.iter().find(|r| {
        r.modeled_probabilities
            .is_some_and(|p| !p.is_finite())
    }) {
        return Err(StoreError::NonFinite { id: bad.id.clone() });
    }
    Ok(serde_json::to_string(records)?)
}

pub fn decode(raw: &str) -> Vec<PredictionRecord> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Vec::new();
    }
    let records = match serde_json::from_str::<Vec<PredictionRecord>>(trimmed) {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable ledger blob");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let before = records.len();
    let records: Vec<PredictionRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();
    if records.len() != before {
        tracing::warn!(
            dropped = before - records.len(),
            "dropped records with duplicate ids"
        );
    }
    records
}

/// In-process store, mostly for tests. Keeps the serialized form so that
/// corrupted blobs can be simulated.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    raw: Option<String>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            read_only: false,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Make subsequent writes fail with `StoreError::ReadOnly`.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Vec<PredictionRecord> {
        self.raw.as_deref().map(decode).unwrap_or_default()
    }

    fn save(&mut self, records: &[PredictionRecord]) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        self.raw = Some(encode(records)?);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        self.raw = None;
        Ok(())
    }
}

/// One JSON file, swapped in through a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/fp_tracker.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{STORE_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Vec<PredictionRecord> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ledger file unreadable");
                Vec::new()
            }
        }
    }

    fn save(&mut self, records: &[PredictionRecord]) -> Result<(), StoreError> {
        let json = encode(records)?;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// A single row of a key-value table in SQLite.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Overwrite the stored blob verbatim, bypassing serialization.
    pub fn put_raw(&mut self, raw: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![STORE_KEY, raw, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_raw(&self) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![STORE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

impl RecordStore for SqliteStore {
    fn load(&self) -> Vec<PredictionRecord> {
        match self.get_raw() {
            Ok(Some(raw)) => decode(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "ledger row unreadable");
                Vec::new()
            }
        }
    }

    fn save(&mut self, records: &[PredictionRecord]) -> Result<(), StoreError> {
        let json = encode(records)?;
        self.put_raw(&json)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![STORE_KEY])?;
        Ok(())
    }
}
