use crate::error::{OdiaLinguaError, Result};
use crate::session::Session;
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub mod types;
pub use types::StoredEntry;

/// Local-storage key holding the mirrored session list
pub const SESSIONS_KEY: &str = "sessions";

/// Persistent key/value store for client state
///
/// One row per key in a `local_storage` table; values are opaque strings
/// (JSON in practice).
#[derive(Debug, Clone)]
pub struct LocalStore {
    db_path: PathBuf,
}

impl LocalStore {
    /// Create a new store in the user's data directory
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "odialingua", "odialingua")
            .ok_or_else(|| OdiaLinguaError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;

        let store = Self {
            db_path: data_dir.join("local.db"),
        };
        store.init()?;
        Ok(store)
    }

    /// Create a store backed by the database at `db_path`
    ///
    /// # Examples
    ///
    /// ```
    /// use odialingua::storage::LocalStore;
    ///
    /// let dir = tempfile::TempDir::new().unwrap();
    /// let store = LocalStore::new_with_path(dir.path().join("local.db")).unwrap();
    /// store.set("theme", "dark").unwrap();
    /// assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Opens the configured path, or the default location when none is set
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::new_with_path(p),
            None => Self::new(),
        }
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| OdiaLinguaError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("Failed to read key")
            .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .context("Failed to write key")
        .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Removes `key`; returns whether it existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.connect()?;
        let affected = conn
            .execute("DELETE FROM local_storage WHERE key = ?", params![key])
            .context("Failed to delete key")
            .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// All keys with their size and last write time, most recent first
    pub fn entries(&self) -> Result<Vec<StoredEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT key, LENGTH(value), updated_at FROM local_storage ORDER BY updated_at DESC",
            )
            .context("Failed to prepare query")
            .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let key: String = row.get(0)?;
                let size: i64 = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok((key, size, updated_at))
            })
            .context("Failed to query entries")
            .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, size, updated_at) =
                row.map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entries.push(StoredEntry {
                key,
                size: size.max(0) as usize,
                updated_at,
            });
        }
        Ok(entries)
    }
}

/// Mirror of the session list under the `sessions` key
///
/// Written after every successful mutation and read back when the backend
/// cannot be reached.
#[derive(Debug, Clone)]
pub struct SessionCache {
    store: LocalStore,
}

impl SessionCache {
    /// Wraps a store
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Mirrored sessions, or `None` when nothing is stored
    ///
    /// A corrupt value is logged and treated as absent.
    pub fn load(&self) -> Result<Option<Vec<Session>>> {
        let Some(raw) = self.store.get(SESSIONS_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Session>>(&raw) {
            Ok(sessions) => Ok(Some(sessions)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session cache: {}", e);
                Ok(None)
            }
        }
    }

    /// Replaces the mirror with `sessions`
    pub fn save(&self, sessions: &[Session]) -> Result<()> {
        let json = serde_json::to_string(sessions)
            .context("Failed to serialize sessions")
            .map_err(|e| OdiaLinguaError::Storage(e.to_string()))?;
        self.store.set(SESSIONS_KEY, &json)?;
        tracing::debug!(count = sessions.len(), "Mirrored sessions to local storage");
        Ok(())
    }

    /// Forgets the mirror
    pub fn clear(&self) -> Result<()> {
        self.store.remove(SESSIONS_KEY)?;
        Ok(())
    }
}
