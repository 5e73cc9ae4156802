use crate::app_dirs::AppDirs;
use crate::error::StorageError;
use crate::log_store::{LogEntry, LogStore};
use crate::session::Session;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// Record name the snapshot is stored under.
pub const STATE_KEY: &str = "soloStudyState";

/// Durable projection of the study state. Running flags are deliberately
/// absent so a reload never resumes a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSnapshot {
    pub main_remaining_seconds: u64,
    pub logs: Vec<LogEntry>,
    pub next_log_id: u64,
    pub session_name: String,
}

impl Default for PersistedSnapshot {
    fn default() -> Self {
        Self {
            main_remaining_seconds: 0,
            logs: Vec::new(),
            next_log_id: 1,
            session_name: String::new(),
        }
    }
}

impl PersistedSnapshot {
    pub fn capture(session: &Session, logs: &LogStore) -> Self {
        Self {
            main_remaining_seconds: session.main_remaining_seconds,
            logs: logs.entries().to_vec(),
            next_log_id: logs.next_log_id(),
            session_name: session.name.clone(),
        }
    }

    /// Rejects records whose log breaks the id or duration rules, so a
    /// hand-edited or damaged file is treated like a missing one.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.next_log_id == u64::MAX {
            return Err(StorageError::Invalid("log id counter exhausted".into()));
        }
        let mut seen = HashSet::with_capacity(self.logs.len());
        for entry in &self.logs {
            if entry.id == 0 || entry.id == u64::MAX {
                return Err(StorageError::Invalid(format!(
                    "log id {} out of range",
                    entry.id
                )));
            }
            if !seen.insert(entry.id) {
                return Err(StorageError::Invalid(format!(
                    "duplicate log id {}",
                    entry.id
                )));
            }
            if entry.time_spent_seconds == 0 {
                return Err(StorageError::Invalid(format!(
                    "log {} has no time spent",
                    entry.id
                )));
            }
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Session, LogStore) {
        (
            Session::restored(self.session_name, self.main_remaining_seconds),
            LogStore::from_parts(self.logs, self.next_log_id),
        )
    }
}

/// Byte-level key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Key-value store in a single-table SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens the database under `$HOME/.local/state/solostudy`.
    pub fn new() -> Result<Self, StorageError> {
        let path = AppDirs::state_db_path().unwrap_or_else(|| PathBuf::from("solostudy_state.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}

/// Shared in-process store; clones see the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes the snapshot. Nothing here ever fails the caller:
/// storage problems are logged and the app keeps running in memory.
#[derive(Debug)]
pub struct PersistenceGateway<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Absent or malformed data yields a fresh snapshot.
    pub fn load(&self) -> PersistedSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => PersistedSnapshot::default(),
            Err(e) => {
                warn!(error = %e, "failed to load state, starting fresh");
                PersistedSnapshot::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Option<PersistedSnapshot>, StorageError> {
        match self.store.get(STATE_KEY)? {
            Some(raw) => {
                let snapshot: PersistedSnapshot = serde_json::from_str(&raw)?;
                snapshot.validate()?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Returns whether the write landed.
    pub fn save(&self, snapshot: &PersistedSnapshot) -> bool {
        match self.try_save(snapshot) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to persist state, continuing in memory");
                false
            }
        }
    }

    pub fn try_save(&self, snapshot: &PersistedSnapshot) -> Result<(), StorageError> {
        let data = serde_json::to_string(snapshot)?;
        self.store.set(STATE_KEY, &data)?;
        debug!(bytes = data.len(), "state persisted");
        Ok(())
    }
}
