use crate::api::models::Conversation;
use directories::ProjectDirs;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

const CONVERSATIONS_KEY: &str = "conversations";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no data directory available")]
    NoDataDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key/value persistence. Writes replace the previous value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub fn default_db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "ConverseGTK")?;
    Some(proj.data_dir().join("cache.sqlite"))
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Key/value table in a local SQLite file. A connection is opened per call.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self { path: path.into() };
        ensure_dir(&store.path)?;
        let conn = store.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(store)
    }

    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(default_db_path().ok_or(StorageError::NoDataDir)?)
    }

    fn conn(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.path)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
            params![key, value, now],
        )?;
        Ok(())
    }
}

/// In-process store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Which key a thread is stored under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageScope {
    /// One `conversations` key shared by every phone number.
    #[default]
    Global,
    /// `conversations:{phone}` per phone number; an empty number uses the shared key.
    PerPhone,
}

/// The conversation thread, stored as a single JSON array.
pub struct ConversationStore<S> {
    store: S,
    scope: StorageScope,
}

impl<S: KeyValueStore> ConversationStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_scope(store, StorageScope::Global)
    }

    pub fn with_scope(store: S, scope: StorageScope) -> Self {
        Self { store, scope }
    }

    pub fn key(&self, phone_number: &str) -> String {
        match self.scope {
            StorageScope::PerPhone if !phone_number.is_empty() => {
                format!("{CONVERSATIONS_KEY}:{phone_number}")
            }
            _ => CONVERSATIONS_KEY.to_string(),
        }
    }

    /// Missing or unreadable data is treated as an empty thread.
    pub fn load(&self, phone_number: &str) -> Vec<Conversation> {
        let key = self.key(phone_number);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Could not read {key}: {e}");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(list) => {
                let total = list.len();
                let kept: Vec<_> = list.into_iter().filter(Conversation::is_consistent).collect();
                if kept.len() != total {
                    warn!("Dropped {} inconsistent conversations from {key}", total - kept.len());
                }
                kept
            }
            Err(e) => {
                warn!("Ignoring unparseable {key}: {e}");
                Vec::new()
            }
        }
    }

    pub fn save(&self, phone_number: &str, conversations: &[Conversation]) -> Result<(), StorageError> {
        let json = serde_json::to_string(conversations)?;
        self.store.set(&self.key(phone_number), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(n: usize) -> Vec<Conversation> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        (0..n)
            .map(|i| Conversation::new(format!("msg {i}"), format!("reply {i}"), start + Duration::minutes(i as i64)))
            .collect()
    }

    #[test]
    fn round_trips_empty_single_and_many() {
        let store = ConversationStore::new(MemoryStore::new());
        for n in [0, 1, 25] {
            let list = sample(n);
            store.save("555-1234", &list).unwrap();
            assert_eq!(store.load("555-1234"), list);
        }
    }

    #[test]
    fn sqlite_round_trip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.sqlite");
        let list = sample(3);
        {
            let store = ConversationStore::new(SqliteStore::open(&path).unwrap());
            store.save("555-1234", &list).unwrap();
        }
        let reopened = ConversationStore::new(SqliteStore::open(&path).unwrap());
        assert_eq!(reopened.load("555-1234"), list);
    }

    #[test]
    fn save_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(SqliteStore::open(dir.path().join("db.sqlite")).unwrap());
        store.save("1", &sample(4)).unwrap();
        store.save("1", &sample(1)).unwrap();
        assert_eq!(store.load("1").len(), 1);
    }

    #[test]
    fn global_scope_shares_one_key() {
        let kv = MemoryStore::new();
        let store = ConversationStore::new(&kv);
        assert_eq!(store.key(""), "conversations");
        assert_eq!(store.key("111"), "conversations");

        store.save("111", &sample(2)).unwrap();
        assert_eq!(store.load("222").len(), 2);
        assert!(kv.get("conversations").unwrap().is_some());
    }

    #[test]
    fn per_phone_scope_is_opt_in() {
        let store = ConversationStore::with_scope(MemoryStore::new(), StorageScope::PerPhone);
        assert_eq!(store.key(""), "conversations");
        assert_eq!(store.key("111"), "conversations:111");

        store.save("111", &sample(2)).unwrap();
        assert!(store.load("222").is_empty());
        assert_eq!(store.load("111").len(), 2);
    }

    #[test]
    fn garbage_loads_as_empty() {
        let kv = MemoryStore::new();
        kv.set("conversations", "{not json").unwrap();
        let store = ConversationStore::new(&kv);
        assert!(store.load("9").is_empty());
    }

    #[test]
    fn inconsistent_records_are_dropped() {
        let mut list = sample(2);
        list[0].response_timestamps.clear();
        let kv = MemoryStore::new();
        kv.set("conversations", &serde_json::to_string(&list).unwrap()).unwrap();
        let store = ConversationStore::new(&kv);
        assert_eq!(store.load("9"), vec![list[1].clone()]);
    }
}
