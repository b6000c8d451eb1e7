// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device-local persistent storage.
//!
//! Holds the onboarding flag, per-day banko unlock flags and the persisted
//! auth session. Nothing here is mirrored to the backend; clearing app data
//! or reinstalling loses it.

use crate::auth::Session;
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use dashmap::DashMap;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FLAGS: TableDefinition<&str, &str> = TableDefinition::new("flags");

/// Storage keys.
pub mod keys {
    pub const ONBOARDING_COMPLETE: &str = "onboarding_complete";
    pub const AUTH_SESSION: &str = "auth_session";
    pub const BANKO_PREFIX: &str = "banko_";
}

/// String key/value store with `localStorage` semantics.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ─── redb-backed store ───────────────────────────────────────

/// File-backed store for native builds.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tracing::info!(path = %path.display(), "Opening local store");

        let db = Database::create(&path).map_err(|e| AppError::LocalStorage(e.to_string()))?;

        // Ensure the table exists so reads never see TableDoesNotExist
        let write_txn = db.begin_write().map_err(redb::Error::from)?;
        {
            let _ = write_txn.open_table(FLAGS).map_err(redb::Error::from)?;
        }
        write_txn.commit().map_err(redb::Error::from)?;

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let read_txn = self.db.begin_read().map_err(redb::Error::from)?;
        let table = read_txn.open_table(FLAGS).map_err(redb::Error::from)?;
        let value = table.get(key).map_err(redb::Error::from)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = write_txn.open_table(FLAGS).map_err(redb::Error::from)?;
            table.insert(key, value).map_err(redb::Error::from)?;
        }
        write_txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = write_txn.open_table(FLAGS).map_err(redb::Error::from)?;
            table.remove(key).map_err(redb::Error::from)?;
        }
        write_txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }
}

// ─── In-memory store ─────────────────────────────────────────

/// Volatile store for web builds and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ─── Typed flags ─────────────────────────────────────────────

/// Typed accessors over a [`LocalStore`].
#[derive(Clone)]
pub struct LocalFlags {
    store: Arc<dyn LocalStore>,
}

impl LocalFlags {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// In-memory flags (nothing persisted).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn flag(&self, key: &str) -> Result<bool> {
        Ok(self.store.get(key)?.as_deref() == Some("true"))
    }

    // ─── Onboarding ──────────────────────────────────────────

    pub fn onboarding_complete(&self) -> Result<bool> {
        self.flag(keys::ONBOARDING_COMPLETE)
    }

    pub fn set_onboarding_complete(&self) -> Result<()> {
        self.store.set(keys::ONBOARDING_COMPLETE, "true")
    }

    // ─── Banko unlocks ───────────────────────────────────────

    /// Key for a pick on a given day. A new day yields a new key.
    pub fn banko_key(pick_id: &str, day: NaiveDate) -> String {
        format!(
            "{}{}_{}",
            keys::BANKO_PREFIX,
            pick_id,
            crate::time_utils::format_day(day)
        )
    }

    pub fn banko_unlocked(&self, pick_id: &str, day: NaiveDate) -> Result<bool> {
        self.flag(&Self::banko_key(pick_id, day))
    }

    pub fn set_banko_unlocked(&self, pick_id: &str, day: NaiveDate) -> Result<()> {
        self.store.set(&Self::banko_key(pick_id, day), "true")
    }

    // ─── Auth session ────────────────────────────────────────

    pub fn load_session(&self) -> Result<Option<Session>> {
        match self.store.get(keys::AUTH_SESSION)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable stored session");
                    self.store.remove(keys::AUTH_SESSION)?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)
            .map_err(|e| AppError::LocalStorage(format!("Failed to serialize session: {}", e)))?;
        self.store.set(keys::AUTH_SESSION, &raw)
    }

    pub fn clear_session(&self) -> Result<()> {
        self.store.remove(keys::AUTH_SESSION)
    }
}
