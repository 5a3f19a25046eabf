/// Local persistence - a durable key-value surface over libsql
///
/// The registry serializes its full site list under [`SITES_KEY`]; the
/// presentation dark-mode preference lives under [`DARK_MODE_KEY`].
pub mod migrations;

use std::path::Path;

use async_trait::async_trait;
use deadpool::managed::{self, Pool, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError, params};
use thiserror::Error;
use tracing::warn;

/// Fixed key the serialized site list lives under.
pub const SITES_KEY: &str = "ping-sites";

/// Companion key for the presentation dark-mode preference.
pub const DARK_MODE_KEY: &str = "dark-mode";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] LibsqlError),

    #[error("connection pool error: {0}")]
    Pool(#[from] managed::PoolError<LibsqlError>),

    #[error("store setup failed: {0}")]
    Setup(String),
}

/// Durable key-value persistence for the registry and preferences.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct LibsqlManager {
    database: Database,
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.database.connect()
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        // Liveness probe; a dead connection gets dropped from the pool.
        conn.query("SELECT 1", ()).await?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// libsql-backed store with pooled connections and a migrated schema.
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Open (or create) the database at `path` and bring the schema up to
    /// date.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Setup(format!("creating {}: {e}", parent.display())))?;
            }
        }

        let database = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(StoreError::Database)?;
        let pool = Pool::builder(LibsqlManager { database })
            .build()
            .map_err(|e| StoreError::Setup(e.to_string()))?;

        let store = Self { pool };
        let conn = store.conn().await?;
        migrations::run_migrations(&conn).await?;
        Ok(store)
    }

    async fn conn(&self) -> Result<managed::Object<LibsqlManager>, StoreError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl KvStore for LibsqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn().await?;
        let mut rows = conn.query("SELECT value FROM kv WHERE key = ?", params![key]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn().await?;
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .await?;
        Ok(())
    }
}

/// Read the dark-mode preference; absent or unreadable means light mode.
pub async fn load_dark_mode(store: &dyn KvStore) -> bool {
    match store.get(DARK_MODE_KEY).await {
        Ok(value) => value.as_deref() == Some("true"),
        Err(e) => {
            warn!(error = %e, "could not read dark-mode preference");
            false
        }
    }
}

/// Persist the dark-mode preference, best-effort.
pub async fn save_dark_mode(store: &dyn KvStore, enabled: bool) {
    let value = if enabled { "true" } else { "false" };
    if let Err(e) = store.put(DARK_MODE_KEY, value).await {
        warn!(error = %e, "could not persist dark-mode preference");
    }
}

/// In-memory store double for tests.
#[cfg(test)]
pub struct MemoryStore(std::sync::Mutex<std::collections::HashMap<String, String>>);

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self(std::sync::Mutex::new(std::collections::HashMap::new()))
    }
}

#[cfg(test)]
#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
