//! libSQL store backend.
//!
//! Three record kinds:
//! - `bot_state` — one row, toggled via an atomic upsert;
//! - `user_usage` — one row per (user_id, date), incremented via an
//!   atomic upsert so concurrent readings cannot lose a count;
//! - `image_mappings` — one row holding the full nested
//!   card → orientation → file_id map as JSON, merge-on-write.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database, params};
use tracing::{debug, info};

use super::{BotState, ReadingStore};
use crate::error::StoreError;
use crate::providers::Orientation;

/// Nested payload of the image_mappings document.
type ImageMap = HashMap<String, HashMap<String, String>>;

/// libSQL database backend.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Open(format!("failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS bot_state (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    enabled INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS user_usage (
                    user_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    count INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (user_id, date)
                );
                CREATE TABLE IF NOT EXISTS image_mappings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    mappings TEXT NOT NULL
                );",
            )
            .await
            .map_err(|e| StoreError::Query(format!("init_schema: {e}")))?;
        Ok(())
    }

    async fn load_image_map(&self) -> Result<ImageMap, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT mappings FROM image_mappings WHERE id = 1", ())
            .await
            .map_err(|e| StoreError::Query(format!("load_image_map: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("load_image_map: {e}")))?
        {
            Some(row) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("load_image_map: {e}")))?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(ImageMap::new()),
        }
    }
}

#[async_trait]
impl ReadingStore for LibSqlStore {
    async fn bot_state(&self) -> Result<BotState, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT enabled FROM bot_state WHERE id = 1", ())
            .await
            .map_err(|e| StoreError::Query(format!("bot_state: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("bot_state: {e}")))?
        {
            Some(row) => {
                let enabled: i64 = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("bot_state: {e}")))?;
                Ok(BotState {
                    enabled: enabled != 0,
                })
            }
            None => Ok(BotState::default()),
        }
    }

    async fn toggle_bot(&self) -> Result<BotState, StoreError> {
        // Default state is enabled, so the first-ever toggle lands on
        // disabled. One statement keeps concurrent toggles atomic.
        let mut rows = self
            .conn
            .query(
                "INSERT INTO bot_state (id, enabled) VALUES (1, 0)
                 ON CONFLICT (id) DO UPDATE SET enabled = 1 - enabled
                 RETURNING enabled",
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("toggle_bot: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("toggle_bot: {e}")))?
            .ok_or_else(|| StoreError::Query("toggle_bot: no row returned".to_string()))?;

        let enabled: i64 = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("toggle_bot: {e}")))?;

        debug!(enabled = enabled != 0, "Bot state toggled");
        Ok(BotState {
            enabled: enabled != 0,
        })
    }

    async fn usage(&self, user_id: &str, date: &str) -> Result<u32, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT count FROM user_usage WHERE user_id = ?1 AND date = ?2",
                params![user_id, date],
            )
            .await
            .map_err(|e| StoreError::Query(format!("usage: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("usage: {e}")))?
        {
            Some(row) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("usage: {e}")))?;
                Ok(count.max(0) as u32)
            }
            None => Ok(0),
        }
    }

    async fn increment_usage(&self, user_id: &str, date: &str) -> Result<u32, StoreError> {
        let mut rows = self
            .conn
            .query(
                "INSERT INTO user_usage (user_id, date, count) VALUES (?1, ?2, 1)
                 ON CONFLICT (user_id, date) DO UPDATE SET count = count + 1
                 RETURNING count",
                params![user_id, date],
            )
            .await
            .map_err(|e| StoreError::Query(format!("increment_usage: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("increment_usage: {e}")))?
            .ok_or_else(|| StoreError::Query("increment_usage: no row returned".to_string()))?;

        let count: i64 = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("increment_usage: {e}")))?;

        debug!(user_id, date, count, "Usage incremented");
        Ok(count.max(0) as u32)
    }

    async fn image_ref(
        &self,
        card: &str,
        orientation: Orientation,
    ) -> Result<Option<String>, StoreError> {
        let map = self.load_image_map().await?;
        Ok(map
            .get(card)
            .and_then(|m| m.get(orientation.as_str()))
            .cloned())
    }

    async fn set_image_ref(
        &self,
        card: &str,
        orientation: Orientation,
        file_id: &str,
    ) -> Result<(), StoreError> {
        // Merge-on-write: copy the nested map, set one entry, rewrite
        // the whole document.
        let mut map = self.load_image_map().await?;
        map.entry(card.to_string())
            .or_default()
            .insert(orientation.as_str().to_string(), file_id.to_string());

        let raw = serde_json::to_string(&map)?;
        self.conn
            .execute(
                "INSERT INTO image_mappings (id, mappings) VALUES (1, ?1)
                 ON CONFLICT (id) DO UPDATE SET mappings = excluded.mappings",
                params![raw],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_image_ref: {e}")))?;

        debug!(card, orientation = %orientation, "Image reference stored");
        Ok(())
    }
}
