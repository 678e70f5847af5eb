//! Persistence layer — bot state, per-user daily usage, image mappings.

pub mod libsql_store;

pub use libsql_store::LibSqlStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::providers::Orientation;

/// Whether the bot answers reading requests. Singleton record;
/// a store with no record reports the default (enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotState {
    pub enabled: bool,
}

impl Default for BotState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Store operations the handlers and the provisioning tool depend on.
///
/// Known limitation: nothing here exposes a compare-and-swap, so two
/// concurrent toggles or increments against a backend without atomic
/// upserts could lose an update. The libsql backend uses atomic
/// upserts for both, so the race is confined to backends that cannot.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Current bot state; absent record means enabled.
    async fn bot_state(&self) -> Result<BotState, StoreError>;

    /// Flip the enabled flag, creating the record on first toggle,
    /// and return the new state.
    async fn toggle_bot(&self) -> Result<BotState, StoreError>;

    /// Reading count for (user, date); absent record means 0.
    async fn usage(&self, user_id: &str, date: &str) -> Result<u32, StoreError>;

    /// Increment the reading count for (user, date) and return the new count.
    async fn increment_usage(&self, user_id: &str, date: &str) -> Result<u32, StoreError>;

    /// Stored photo reference for (card, orientation), if provisioned.
    async fn image_ref(
        &self,
        card: &str,
        orientation: Orientation,
    ) -> Result<Option<String>, StoreError>;

    /// Record a photo reference for (card, orientation).
    async fn set_image_ref(
        &self,
        card: &str,
        orientation: Orientation,
        file_id: &str,
    ) -> Result<(), StoreError>;
}
