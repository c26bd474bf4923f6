//! Session store.
//!
//! Short-lived key/value entries shared with the login component:
//! - CSRF token -> consent challenge (written by the consent page, consumed once on confirm)
//! - subject -> share context (written at login, read on accept)
//! - subject -> cached upstream user record (written at login, read by userinfo)
//!
//! ## Backends
//!
//! - [`DatabaseSessionStore`] - `session_entry` table through sea-orm
//! - [`MemorySessionStore`] - process-local dashmap, for single-process setups and tests

mod database;
mod memory;

use crate::config::SessionConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

pub use database::DatabaseSessionStore;
pub use memory::MemorySessionStore;

/// Key/value store with per-entry expiry.
///
/// Expired entries behave as if they were absent for every operation.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read and remove an entry in one step.
    ///
    /// When several callers take the same key concurrently, at most one gets `Some`.
    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or overwrite. `None` means the entry never expires.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Namespaced key templates, each with a single `{}` placeholder.
#[derive(Clone, Debug)]
pub struct SessionKeys {
    csrf: String,
    share_context: String,
    userinfo: String,
}

impl SessionKeys {
    pub fn new(
        csrf: impl Into<String>,
        share_context: impl Into<String>,
        userinfo: impl Into<String>,
    ) -> Self {
        Self {
            csrf: csrf.into(),
            share_context: share_context.into(),
            userinfo: userinfo.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.csrf_key.clone(),
            config.share_context_key.clone(),
            config.userinfo_key.clone(),
        )
    }

    pub fn csrf(&self, token: &str) -> String {
        self.csrf.replacen("{}", token, 1)
    }

    pub fn share_context(&self, subject: &str) -> String {
        self.share_context.replacen("{}", subject, 1)
    }

    pub fn userinfo(&self, subject: &str) -> String {
        self.userinfo.replacen("{}", subject, 1)
    }
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
