use super::SessionStore;
use crate::entity::session_entry;
use crate::error::StoreError;
use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait, sea_query::OnConflict,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Session store backed by the `session_entry` table.
///
/// Expired rows are filtered on read and purged lazily from `set` and `take`.
#[derive(Clone)]
pub struct DatabaseSessionStore {
    db: Arc<DatabaseConnection>,
    last_cleanup: Arc<Mutex<Instant>>,
    cleanup_interval: Duration,
}

impl DatabaseSessionStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            last_cleanup: Arc::new(Mutex::new(Instant::now())),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }

    /// Minimum time between two purges of expired rows.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Delete every expired row. Returns the number of rows removed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = session_entry::Entity::delete_many()
            .filter(session_entry::Column::ExpiresAt.lte(OffsetDateTime::now_utc()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Purge expired rows if the last purge is at least `cleanup_interval` old.
    async fn maybe_purge(&self) {
        let due = match self.last_cleanup.try_lock() {
            Ok(mut last_cleanup) if last_cleanup.elapsed() >= self.cleanup_interval => {
                *last_cleanup = Instant::now();
                true
            }
            _ => false,
        };
        if !due {
            return;
        }

        match self.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Purged expired session entries"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired session entries"),
        }
    }
}

fn expiry_from_ttl(ttl: Option<Duration>) -> Result<Option<OffsetDateTime>, StoreError> {
    ttl.map(|ttl| {
        time::Duration::try_from(ttl)
            .map(|ttl| OffsetDateTime::now_utc() + ttl)
            .map_err(|e| StoreError::Unavailable(format!("TTL out of range: {e}")))
    })
    .transpose()
}

#[async_trait]
impl SessionStore for DatabaseSessionStore {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entry = session_entry::Entity::find_by_id(key.to_string())
            .one(self.db.as_ref())
            .await?;

        Ok(entry
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value))
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.maybe_purge().await;

        let txn = self.db.begin().await?;

        let Some(entry) = session_entry::Entity::find_by_id(key.to_string())
            .one(&txn)
            .await?
        else {
            txn.commit().await?;
            return Ok(None);
        };

        // Only the caller whose delete removed the row may use the value.
        let deleted = session_entry::Entity::delete_by_id(key.to_string())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        if deleted.rows_affected == 0 || entry.is_expired() {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        self.maybe_purge().await;

        let entry = session_entry::ActiveModel {
            session_key: Set(key.to_string()),
            value: Set(value.to_vec()),
            expires_at: Set(expiry_from_ttl(ttl)?),
        };

        session_entry::Entity::insert(entry)
            .on_conflict(
                OnConflict::column(session_entry::Column::SessionKey)
                    .update_columns([
                        session_entry::Column::Value,
                        session_entry::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        session_entry::Entity::delete_by_id(key.to_string())
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
