use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{ProgressCacheRepository, StorageError};
use vocab_core::model::{PartialProgress, Progress, UserId};

use super::SqliteStore;

/// Reserved row id for the startup write/delete availability probe. Real
/// user ids are non-negative.
const PROBE_SENTINEL_ID: i64 = -1;

fn user_key(user: UserId) -> Result<i64, StorageError> {
    i64::try_from(user.value())
        .map_err(|_| StorageError::Serialization(format!("user id {user} out of range")))
}

#[async_trait]
impl ProgressCacheRepository for SqliteStore {
    async fn read(&self, user: UserId) -> Result<Option<PartialProgress>, StorageError> {
        let row = sqlx::query("SELECT payload FROM progress_cache WHERE user_id = ?1")
            .bind(user_key(user)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row
            .try_get("payload")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        serde_json::from_str(&payload).map(Some).map_err(|err| {
            tracing::debug!(user = %user, "unreadable cached payload: {err}");
            StorageError::Serialization(err.to_string())
        })
    }

    async fn write(&self, user: UserId, progress: &Progress) -> Result<(), StorageError> {
        let payload = serde_json::to_string(progress)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO progress_cache (user_id, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_key(user)?)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM progress_cache WHERE user_id = ?1")
            .bind(user_key(user)?)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }

    async fn probe(&self) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress_cache (user_id, payload, updated_at)
            VALUES (?1, '{}', ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                updated_at = excluded.updated_at
            ",
        )
        .bind(PROBE_SENTINEL_ID)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| {
            tracing::debug!("local cache probe write failed: {err}");
            StorageError::Unavailable(err.to_string())
        })?;

        sqlx::query("DELETE FROM progress_cache WHERE user_id = ?1")
            .bind(PROBE_SENTINEL_ID)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                tracing::debug!("local cache probe delete failed: {err}");
                StorageError::Unavailable(err.to_string())
            })?;

        Ok(())
    }
}
