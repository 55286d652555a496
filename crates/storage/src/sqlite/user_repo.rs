use async_trait::async_trait;
use sqlx::Row;

use crate::repository::{StorageError, UserRepository};
use vocab_core::model::{UserId, UserProfile};

use super::SqliteStore;

#[async_trait]
impl UserRepository for SqliteStore {
    async fn list(&self) -> Result<Vec<UserProfile>, StorageError> {
        let rows = sqlx::query("SELECT id, name FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row
                .try_get("id")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let name: String = row
                .try_get("name")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let id = u64::try_from(id)
                .map_err(|_| StorageError::Serialization(format!("negative user id {id}")))?;
            profiles.push(UserProfile::new(UserId::new(id), name));
        }
        Ok(profiles)
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let id = i64::try_from(profile.id.value()).map_err(|_| {
            StorageError::Serialization(format!("user id {} out of range", profile.id))
        })?;

        sqlx::query(
            r"
            INSERT INTO users (id, name)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name
            ",
        )
        .bind(id)
        .bind(&profile.name)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<(), StorageError> {
        let id = i64::try_from(user.value())
            .map_err(|_| StorageError::Serialization(format!("user id {user} out of range")))?;

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
