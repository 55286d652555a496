//! User identity lifecycle: registration, locally assigned accounts,
//! listing, and delete-everywhere.

use std::sync::Arc;

use storage::repository::{ProgressCacheRepository, UserRepository};
use vocab_core::model::{UserId, UserProfile};

use crate::error::{AccountError, RemoteError};
use crate::remote::VocabApi;

/// Manages the on-device user list and its remote counterpart.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    progress: Arc<dyn ProgressCacheRepository>,
    remote: Option<Arc<dyn VocabApi>>,
}

impl AccountService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        progress: Arc<dyn ProgressCacheRepository>,
        remote: Option<Arc<dyn VocabApi>>,
    ) -> Self {
        Self {
            users,
            progress,
            remote,
        }
    }

    /// Register a user with the remote service.
    ///
    /// Unlike progress persistence, registration has no local fallback: the
    /// server assigns the identity, so remote failures surface directly.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::RemoteUnavailable` when no remote is
    /// configured, `NameTaken` on a conflict, or the underlying remote or
    /// storage error.
    pub async fn register(&self, name: &str) -> Result<UserProfile, AccountError> {
        let Some(remote) = self.remote.as_ref() else {
            return Err(AccountError::RemoteUnavailable);
        };

        let profile = remote.register_user(name).await.map_err(|err| match err {
            RemoteError::Conflict => AccountError::NameTaken,
            other => AccountError::Remote(other),
        })?;

        // Losing the local record would only cost convenience; the remote
        // identity already exists, so surface storage failures here.
        self.users.upsert(&profile).await?;
        Ok(profile)
    }

    /// Create a purely local user with the next free id.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the on-device list cannot be read
    /// or written.
    pub async fn create_local(&self, name: &str) -> Result<UserProfile, AccountError> {
        let existing = self.users.list().await?;
        let next_id = existing
            .iter()
            .map(|profile| profile.id.value())
            .max()
            .map_or(1, |max| max + 1);

        let profile = UserProfile::new(UserId::new(next_id), name);
        self.users.upsert(&profile).await?;
        Ok(profile)
    }

    /// All known user profiles, on-device view.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the on-device list cannot be read.
    pub async fn list(&self) -> Result<Vec<UserProfile>, AccountError> {
        Ok(self.users.list().await?)
    }

    /// Delete a user everywhere: the remote record (best-effort), the local
    /// aggregate cache, and the identity record.
    ///
    /// Callers holding a `ProgressStore` selected on this user should sign
    /// it out afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the on-device records cannot be
    /// removed. A failed remote delete is logged, not surfaced, so an
    /// offline session can still clean up its device.
    pub async fn delete(&self, user: UserId) -> Result<(), AccountError> {
        if let Some(remote) = self.remote.as_ref() {
            if let Err(err) = remote.delete_user(user).await {
                tracing::warn!(user = %user, "remote delete failed, removing local copy anyway: {err}");
            }
        }

        self.progress.delete(user).await?;
        self.users.delete(user).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryStore;

    fn service(store: &InMemoryStore) -> AccountService {
        AccountService::new(Arc::new(store.clone()), Arc::new(store.clone()), None)
    }

    #[tokio::test]
    async fn local_ids_are_assigned_sequentially() {
        let store = InMemoryStore::new();
        let accounts = service(&store);

        let first = accounts.create_local("Avery").await.unwrap();
        let second = accounts.create_local("Beth").await.unwrap();
        assert_eq!(first.id, UserId::new(1));
        assert_eq!(second.id, UserId::new(2));
        assert_eq!(accounts.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn registration_without_remote_is_an_error() {
        let store = InMemoryStore::new();
        let accounts = service(&store);
        assert!(matches!(
            accounts.register("Avery").await,
            Err(AccountError::RemoteUnavailable)
        ));
    }

    #[tokio::test]
    async fn delete_removes_identity_and_cached_progress() {
        let store = InMemoryStore::new();
        let accounts = service(&store);

        let profile = accounts.create_local("Avery").await.unwrap();
        store
            .write(profile.id, &vocab_core::model::Progress::default())
            .await
            .unwrap();

        accounts.delete(profile.id).await.unwrap();
        assert!(accounts.list().await.unwrap().is_empty());
        assert!(store.read(profile.id).await.unwrap().is_none());
    }
}
