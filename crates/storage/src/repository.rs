use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use vocab_core::model::{PartialProgress, Progress, UserId, UserProfile};

/// Errors surfaced by local-cache adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The medium rejected the operation outright (quota restrictions,
    /// missing file permissions). Distinct from `Connection` so callers can
    /// stop retrying for the rest of the session.
    #[error("storage medium unavailable: {0}")]
    Unavailable(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Per-user cache of the full progress aggregate.
///
/// Reads hand back a [`PartialProgress`] rather than the full shape so a
/// payload written by an older build deep-merges over current defaults
/// instead of failing to load.
#[async_trait]
pub trait ProgressCacheRepository: Send + Sync {
    /// Fetch the cached aggregate for a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an unreadable payload, or
    /// other storage errors when the medium fails.
    async fn read(&self, user: UserId) -> Result<Option<PartialProgress>, StorageError>;

    /// Persist the full aggregate for a user, replacing any previous copy.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the aggregate cannot be stored.
    async fn write(&self, user: UserId, progress: &Progress) -> Result<(), StorageError>;

    /// Drop the cached aggregate for a user. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium fails.
    async fn delete(&self, user: UserId) -> Result<(), StorageError>;

    /// One write/delete cycle against a sentinel key, used once at startup
    /// to detect a medium that rejects writes entirely.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` (or another storage error) when
    /// the medium cannot take writes.
    async fn probe(&self) -> Result<(), StorageError>;
}

/// On-device user identity records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All known user profiles.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium fails.
    async fn list(&self) -> Result<Vec<UserProfile>, StorageError>;

    /// Insert or update an identity record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert(&self, profile: &UserProfile) -> Result<(), StorageError>;

    /// Remove an identity record. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium fails.
    async fn delete(&self, user: UserId) -> Result<(), StorageError>;
}

/// In-memory implementation for tests and prototyping.
///
/// Payloads are stored as JSON strings so the serialization path is
/// exercised the same way the real medium does. `set_unavailable` simulates
/// a medium that rejects every call (private-browsing style restrictions).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<Mutex<HashMap<UserId, String>>>,
    users: Arc<Mutex<HashMap<UserId, UserProfile>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a medium that rejects all reads and writes.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Overwrite a user's raw payload, bypassing serialization. Lets tests
    /// plant stale or malformed cache contents.
    pub fn inject_payload(&self, user: UserId, payload: impl Into<String>) {
        if let Ok(mut guard) = self.records.lock() {
            guard.insert(user, payload.into());
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("medium rejected access".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressCacheRepository for InMemoryStore {
    async fn read(&self, user: UserId) -> Result<Option<PartialProgress>, StorageError> {
        self.check_available()?;
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.get(&user) {
            Some(payload) => serde_json::from_str(payload)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn write(&self, user: UserId, progress: &Progress) -> Result<(), StorageError> {
        self.check_available()?;
        let payload = serde_json::to_string(progress)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(user, payload);
        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&user);
        Ok(())
    }

    async fn probe(&self) -> Result<(), StorageError> {
        self.check_available()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<UserProfile>, StorageError> {
        self.check_available()?;
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut profiles: Vec<UserProfile> = guard.values().cloned().collect();
        profiles.sort_by_key(|p| p.id);
        Ok(profiles)
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&user);
        Ok(())
    }
}

/// Aggregates the cache repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressCacheRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        let progress: Arc<dyn ProgressCacheRepository> = Arc::new(store.clone());
        let users: Arc<dyn UserRepository> = Arc::new(store);
        Self { progress, users }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::model::WordId;

    #[tokio::test]
    async fn round_trips_an_aggregate() {
        let store = InMemoryStore::new();
        let user = UserId::new(1);

        let mut progress = Progress::default();
        progress.mark_learned(WordId::new(42));
        store.write(user, &progress).await.unwrap();

        let partial = store.read(user).await.unwrap().expect("cached copy");
        let restored = Progress::from_partial(partial);
        assert!(restored.is_learned(WordId::new(42)));
        assert_eq!(restored.stats().total_words_learned, 1);
    }

    #[tokio::test]
    async fn absent_user_reads_as_none() {
        let store = InMemoryStore::new();
        assert!(store.read(UserId::new(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_medium_fails_probe_and_calls() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        assert!(matches!(
            store.probe().await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.write(UserId::new(1), &Progress::default()).await.is_err());
        assert!(store.read(UserId::new(1)).await.is_err());
    }

    #[tokio::test]
    async fn malformed_payload_reads_as_serialization_error() {
        let store = InMemoryStore::new();
        let user = UserId::new(3);
        store.inject_payload(user, "{not json");

        assert!(matches!(
            store.read(user).await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn user_profiles_round_trip_sorted() {
        let store = InMemoryStore::new();
        store
            .upsert(&UserProfile::new(UserId::new(2), "Beth"))
            .await
            .unwrap();
        store
            .upsert(&UserProfile::new(UserId::new(1), "Avery"))
            .await
            .unwrap();

        let users = store.list().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Avery");

        UserRepository::delete(&store, UserId::new(1)).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
