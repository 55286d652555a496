use async_trait::async_trait;
use serde_json::Value;

use vocab_core::model::{
    LearningStats, PartialProgress, Progress, SessionRecord, UserId, UserProfile, WordId,
};

use crate::error::RemoteError;

/// Contract of the remote progress service.
///
/// The service exposes whole-aggregate CRUD plus fine-grained endpoints for
/// the common mutations; the store prefers the fine-grained calls and only
/// falls back to `replace_progress` through its local-save path.
#[async_trait]
pub trait VocabApi: Send + Sync {
    /// Fetch the full aggregate for a user.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotFound` when the user has no record, which
    /// callers treat as a brand-new user rather than a failure.
    async fn fetch_progress(&self, user: UserId) -> Result<PartialProgress, RemoteError>;

    /// Replace the full aggregate for a user.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the write is rejected or transport fails.
    async fn replace_progress(&self, user: UserId, progress: &Progress)
    -> Result<(), RemoteError>;

    /// Mark one word learned.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the write is rejected or transport fails.
    async fn mark_learned(&self, user: UserId, word: WordId) -> Result<(), RemoteError>;

    /// Remove one word from the learned set.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the write is rejected or transport fails.
    async fn unmark_learned(&self, user: UserId, word: WordId) -> Result<(), RemoteError>;

    /// Record one quiz answer for a word.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the write is rejected or transport fails.
    async fn submit_quiz_result(
        &self,
        user: UserId,
        word: WordId,
        correct: bool,
    ) -> Result<(), RemoteError>;

    /// Append one session record to the user's history.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the write is rejected or transport fails.
    async fn append_session(
        &self,
        user: UserId,
        record: &SessionRecord,
    ) -> Result<(), RemoteError>;

    /// Push the current streak figures.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the write is rejected or transport fails.
    async fn update_streak(&self, user: UserId, stats: &LearningStats) -> Result<(), RemoteError>;

    /// Set one preference key.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the write is rejected or transport fails.
    async fn set_preference(
        &self,
        user: UserId,
        key: &str,
        value: &Value,
    ) -> Result<(), RemoteError>;

    /// Register a new user and return the assigned identity.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Conflict` when the name is taken, or other
    /// remote errors.
    async fn register_user(&self, name: &str) -> Result<UserProfile, RemoteError>;

    /// Delete a user and their aggregate.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the delete is rejected or transport fails.
    async fn delete_user(&self, user: UserId) -> Result<(), RemoteError>;

    /// Activate a certification key for a user. The server enforces key
    /// uniqueness, so there is no local fallback for this call.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Conflict` when the key is already claimed,
    /// `RemoteError::Invalid` when it is malformed, or other remote errors.
    async fn activate_certification(&self, user: UserId, key: &str) -> Result<(), RemoteError>;
}
