//! Fallback and consistency behavior of the progress store, driven through
//! a scripted fake remote and the in-memory local cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use services::error::{RemoteError, StoreError};
use services::progress_store::ProgressStore;
use services::remote::VocabApi;
use services::tier::PersistenceTier;
use storage::repository::{InMemoryStore, ProgressCacheRepository};
use vocab_core::model::{
    LearningStats, PartialProgress, Progress, SessionRecord, Theme, UserId, UserProfile, WordId,
};
use vocab_core::time::{fixed_clock, fixed_now};

/// Scripted remote double. Serves aggregates from an in-memory map and can
/// be switched to fail every call with a server error.
#[derive(Default)]
struct FakeRemote {
    records: Mutex<HashMap<u64, Progress>>,
    fail_all: AtomicBool,
    calls: AtomicU32,
}

impl FakeRemote {
    fn new() -> Self {
        Self::default()
    }

    fn failing() -> Self {
        let remote = Self::default();
        remote.fail_all.store(true, Ordering::SeqCst);
        remote
    }

    fn seed(&self, user: UserId, progress: Progress) {
        self.records
            .lock()
            .unwrap()
            .insert(user.value(), progress);
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(RemoteError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(())
    }
}

#[async_trait]
impl VocabApi for FakeRemote {
    async fn fetch_progress(&self, user: UserId) -> Result<PartialProgress, RemoteError> {
        self.gate()?;
        let guard = self.records.lock().unwrap();
        let Some(progress) = guard.get(&user.value()) else {
            return Err(RemoteError::NotFound);
        };
        let value = serde_json::to_value(progress).unwrap();
        Ok(serde_json::from_value(value).unwrap())
    }

    async fn replace_progress(
        &self,
        user: UserId,
        progress: &Progress,
    ) -> Result<(), RemoteError> {
        self.gate()?;
        self.seed(user, progress.clone());
        Ok(())
    }

    async fn mark_learned(&self, _user: UserId, _word: WordId) -> Result<(), RemoteError> {
        self.gate()
    }

    async fn unmark_learned(&self, _user: UserId, _word: WordId) -> Result<(), RemoteError> {
        self.gate()
    }

    async fn submit_quiz_result(
        &self,
        _user: UserId,
        _word: WordId,
        _correct: bool,
    ) -> Result<(), RemoteError> {
        self.gate()
    }

    async fn append_session(
        &self,
        _user: UserId,
        _record: &SessionRecord,
    ) -> Result<(), RemoteError> {
        self.gate()
    }

    async fn update_streak(
        &self,
        _user: UserId,
        _stats: &LearningStats,
    ) -> Result<(), RemoteError> {
        self.gate()
    }

    async fn set_preference(
        &self,
        _user: UserId,
        _key: &str,
        _value: &Value,
    ) -> Result<(), RemoteError> {
        self.gate()
    }

    async fn register_user(&self, name: &str) -> Result<UserProfile, RemoteError> {
        self.gate()?;
        Ok(UserProfile::new(UserId::new(99), name))
    }

    async fn delete_user(&self, user: UserId) -> Result<(), RemoteError> {
        self.gate()?;
        self.records.lock().unwrap().remove(&user.value());
        Ok(())
    }

    async fn activate_certification(&self, _user: UserId, _key: &str) -> Result<(), RemoteError> {
        self.gate()
    }
}

/// An authorization-failing remote, to pin down that credential rejection
/// is treated as an outage (fall back to local), not as a missing record.
struct UnauthorizedRemote;

#[async_trait]
impl VocabApi for UnauthorizedRemote {
    async fn fetch_progress(&self, _user: UserId) -> Result<PartialProgress, RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn replace_progress(
        &self,
        _user: UserId,
        _progress: &Progress,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn mark_learned(&self, _user: UserId, _word: WordId) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn unmark_learned(&self, _user: UserId, _word: WordId) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn submit_quiz_result(
        &self,
        _user: UserId,
        _word: WordId,
        _correct: bool,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn append_session(
        &self,
        _user: UserId,
        _record: &SessionRecord,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn update_streak(
        &self,
        _user: UserId,
        _stats: &LearningStats,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn set_preference(
        &self,
        _user: UserId,
        _key: &str,
        _value: &Value,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn register_user(&self, _name: &str) -> Result<UserProfile, RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn delete_user(&self, _user: UserId) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }

    async fn activate_certification(&self, _user: UserId, _key: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Unauthorized)
    }
}

fn avery() -> UserProfile {
    UserProfile::new(UserId::new(1), "Avery")
}

async fn store_with(
    remote: Option<Arc<dyn VocabApi>>,
    local: &InMemoryStore,
) -> ProgressStore {
    let mut store = ProgressStore::new(remote, Arc::new(local.clone()), fixed_clock()).await;
    store.set_current_user(avery());
    store
}

#[tokio::test]
async fn fresh_user_starts_from_defaults() {
    let local = InMemoryStore::new();
    let mut store = store_with(None, &local).await;

    {
        let progress = store.get().await.unwrap();
        assert!(progress.learned().is_empty());
        assert_eq!(progress.stats().total_words_learned, 0);
    }

    assert!(store.mark_learned(WordId::new(42)).await.unwrap());
    assert!(store.is_learned(WordId::new(42)).await.unwrap());
    assert_eq!(store.learned_count().await.unwrap(), 1);
}

#[tokio::test]
async fn remote_not_found_is_a_new_user_not_an_error() {
    let remote = Arc::new(FakeRemote::new());
    let local = InMemoryStore::new();
    let mut store = store_with(Some(remote.clone() as Arc<dyn VocabApi>), &local).await;

    let progress = store.get().await.unwrap();
    assert!(progress.learned().is_empty());
    // Not-found is not an outage: the remote tier stays preferred.
    assert!(store.tier().remote_active());
}

#[tokio::test]
async fn remote_record_is_merged_and_mirrored_locally() {
    let remote = Arc::new(FakeRemote::new());
    let user = avery();
    let mut seeded = Progress::default();
    seeded.mark_learned(WordId::new(3));
    seeded.mark_learned(WordId::new(5));
    remote.seed(user.id, seeded);

    let local = InMemoryStore::new();
    let mut store = store_with(Some(remote as Arc<dyn VocabApi>), &local).await;

    let progress = store.get().await.unwrap();
    assert!(progress.is_learned(WordId::new(3)));
    assert_eq!(progress.stats().total_words_learned, 2);

    // The fetch mirrored a full copy into the local cache.
    let cached = local.read(user.id).await.unwrap().expect("mirrored copy");
    let restored = Progress::from_partial(cached);
    assert!(restored.is_learned(WordId::new(5)));
}

#[tokio::test]
async fn failing_remote_degrades_once_and_stays_degraded() {
    let remote = Arc::new(FakeRemote::failing());
    let local = InMemoryStore::new();
    let mut store = store_with(Some(remote.clone() as Arc<dyn VocabApi>), &local).await;

    // get() swallows the failure and serves defaults.
    {
        let progress = store.get().await.unwrap();
        assert!(progress.learned().is_empty());
    }
    assert_eq!(remote.calls(), 1);
    assert!(!store.tier().remote_active());

    // Mutations after the demotion never touch the remote again.
    assert!(store.mark_learned(WordId::new(7)).await.unwrap());
    let progress = store.get().await.unwrap();
    assert!(progress.is_learned(WordId::new(7)));
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn granular_write_failure_falls_back_to_local() {
    let remote = Arc::new(FakeRemote::new());
    let user = avery();
    remote.seed(user.id, Progress::default());

    let local = InMemoryStore::new();
    let mut store = store_with(Some(remote.clone() as Arc<dyn VocabApi>), &local).await;
    store.get().await.unwrap();

    // Remote starts failing after the initial fetch.
    remote.fail_all.store(true, Ordering::SeqCst);

    assert!(store.mark_learned(WordId::new(11)).await.unwrap());
    assert!(!store.tier().remote_active());

    // The full aggregate still landed in the local cache.
    let cached = local.read(user.id).await.unwrap().expect("local fallback");
    assert!(Progress::from_partial(cached).is_learned(WordId::new(11)));
}

#[tokio::test]
async fn unauthorized_remote_falls_back_to_local_data() {
    let user = avery();
    let local = InMemoryStore::new();
    let mut cached = Progress::default();
    cached.mark_learned(WordId::new(3));
    local.write(user.id, &cached).await.unwrap();

    let mut store = store_with(Some(Arc::new(UnauthorizedRemote) as Arc<dyn VocabApi>), &local).await;

    // Credential rejection is an outage, not a missing record: the cached
    // copy wins over fresh defaults.
    let progress = store.get().await.unwrap();
    assert!(progress.is_learned(WordId::new(3)));
    assert!(!store.tier().remote_active());
}

#[tokio::test]
async fn unavailable_local_medium_means_memory_only() {
    let local = InMemoryStore::new();
    local.set_unavailable(true);
    let mut store = store_with(None, &local).await;

    assert_eq!(store.tier(), PersistenceTier::MemoryOnly);

    // Nothing throws; the in-memory snapshot carries the session.
    assert!(store.mark_learned(WordId::new(1)).await.unwrap());
    store.update_quiz_score(WordId::new(1), true).await.unwrap();
    assert!(store.is_learned(WordId::new(1)).await.unwrap());
}

#[tokio::test]
async fn stale_local_copy_gains_new_preference_defaults() {
    let user = avery();
    let local = InMemoryStore::new();
    // Written by an older build: no swipeEnabled, no translationLanguages.
    local.inject_payload(
        user.id,
        r#"{"learned":[4],"preferences":{"theme":"dark"}}"#,
    );

    let mut store = store_with(None, &local).await;
    let progress = store.get().await.unwrap();

    assert!(progress.is_learned(WordId::new(4)));
    assert_eq!(progress.preferences().theme, Theme::Dark);
    assert!(progress.preferences().swipe_enabled);
    assert_eq!(
        progress.preferences().translation_languages,
        vec!["es".to_string()]
    );
}

#[tokio::test]
async fn malformed_local_copy_reads_as_defaults_without_degrading() {
    let user = avery();
    let local = InMemoryStore::new();
    local.inject_payload(user.id, "{corrupt");

    let mut store = store_with(None, &local).await;
    {
        let progress = store.get().await.unwrap();
        assert!(progress.learned().is_empty());
    }
    // Unreadable payload is absence, not a medium failure.
    assert!(store.tier().local_active());
}

#[tokio::test]
async fn session_history_is_capped_through_the_store() {
    let local = InMemoryStore::new();
    let mut store = store_with(None, &local).await;

    for _ in 0..35 {
        let record = SessionRecord::new(fixed_now(), 15, 3, 1, 0, 0).unwrap();
        store.add_session(record).await.unwrap();
    }

    assert_eq!(store.get().await.unwrap().sessions().len(), 30);
}

#[tokio::test]
async fn streak_arithmetic_through_the_store() {
    use chrono::Duration;
    use vocab_core::model::StreakChange;

    let local = InMemoryStore::new();

    // Yesterday's study extends to today's.
    let mut store = store_with(None, &local).await;
    let mut progress = Progress::default();
    progress.advance_streak((fixed_now() - Duration::days(1)).date_naive());
    store.save(progress).await.unwrap();

    assert_eq!(
        store.update_streak().await.unwrap(),
        StreakChange::Extended
    );
    assert_eq!(store.get().await.unwrap().stats().current_streak, 2);

    // A second update the same day changes nothing.
    assert_eq!(
        store.update_streak().await.unwrap(),
        StreakChange::AlreadyCounted
    );
    assert_eq!(store.get().await.unwrap().stats().current_streak, 2);

    // A three-day gap resets to one but keeps the longest figure.
    let mut store = store_with(None, &local).await;
    store.set_current_user(UserProfile::new(UserId::new(2), "Beth"));
    let mut progress = Progress::default();
    progress.advance_streak((fixed_now() - Duration::days(4)).date_naive());
    progress.advance_streak((fixed_now() - Duration::days(3)).date_naive());
    store.save(progress).await.unwrap();

    assert_eq!(store.update_streak().await.unwrap(), StreakChange::Reset);
    let stats = store.get().await.unwrap().stats().clone();
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 2);
}

#[tokio::test]
async fn save_is_read_coherent_even_when_everything_fails() {
    let remote = Arc::new(FakeRemote::failing());
    let local = InMemoryStore::new();
    local.set_unavailable(true);
    let mut store = store_with(Some(remote as Arc<dyn VocabApi>), &local).await;

    let mut progress = Progress::default();
    progress.mark_learned(WordId::new(8));
    store.save(progress).await.unwrap();

    assert!(store.is_learned(WordId::new(8)).await.unwrap());
    assert_eq!(store.tier(), PersistenceTier::MemoryOnly);
}

#[tokio::test]
async fn no_user_selected_is_the_only_read_error() {
    let local = InMemoryStore::new();
    let mut store = ProgressStore::new(None, Arc::new(local), fixed_clock()).await;
    assert!(matches!(store.get().await, Err(StoreError::NoUserSelected)));
    assert!(matches!(
        store.mark_learned(WordId::new(1)).await,
        Err(StoreError::NoUserSelected)
    ));
}

#[tokio::test]
async fn registration_keeps_the_remote_identity_on_device() {
    use services::accounts::AccountService;

    let remote = Arc::new(FakeRemote::new());
    let local = InMemoryStore::new();
    let accounts = AccountService::new(
        Arc::new(local.clone()),
        Arc::new(local.clone()),
        Some(remote.clone() as Arc<dyn VocabApi>),
    );

    let profile = accounts.register("Avery").await.unwrap();
    assert_eq!(profile.id, UserId::new(99));

    let listed = accounts.list().await.unwrap();
    assert_eq!(listed, vec![profile.clone()]);

    // Delete removes the remote record, the cached aggregate, and the
    // identity record.
    remote.seed(profile.id, Progress::default());
    local.write(profile.id, &Progress::default()).await.unwrap();
    accounts.delete(profile.id).await.unwrap();
    assert!(accounts.list().await.unwrap().is_empty());
    assert!(local.read(profile.id).await.unwrap().is_none());
    assert!(remote.records.lock().unwrap().is_empty());
}
