//! Single point of read/write access to the current user's progress,
//! reconciling the remote service with the on-device cache.
//!
//! The store keeps an in-memory snapshot of the aggregate and routes every
//! read and mutation through it, so callers always observe their own writes
//! regardless of which persistence tiers are still healthy. Failures in
//! either tier demote the [`PersistenceTier`] state machine one way for the
//! rest of the session; an in-memory-only session is a valid degraded mode,
//! not an error.
//!
//! Callers must await each mutation before issuing the next one for the
//! same user. The store serializes state through its snapshot rather than
//! locks, which is sound under that discipline (single event-driven caller)
//! and covered by the crate's integration tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use storage::repository::{ProgressCacheRepository, StorageError};
use vocab_core::Clock;
use vocab_core::model::{
    PreferenceUpdate, Preferences, Progress, SessionRecord, StreakChange, UserId, UserProfile,
    WordId,
};

use crate::error::{CertificationError, RemoteError, StoreError};
use crate::remote::VocabApi;
use crate::tier::PersistenceTier;

/// Unified progress store over a remote service and a local cache.
pub struct ProgressStore {
    remote: Option<Arc<dyn VocabApi>>,
    local: Arc<dyn ProgressCacheRepository>,
    tier: PersistenceTier,
    clock: Clock,
    current_user: Option<UserProfile>,
    snapshot: Option<Progress>,
}

impl ProgressStore {
    /// Build a store and probe the local medium once.
    ///
    /// A failed probe disables the local tier for the session; it never
    /// fails construction. Passing `None` for `remote` starts the session
    /// in local-only mode.
    pub async fn new(
        remote: Option<Arc<dyn VocabApi>>,
        local: Arc<dyn ProgressCacheRepository>,
        clock: Clock,
    ) -> Self {
        let local_available = match local.probe().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("local cache unavailable, continuing without it: {err}");
                false
            }
        };
        let tier = PersistenceTier::new(remote.is_some(), local_available);

        Self {
            remote,
            local,
            tier,
            clock,
            current_user: None,
            snapshot: None,
        }
    }

    /// Select the active user, dropping any snapshot of the previous one.
    pub fn set_current_user(&mut self, profile: UserProfile) {
        self.snapshot = None;
        self.current_user = Some(profile);
    }

    /// Deselect the active user and drop the snapshot.
    pub fn sign_out(&mut self) {
        self.snapshot = None;
        self.current_user = None;
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&UserProfile> {
        self.current_user.as_ref()
    }

    /// Which persistence tiers are still active. Mostly for diagnostics.
    #[must_use]
    pub fn tier(&self) -> PersistenceTier {
        self.tier
    }

    /// The current aggregate: snapshot if warm, else remote, else local,
    /// else defaults.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected; never
    /// fails otherwise.
    pub async fn get(&mut self) -> Result<&Progress, StoreError> {
        let user = self.require_user()?;
        self.ensure_snapshot(user).await;
        Ok(self.snapshot.get_or_insert_with(Progress::default))
    }

    /// Replace the aggregate wholesale and persist it.
    ///
    /// The snapshot is updated before any I/O, so reads issued after this
    /// call resolves (and reads interleaved in the same tick) observe the
    /// new value whatever the persistence outcome.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn save(&mut self, progress: Progress) -> Result<(), StoreError> {
        let user = self.require_user()?;
        self.snapshot = Some(progress);
        self.persist_snapshot(user).await;
        Ok(())
    }

    /// Mark a word learned. Returns `false` (and persists nothing) when it
    /// already was.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn mark_learned(&mut self, word: WordId) -> Result<bool, StoreError> {
        let user = self.require_user()?;
        self.ensure_snapshot(user).await;
        let changed = self
            .snapshot
            .get_or_insert_with(Progress::default)
            .mark_learned(word);
        if !changed {
            return Ok(false);
        }

        if let Some(remote) = self.active_remote() {
            let outcome = remote.mark_learned(user, word).await;
            self.finish_mutation(user, outcome, "mark-learned").await;
        } else {
            self.flush_snapshot_to_local(user).await;
        }
        Ok(true)
    }

    /// Remove a word from the learned set. Returns `false` when it was not
    /// there.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn unmark_learned(&mut self, word: WordId) -> Result<bool, StoreError> {
        let user = self.require_user()?;
        self.ensure_snapshot(user).await;
        let changed = self
            .snapshot
            .get_or_insert_with(Progress::default)
            .unmark_learned(word);
        if !changed {
            return Ok(false);
        }

        if let Some(remote) = self.active_remote() {
            let outcome = remote.unmark_learned(user, word).await;
            self.finish_mutation(user, outcome, "unmark-learned").await;
        } else {
            self.flush_snapshot_to_local(user).await;
        }
        Ok(true)
    }

    /// Whether a word is in the learned set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn is_learned(&mut self, word: WordId) -> Result<bool, StoreError> {
        Ok(self.get().await?.is_learned(word))
    }

    /// Size of the learned set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn learned_count(&mut self) -> Result<usize, StoreError> {
        Ok(self.get().await?.learned_count())
    }

    /// Record one quiz answer for a word.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn update_quiz_score(
        &mut self,
        word: WordId,
        correct: bool,
    ) -> Result<(), StoreError> {
        let user = self.require_user()?;
        self.ensure_snapshot(user).await;
        self.snapshot
            .get_or_insert_with(Progress::default)
            .record_quiz_answer(word, correct);

        if let Some(remote) = self.active_remote() {
            let outcome = remote.submit_quiz_result(user, word, correct).await;
            self.finish_mutation(user, outcome, "quiz-result").await;
        } else {
            self.flush_snapshot_to_local(user).await;
        }
        Ok(())
    }

    /// Append a session record to the history.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn add_session(&mut self, record: SessionRecord) -> Result<(), StoreError> {
        let user = self.require_user()?;
        self.ensure_snapshot(user).await;
        self.snapshot
            .get_or_insert_with(Progress::default)
            .push_session(record.clone());

        if let Some(remote) = self.active_remote() {
            let outcome = remote.append_session(user, &record).await;
            self.finish_mutation(user, outcome, "append-session").await;
        } else {
            self.flush_snapshot_to_local(user).await;
        }
        Ok(())
    }

    /// Advance the day-based streak for today.
    ///
    /// A repeat call on the same day changes nothing and persists nothing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn update_streak(&mut self) -> Result<StreakChange, StoreError> {
        let user = self.require_user()?;
        let today = self.clock.today();
        self.ensure_snapshot(user).await;
        let change = self
            .snapshot
            .get_or_insert_with(Progress::default)
            .advance_streak(today);
        if change == StreakChange::AlreadyCounted {
            return Ok(change);
        }

        let stats = self
            .snapshot
            .get_or_insert_with(Progress::default)
            .stats()
            .clone();
        if let Some(remote) = self.active_remote() {
            let outcome = remote.update_streak(user, &stats).await;
            self.finish_mutation(user, outcome, "update-streak").await;
        } else {
            self.flush_snapshot_to_local(user).await;
        }
        Ok(change)
    }

    /// Set one preference.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn update_preference(
        &mut self,
        update: PreferenceUpdate,
    ) -> Result<(), StoreError> {
        let user = self.require_user()?;
        self.ensure_snapshot(user).await;
        let key = update.key().to_string();
        let value = update.value();
        self.snapshot
            .get_or_insert_with(Progress::default)
            .apply_preference(update);

        if let Some(remote) = self.active_remote() {
            let outcome = remote.set_preference(user, &key, &value).await;
            self.finish_mutation(user, outcome, "set-preference").await;
        } else {
            self.flush_snapshot_to_local(user).await;
        }
        Ok(())
    }

    /// The current preferences.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn preferences(&mut self) -> Result<&Preferences, StoreError> {
        Ok(self.get().await?.preferences())
    }

    /// Activate a certification key.
    ///
    /// The server enforces key uniqueness, so this is the one store
    /// operation without a local fallback: remote rejections surface to the
    /// caller instead of degrading silently.
    ///
    /// # Errors
    ///
    /// Returns `CertificationError::RemoteUnavailable` when the remote tier
    /// is disabled, `KeyInUse`/`KeyRejected` for server rejections, or the
    /// transport error otherwise.
    pub async fn activate_certification(&mut self, key: &str) -> Result<(), CertificationError> {
        let user = self
            .require_user()
            .map_err(|_| CertificationError::NoUserSelected)?;
        let Some(remote) = self.active_remote() else {
            return Err(CertificationError::RemoteUnavailable);
        };

        match remote.activate_certification(user, key).await {
            Ok(()) => {
                self.ensure_snapshot(user).await;
                self.snapshot
                    .get_or_insert_with(Progress::default)
                    .set_certification_key(key.to_string());
                self.flush_snapshot_to_local(user).await;
                Ok(())
            }
            Err(RemoteError::Conflict) => Err(CertificationError::KeyInUse),
            Err(RemoteError::Invalid | RemoteError::NotFound) => {
                Err(CertificationError::KeyRejected)
            }
            Err(err) => {
                if matches!(err, RemoteError::Transport(_) | RemoteError::Status(_)) {
                    tracing::warn!(
                        "remote certification failed; disabling remote for this session: {err}"
                    );
                    self.tier.demote_remote();
                }
                Err(CertificationError::Remote(err))
            }
        }
    }

    /// Serialize the full aggregate (plus the owning profile) to a pretty
    /// JSON artifact suitable for download.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected, or
    /// `StoreError::Export` if serialization fails.
    pub async fn export_data(&mut self) -> Result<String, StoreError> {
        let user = self.current_user.clone().ok_or(StoreError::NoUserSelected)?;
        self.ensure_snapshot(user.id).await;
        let exported_at = self.clock.now();
        let progress = self.snapshot.get_or_insert_with(Progress::default);

        let payload = ExportPayload {
            user: &user,
            exported_at,
            progress,
        };
        serde_json::to_string_pretty(&payload).map_err(|err| StoreError::Export(err.to_string()))
    }

    /// Clear the aggregate back to defaults, through the normal save path.
    /// Confirmation is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoUserSelected` when no user is selected.
    pub async fn reset(&mut self) -> Result<(), StoreError> {
        self.save(Progress::default()).await
    }

    fn require_user(&self) -> Result<UserId, StoreError> {
        self.current_user
            .as_ref()
            .map(|profile| profile.id)
            .ok_or(StoreError::NoUserSelected)
    }

    fn active_remote(&self) -> Option<Arc<dyn VocabApi>> {
        if self.tier.remote_active() {
            self.remote.clone()
        } else {
            None
        }
    }

    async fn ensure_snapshot(&mut self, user: UserId) {
        if self.snapshot.is_none() {
            let loaded = self.load(user).await;
            self.snapshot = Some(loaded);
        }
    }

    /// Resolve the aggregate tier by tier: remote, then local, then
    /// defaults.
    async fn load(&mut self, user: UserId) -> Progress {
        if let Some(remote) = self.active_remote() {
            match remote.fetch_progress(user).await {
                Ok(partial) => {
                    let progress = Progress::from_partial(partial);
                    self.mirror_to_local(user, &progress).await;
                    return progress;
                }
                Err(err) if err.is_missing_record() => {
                    tracing::debug!(user = %user, "no remote record, starting fresh");
                    return Progress::default();
                }
                Err(err) => {
                    tracing::warn!(
                        "remote fetch failed; disabling remote for this session: {err}"
                    );
                    self.tier.demote_remote();
                }
            }
        }
        self.load_local(user).await
    }

    async fn load_local(&mut self, user: UserId) -> Progress {
        if !self.tier.local_active() {
            return Progress::default();
        }
        match self.local.read(user).await {
            Ok(Some(partial)) => Progress::from_partial(partial),
            Ok(None) => Progress::default(),
            Err(StorageError::Serialization(err)) => {
                // Unreadable is treated as absent; the medium itself is fine.
                tracing::warn!(user = %user, "discarding unreadable local copy: {err}");
                Progress::default()
            }
            Err(err) => {
                tracing::warn!("local cache read failed; continuing in memory: {err}");
                self.tier.demote_local();
                Progress::default()
            }
        }
    }

    /// Persist the snapshot through the write path: remote first (with a
    /// local mirror on success), local after a remote demotion, in-memory
    /// when nothing else is left.
    async fn persist_snapshot(&mut self, user: UserId) {
        let Some(progress) = self.snapshot.clone() else {
            return;
        };

        if let Some(remote) = self.active_remote() {
            match remote.replace_progress(user, &progress).await {
                Ok(()) => {
                    self.mirror_to_local(user, &progress).await;
                    return;
                }
                Err(err) => {
                    tracing::warn!(
                        "remote save failed; disabling remote for this session: {err}"
                    );
                    self.tier.demote_remote();
                }
            }
        }
        self.mirror_to_local(user, &progress).await;
    }

    /// Shared tail of every fine-grained mutation: demote the remote tier
    /// if its call failed, then mirror the whole snapshot locally either
    /// way. The fine-grained remote op plus a full local snapshot is the
    /// dual write strategy — the remote API wants targeted updates, the
    /// cache always stores the complete copy.
    async fn finish_mutation(
        &mut self,
        user: UserId,
        outcome: Result<(), RemoteError>,
        op: &'static str,
    ) {
        if let Err(err) = outcome {
            tracing::warn!("remote {op} failed; disabling remote for this session: {err}");
            self.tier.demote_remote();
        }
        self.flush_snapshot_to_local(user).await;
    }

    async fn flush_snapshot_to_local(&mut self, user: UserId) {
        let Some(progress) = self.snapshot.clone() else {
            return;
        };
        self.mirror_to_local(user, &progress).await;
    }

    /// Best-effort local write. Failures are logged, never propagated; a
    /// medium failure (as opposed to a serialization one) flips the local
    /// tier off reactively.
    async fn mirror_to_local(&mut self, user: UserId, progress: &Progress) {
        if !self.tier.local_active() {
            return;
        }
        if let Err(err) = self.local.write(user, progress).await {
            tracing::warn!("local mirror failed: {err}");
            if !matches!(err, StorageError::Serialization(_)) {
                self.tier.demote_local();
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportPayload<'a> {
    user: &'a UserProfile,
    exported_at: DateTime<Utc>,
    progress: &'a Progress,
}
