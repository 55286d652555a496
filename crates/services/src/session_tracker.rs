//! Accumulates wall-clock study time and in-session counters, flushing
//! them into the progress store as session records plus a streak update.
//!
//! The tracker owns nothing durable — only the running start timestamp and
//! counters. Persistence is entirely the store's job, so a degraded store
//! still keeps the session in its in-memory aggregate and study time is
//! never silently dropped within a live session.

use chrono::{DateTime, Utc};

use vocab_core::model::{SessionRecord, StreakChange};

use crate::error::SessionFlushError;
use crate::progress_store::ProgressStore;

/// Sessions shorter than this are noise (a stray tab focus) and are not
/// recorded.
pub const MIN_SESSION_SECS: i64 = 10;

/// How often callers are expected to flush; `flush_if_due` gates on this.
pub const FLUSH_INTERVAL_SECS: i64 = 30;

/// Result of a flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// A session record was appended and the streak advanced.
    Recorded(StreakChange),
    /// Below the minimum meaningful duration; counters keep accumulating.
    TooShort,
    /// The flush interval has not elapsed yet (only from `flush_if_due`).
    NotDue,
}

/// Tracks one user's live study session.
pub struct StudySessionTracker {
    session_start: DateTime<Utc>,
    words_studied: u32,
    words_learned: u32,
    quizzes_taken: u32,
    quiz_score_total: u32,
}

impl StudySessionTracker {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            session_start: started_at,
            words_studied: 0,
            words_learned: 0,
            quizzes_taken: 0,
            quiz_score_total: 0,
        }
    }

    pub fn note_word_studied(&mut self) {
        self.words_studied = self.words_studied.saturating_add(1);
    }

    pub fn note_word_learned(&mut self) {
        self.words_learned = self.words_learned.saturating_add(1);
    }

    /// Record a completed quiz with its percentage score.
    pub fn note_quiz(&mut self, score_percent: u32) {
        self.quizzes_taken = self.quizzes_taken.saturating_add(1);
        self.quiz_score_total = self
            .quiz_score_total
            .saturating_add(score_percent.min(100));
    }

    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.session_start).num_seconds()
    }

    /// Flush only once the interval has elapsed. Call this from the
    /// periodic tick; call [`flush`](Self::flush) directly on
    /// visibility-loss or shutdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionFlushError` if the store has no selected user or the
    /// record cannot be built.
    pub async fn flush_if_due(
        &mut self,
        store: &mut ProgressStore,
        now: DateTime<Utc>,
    ) -> Result<FlushOutcome, SessionFlushError> {
        if self.elapsed_secs(now) < FLUSH_INTERVAL_SECS {
            return Ok(FlushOutcome::NotDue);
        }
        self.flush(store, now).await
    }

    /// Append the accumulated session to the store and advance the streak,
    /// then restart the tracker at `now` so overlapping flushes cannot
    /// double-count time.
    ///
    /// # Errors
    ///
    /// Returns `SessionFlushError` if the store has no selected user or the
    /// record cannot be built.
    pub async fn flush(
        &mut self,
        store: &mut ProgressStore,
        now: DateTime<Utc>,
    ) -> Result<FlushOutcome, SessionFlushError> {
        let elapsed = self.elapsed_secs(now);
        if elapsed < MIN_SESSION_SECS {
            return Ok(FlushOutcome::TooShort);
        }

        let duration_secs = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let quiz_score = if self.quizzes_taken == 0 {
            0
        } else {
            self.quiz_score_total / self.quizzes_taken
        };
        let record = SessionRecord::new(
            now,
            duration_secs,
            self.words_studied,
            self.words_learned,
            self.quizzes_taken,
            quiz_score,
        )?;

        store.add_session(record).await?;
        let change = store.update_streak().await?;

        self.session_start = now;
        self.words_studied = 0;
        self.words_learned = 0;
        self.quizzes_taken = 0;
        self.quiz_score_total = 0;

        Ok(FlushOutcome::Recorded(change))
    }
}
