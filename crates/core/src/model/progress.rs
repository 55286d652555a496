use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::model::{
    LearningStats, PreferenceUpdate, Preferences, SessionRecord, StreakChange, WordId,
};

/// Maximum number of session records retained in the aggregate.
pub const MAX_SESSIONS: usize = 30;

/// Correct/attempt counters for quizzes on a single word.
///
/// Counters only ever grow, and `correct <= attempts` holds for every value
/// produced by [`QuizScore::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: u32,
    pub attempts: u32,
}

impl QuizScore {
    /// Count one quiz answer.
    pub fn record(&mut self, correct: bool) {
        self.attempts = self.attempts.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    /// Restore `correct <= attempts` for values read from external data.
    #[must_use]
    pub(crate) fn sanitized(self) -> Self {
        Self {
            correct: self.correct.min(self.attempts),
            attempts: self.attempts,
        }
    }
}

/// The complete learning state for one user.
///
/// This is the unit of persistence for both the remote store and the local
/// cache. All mutation goes through methods that keep the derived figures
/// in `stats` consistent with the underlying collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    learned: BTreeSet<WordId>,
    quiz_scores: BTreeMap<WordId, QuizScore>,
    sessions: Vec<SessionRecord>,
    preferences: Preferences,
    stats: LearningStats,
}

impl Progress {
    /// Mark a word as learned.
    ///
    /// Returns `false` without changing anything when the word is already
    /// in the learned set.
    pub fn mark_learned(&mut self, word: WordId) -> bool {
        let inserted = self.learned.insert(word);
        if inserted {
            self.sync_learned_count();
        }
        inserted
    }

    /// Remove a word from the learned set.
    ///
    /// Returns `false` without changing anything when the word was not
    /// present.
    pub fn unmark_learned(&mut self, word: WordId) -> bool {
        let removed = self.learned.remove(&word);
        if removed {
            self.sync_learned_count();
        }
        removed
    }

    #[must_use]
    pub fn is_learned(&self, word: WordId) -> bool {
        self.learned.contains(&word)
    }

    #[must_use]
    pub fn learned_count(&self) -> usize {
        self.learned.len()
    }

    /// Count one quiz answer for a word.
    pub fn record_quiz_answer(&mut self, word: WordId, correct: bool) {
        self.quiz_scores.entry(word).or_default().record(correct);
    }

    #[must_use]
    pub fn quiz_score(&self, word: WordId) -> Option<QuizScore> {
        self.quiz_scores.get(&word).copied()
    }

    /// Append a session record at the front of the history, evicting the
    /// oldest entry beyond [`MAX_SESSIONS`], and fold its totals into the
    /// cached stats.
    pub fn push_session(&mut self, record: SessionRecord) {
        self.stats.total_time_spent_secs = self
            .stats
            .total_time_spent_secs
            .saturating_add(u64::from(record.duration_secs()));
        self.stats.total_quizzes_taken = self
            .stats
            .total_quizzes_taken
            .saturating_add(record.quizzes_taken());

        self.sessions.insert(0, record);
        self.sessions.truncate(MAX_SESSIONS);
    }

    /// Advance the day-based streak for a study session happening `today`.
    pub fn advance_streak(&mut self, today: NaiveDate) -> StreakChange {
        self.stats.advance_streak(today)
    }

    /// Apply a preference update.
    pub fn apply_preference(&mut self, update: PreferenceUpdate) {
        update.apply(&mut self.preferences);
    }

    /// Record a certification key accepted by the remote service.
    pub fn set_certification_key(&mut self, key: String) {
        self.preferences.certification_key = Some(key);
    }

    #[must_use]
    pub fn learned(&self) -> &BTreeSet<WordId> {
        &self.learned
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<WordId, QuizScore> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    #[must_use]
    pub fn stats(&self) -> &LearningStats {
        &self.stats
    }

    /// Rebuild from parts that already satisfy the aggregate invariants.
    ///
    /// Used by the deep-merge path; callers are expected to have sanitized
    /// the collections first.
    pub(crate) fn from_parts(
        learned: BTreeSet<WordId>,
        quiz_scores: BTreeMap<WordId, QuizScore>,
        sessions: Vec<SessionRecord>,
        preferences: Preferences,
        mut stats: LearningStats,
    ) -> Self {
        // The learned-count invariant is re-established here so a divergent
        // cached copy cannot smuggle in a stale figure.
        stats.total_words_learned = u32::try_from(learned.len()).unwrap_or(u32::MAX);
        Self {
            learned,
            quiz_scores,
            sessions,
            preferences,
            stats,
        }
    }

    fn sync_learned_count(&mut self) {
        self.stats.total_words_learned = u32::try_from(self.learned.len()).unwrap_or(u32::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn session(duration_secs: u32, quizzes_taken: u32) -> SessionRecord {
        SessionRecord::new(fixed_now(), duration_secs, 10, 2, quizzes_taken, 75).unwrap()
    }

    #[test]
    fn mark_learned_is_idempotent() {
        let mut progress = Progress::default();
        assert!(progress.mark_learned(WordId::new(42)));
        assert!(!progress.mark_learned(WordId::new(42)));
        assert_eq!(progress.learned_count(), 1);
        assert!(progress.is_learned(WordId::new(42)));
    }

    #[test]
    fn unmark_learned_is_idempotent() {
        let mut progress = Progress::default();
        progress.mark_learned(WordId::new(7));
        assert!(progress.unmark_learned(WordId::new(7)));
        assert!(!progress.unmark_learned(WordId::new(7)));
        assert_eq!(progress.learned_count(), 0);
    }

    #[test]
    fn learned_count_stat_tracks_the_set() {
        let mut progress = Progress::default();
        for id in 1..=5 {
            progress.mark_learned(WordId::new(id));
            assert_eq!(
                progress.stats().total_words_learned as usize,
                progress.learned_count()
            );
        }
        progress.unmark_learned(WordId::new(3));
        assert_eq!(
            progress.stats().total_words_learned as usize,
            progress.learned_count()
        );
    }

    #[test]
    fn quiz_counters_grow_and_stay_consistent() {
        let mut progress = Progress::default();
        let word = WordId::new(9);
        progress.record_quiz_answer(word, true);
        progress.record_quiz_answer(word, false);
        progress.record_quiz_answer(word, true);

        let score = progress.quiz_score(word).unwrap();
        assert_eq!(score.attempts, 3);
        assert_eq!(score.correct, 2);
        assert!(score.correct <= score.attempts);
    }

    #[test]
    fn session_history_is_capped_most_recent_first() {
        let mut progress = Progress::default();
        for i in 0..40u32 {
            let record =
                SessionRecord::new(fixed_now() + chrono::Duration::minutes(i64::from(i)), 15, 1, 0, 0, 0)
                    .unwrap();
            progress.push_session(record);
        }

        assert_eq!(progress.sessions().len(), MAX_SESSIONS);
        // Most recent (i == 39) at the front, oldest retained is i == 10.
        assert_eq!(
            progress.sessions()[0].date(),
            fixed_now() + chrono::Duration::minutes(39)
        );
        assert_eq!(
            progress.sessions()[MAX_SESSIONS - 1].date(),
            fixed_now() + chrono::Duration::minutes(10)
        );
    }

    #[test]
    fn push_session_accumulates_totals() {
        let mut progress = Progress::default();
        progress.push_session(session(120, 1));
        progress.push_session(session(60, 2));
        assert_eq!(progress.stats().total_time_spent_secs, 180);
        assert_eq!(progress.stats().total_quizzes_taken, 3);
    }
}
