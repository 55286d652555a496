//! Deep merge of partially-populated aggregates over current defaults.
//!
//! Both persistence tiers hand back JSON written by whatever build was
//! running at the time. The partial mirrors below accept any subset of the
//! current schema (unknown keys are kept in the preference escape hatch,
//! missing keys fall back to defaults) so an old cached copy never loses a
//! newly introduced setting and never fails to load.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::model::progress::MAX_SESSIONS;
use crate::model::{
    LearningStats, Preferences, Progress, QuizScore, SessionRecord, Theme, WordId,
};

/// Partial mirror of [`Preferences`]; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialPreferences {
    pub theme: Option<Theme>,
    pub speech_rate: Option<f32>,
    pub auto_play: Option<bool>,
    pub reverse_mode: Option<bool>,
    pub translation_languages: Option<Vec<String>>,
    pub certification_key: Option<String>,
    pub swipe_enabled: Option<bool>,
    pub show_front_translation: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PartialPreferences {
    /// Merge key-by-key over `base`, which supplies the defaults.
    #[must_use]
    pub fn merge_over(self, mut base: Preferences) -> Preferences {
        if let Some(theme) = self.theme {
            base.theme = theme;
        }
        if let Some(rate) = self.speech_rate {
            base.speech_rate = rate;
        }
        if let Some(flag) = self.auto_play {
            base.auto_play = flag;
        }
        if let Some(flag) = self.reverse_mode {
            base.reverse_mode = flag;
        }
        if let Some(langs) = self.translation_languages {
            base.translation_languages = langs;
        }
        if let Some(key) = self.certification_key {
            base.certification_key = Some(key);
        }
        if let Some(flag) = self.swipe_enabled {
            base.swipe_enabled = flag;
        }
        if let Some(flag) = self.show_front_translation {
            base.show_front_translation = flag;
        }
        base.extra.extend(self.extra);
        base
    }
}

/// Partial mirror of [`LearningStats`]; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialStats {
    pub total_time_spent_secs: Option<u64>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub last_study_date: Option<NaiveDate>,
    pub total_words_learned: Option<u32>,
    pub total_quizzes_taken: Option<u32>,
}

impl PartialStats {
    #[must_use]
    pub fn merge_over(self, mut base: LearningStats) -> LearningStats {
        if let Some(total) = self.total_time_spent_secs {
            base.total_time_spent_secs = total;
        }
        if let Some(streak) = self.current_streak {
            base.current_streak = streak;
        }
        if let Some(streak) = self.longest_streak {
            base.longest_streak = streak;
        }
        if let Some(date) = self.last_study_date {
            base.last_study_date = Some(date);
        }
        if let Some(count) = self.total_words_learned {
            base.total_words_learned = count;
        }
        if let Some(count) = self.total_quizzes_taken {
            base.total_quizzes_taken = count;
        }
        base
    }
}

/// Partial mirror of the whole aggregate, as read back from either
/// persistence tier.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialProgress {
    pub learned: Option<BTreeSet<WordId>>,
    pub quiz_scores: Option<BTreeMap<WordId, QuizScore>>,
    pub sessions: Option<Vec<SessionRecord>>,
    pub preferences: Option<PartialPreferences>,
    pub stats: Option<PartialStats>,
}

impl Progress {
    /// Deep-merge a partial copy over the default aggregate shape.
    ///
    /// Collections are taken wholesale when present (after sanitizing
    /// counters and the session cap); `preferences` and `stats` merge
    /// field-by-field so missing keys land on their defaults. The
    /// learned-count stat is recomputed from the merged learned set.
    #[must_use]
    pub fn from_partial(partial: PartialProgress) -> Self {
        let learned = partial.learned.unwrap_or_default();
        let quiz_scores = partial
            .quiz_scores
            .unwrap_or_default()
            .into_iter()
            .map(|(word, score)| (word, score.sanitized()))
            .collect();
        let mut sessions: Vec<SessionRecord> = partial
            .sessions
            .unwrap_or_default()
            .into_iter()
            .map(SessionRecord::sanitized)
            .collect();
        sessions.truncate(MAX_SESSIONS);

        let preferences = partial
            .preferences
            .unwrap_or_default()
            .merge_over(Preferences::default());
        let stats = partial
            .stats
            .unwrap_or_default()
            .merge_over(LearningStats::default());

        Progress::from_parts(learned, quiz_scores, sessions, preferences, stats)
    }
}
