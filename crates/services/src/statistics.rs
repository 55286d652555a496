//! Read-only derived views over the progress aggregate.
//!
//! Everything here is recomputed from the live aggregate on each call; the
//! store's snapshot is the only cache.

use chrono::{DateTime, Duration, Utc};

use vocab_core::model::Progress;

/// Headline figures for a stats screen.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningOverview {
    /// Share of the vocabulary marked learned, 0-100.
    pub percent_learned: f64,
    /// Words learned across sessions in the trailing seven days.
    pub words_learned_this_week: u32,
    /// Average quiz accuracy across all words, 0-100; zero with no attempts.
    pub average_quiz_score: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_time_spent_secs: u64,
    pub streak_label: String,
}

impl LearningOverview {
    /// Compute the overview from the aggregate.
    ///
    /// `total_words` is the size of the loaded vocabulary; zero yields a
    /// zero percentage rather than a division error.
    #[must_use]
    pub fn compute(progress: &Progress, now: DateTime<Utc>, total_words: u32) -> Self {
        let learned = progress.learned_count() as f64;
        let percent_learned = if total_words == 0 {
            0.0
        } else {
            learned / f64::from(total_words) * 100.0
        };

        let week_ago = now - Duration::days(7);
        let words_learned_this_week = progress
            .sessions()
            .iter()
            .filter(|record| record.date() >= week_ago)
            .fold(0_u32, |acc, record| {
                acc.saturating_add(record.words_learned())
            });

        let (correct, attempts) = progress.quiz_scores().values().fold(
            (0_u64, 0_u64),
            |(correct, attempts), score| {
                (
                    correct + u64::from(score.correct),
                    attempts + u64::from(score.attempts),
                )
            },
        );
        let average_quiz_score = if attempts == 0 {
            0.0
        } else {
            correct as f64 / attempts as f64 * 100.0
        };

        let stats = progress.stats();
        Self {
            percent_learned,
            words_learned_this_week,
            average_quiz_score,
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            total_time_spent_secs: stats.total_time_spent_secs,
            streak_label: streak_label(stats.current_streak),
        }
    }
}

fn streak_label(current_streak: u32) -> String {
    match current_streak {
        0 => "No streak yet".to_string(),
        1 => "1 day".to_string(),
        n => format!("{n} days"),
    }
}
