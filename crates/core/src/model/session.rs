use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionRecordError {
    #[error("quiz score {score} is out of range (0-100)")]
    ScoreOutOfRange { score: u32 },
}

/// One completed study session as kept in the aggregate's history.
///
/// Records are stored most-recent-first; the aggregate caps the history
/// and evicts from the back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    date: DateTime<Utc>,
    duration_secs: u32,
    words_studied: u32,
    words_learned: u32,
    quizzes_taken: u32,
    quiz_score: u32,
}

impl SessionRecord {
    /// Build a session record.
    ///
    /// `quiz_score` is the average score for quizzes taken during the
    /// session, as a percentage.
    ///
    /// # Errors
    ///
    /// Returns `SessionRecordError::ScoreOutOfRange` if `quiz_score`
    /// exceeds 100.
    pub fn new(
        date: DateTime<Utc>,
        duration_secs: u32,
        words_studied: u32,
        words_learned: u32,
        quizzes_taken: u32,
        quiz_score: u32,
    ) -> Result<Self, SessionRecordError> {
        if quiz_score > 100 {
            return Err(SessionRecordError::ScoreOutOfRange { score: quiz_score });
        }

        Ok(Self {
            date,
            duration_secs,
            words_studied,
            words_learned,
            quizzes_taken,
            quiz_score,
        })
    }

    /// Clamp fields that external data (an old cache, a divergent remote
    /// copy) may have pushed out of range.
    #[must_use]
    pub(crate) fn sanitized(mut self) -> Self {
        self.quiz_score = self.quiz_score.min(100);
        self
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn words_studied(&self) -> u32 {
        self.words_studied
    }

    #[must_use]
    pub fn words_learned(&self) -> u32 {
        self.words_learned
    }

    #[must_use]
    pub fn quizzes_taken(&self) -> u32 {
        self.quizzes_taken
    }

    #[must_use]
    pub fn quiz_score(&self) -> u32 {
        self.quiz_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_score_above_hundred() {
        let result = SessionRecord::new(fixed_now(), 60, 10, 2, 1, 130);
        assert_eq!(
            result.unwrap_err(),
            SessionRecordError::ScoreOutOfRange { score: 130 }
        );
    }

    #[test]
    fn sanitize_clamps_out_of_range_score() {
        let record = SessionRecord::new(fixed_now(), 60, 10, 2, 1, 100).unwrap();
        let mut tampered = record.clone();
        tampered.quiz_score = 250;
        assert_eq!(tampered.sanitized().quiz_score(), 100);
        assert_eq!(record.sanitized().quiz_score(), 100);
    }

    #[test]
    fn exposes_fields() {
        let record = SessionRecord::new(fixed_now(), 45, 12, 3, 2, 80).unwrap();
        assert_eq!(record.duration_secs(), 45);
        assert_eq!(record.words_studied(), 12);
        assert_eq!(record.words_learned(), 3);
        assert_eq!(record.quizzes_taken(), 2);
        assert_eq!(record.quiz_score(), 80);
    }
}
