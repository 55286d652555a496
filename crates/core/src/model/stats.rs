use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of a streak update, useful for display and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First qualifying study day ever.
    Started,
    /// Studied yesterday as well; streak grew by one.
    Extended,
    /// Already counted a session today; streak unchanged.
    AlreadyCounted,
    /// Gap of more than one day; streak restarted at one.
    Reset,
}

/// Cached summary figures derived from the rest of the aggregate.
///
/// `total_words_learned` is kept equal to the size of the learned set by
/// the aggregate's mutators; the remaining fields accumulate as sessions
/// are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningStats {
    pub total_time_spent_secs: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
    pub total_words_learned: u32,
    pub total_quizzes_taken: u32,
}

impl Default for LearningStats {
    fn default() -> Self {
        Self {
            total_time_spent_secs: 0,
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
            total_words_learned: 0,
            total_quizzes_taken: 0,
        }
    }
}

impl LearningStats {
    /// Advance the day-based streak for a study session happening `today`.
    ///
    /// A second call on the same day is a no-op; a study day immediately
    /// following the previous one extends the streak; any longer gap
    /// restarts it at one. `longest_streak` tracks the maximum ever
    /// observed.
    pub fn advance_streak(&mut self, today: NaiveDate) -> StreakChange {
        let change = match self.last_study_date {
            Some(last) if last == today => StreakChange::AlreadyCounted,
            Some(last) if (today - last).num_days() == 1 => {
                self.current_streak = self.current_streak.saturating_add(1);
                StreakChange::Extended
            }
            Some(_) => {
                self.current_streak = 1;
                StreakChange::Reset
            }
            None => {
                self.current_streak = 1;
                StreakChange::Started
            }
        };

        self.last_study_date = Some(today);
        self.longest_streak = self.longest_streak.max(self.current_streak);
        change
    }
}
