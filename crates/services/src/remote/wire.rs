//! Request/response shapes for the remote progress service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vocab_core::model::{LearningStats, UserId, UserProfile, WordId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MarkLearnedRequest {
    pub word_id: WordId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QuizResultRequest {
    pub word_id: WordId,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StreakRequest {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
}

impl StreakRequest {
    pub(super) fn from_stats(stats: &LearningStats) -> Self {
        Self {
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            last_study_date: stats.last_study_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PreferenceRequest<'a> {
    pub value: &'a Value,
}

#[derive(Debug, Serialize)]
pub(super) struct RegisterRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct RegisterResponse {
    pub id: u64,
    pub name: String,
}

impl RegisterResponse {
    pub(super) fn into_profile(self) -> UserProfile {
        UserProfile::new(UserId::new(self.id), self.name)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CertificationRequest<'a> {
    pub key: &'a str,
}
