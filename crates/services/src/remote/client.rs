use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use vocab_core::model::{
    LearningStats, PartialProgress, Progress, SessionRecord, UserId, UserProfile, WordId,
};

use crate::error::RemoteError;
use crate::remote::api::VocabApi;
use crate::remote::wire::{
    CertificationRequest, MarkLearnedRequest, PreferenceRequest, QuizResultRequest,
    RegisterRequest, RegisterResponse, StreakRequest,
};

/// Connection settings for the remote progress service.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    base_url: String,
    token: String,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteConfigError {
    #[error("invalid base URL")]
    InvalidBaseUrl,
}

impl RemoteConfig {
    /// Validate and normalize connection settings.
    ///
    /// # Errors
    ///
    /// Returns `RemoteConfigError::InvalidBaseUrl` if the base URL does not
    /// parse.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, RemoteConfigError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if Url::parse(&base_url).is_err() {
            return Err(RemoteConfigError::InvalidBaseUrl);
        }
        Ok(Self {
            base_url,
            token: token.into(),
        })
    }

    /// Read `VOCAB_API_URL` / `VOCAB_API_TOKEN`. Returns `None` when the
    /// URL is unset or empty, which means a local-only session.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("VOCAB_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let token = env::var("VOCAB_API_TOKEN").unwrap_or_default();
        Self::new(base_url, token).ok()
    }
}

/// `reqwest`-backed client for the remote progress service.
///
/// Attaches the bearer credential to every call and maps response statuses
/// onto the [`RemoteError`] taxonomy so the store can pick the right
/// fallback branch.
#[derive(Clone)]
pub struct HttpRemoteClient {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemoteClient {
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.config.token)
    }

    async fn expect_ok(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(classify_status(status))
    }
}

fn classify_status(status: StatusCode) -> RemoteError {
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        StatusCode::CONFLICT => RemoteError::Conflict,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Invalid,
        other => RemoteError::Status(other),
    }
}

#[async_trait]
impl VocabApi for HttpRemoteClient {
    async fn fetch_progress(&self, user: UserId) -> Result<PartialProgress, RemoteError> {
        let response = self
            .authed(self.client.get(self.url(&format!("/users/{user}/progress"))))
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        Ok(response.json().await?)
    }

    async fn replace_progress(
        &self,
        user: UserId,
        progress: &Progress,
    ) -> Result<(), RemoteError> {
        let response = self
            .authed(self.client.put(self.url(&format!("/users/{user}/progress"))))
            .json(progress)
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn mark_learned(&self, user: UserId, word: WordId) -> Result<(), RemoteError> {
        let response = self
            .authed(
                self.client
                    .post(self.url(&format!("/users/{user}/progress/learned"))),
            )
            .json(&MarkLearnedRequest { word_id: word })
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn unmark_learned(&self, user: UserId, word: WordId) -> Result<(), RemoteError> {
        let response = self
            .authed(
                self.client
                    .delete(self.url(&format!("/users/{user}/progress/learned/{word}"))),
            )
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn submit_quiz_result(
        &self,
        user: UserId,
        word: WordId,
        correct: bool,
    ) -> Result<(), RemoteError> {
        let response = self
            .authed(
                self.client
                    .post(self.url(&format!("/users/{user}/progress/quiz-results"))),
            )
            .json(&QuizResultRequest {
                word_id: word,
                correct,
            })
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn append_session(
        &self,
        user: UserId,
        record: &SessionRecord,
    ) -> Result<(), RemoteError> {
        let response = self
            .authed(
                self.client
                    .post(self.url(&format!("/users/{user}/progress/sessions"))),
            )
            .json(record)
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn update_streak(&self, user: UserId, stats: &LearningStats) -> Result<(), RemoteError> {
        let response = self
            .authed(
                self.client
                    .put(self.url(&format!("/users/{user}/progress/streak"))),
            )
            .json(&StreakRequest::from_stats(stats))
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn set_preference(
        &self,
        user: UserId,
        key: &str,
        value: &Value,
    ) -> Result<(), RemoteError> {
        let response = self
            .authed(
                self.client
                    .put(self.url(&format!("/users/{user}/preferences/{key}"))),
            )
            .json(&PreferenceRequest { value })
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn register_user(&self, name: &str) -> Result<UserProfile, RemoteError> {
        let response = self
            .authed(self.client.post(self.url("/users")))
            .json(&RegisterRequest { name })
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        let body: RegisterResponse = response.json().await?;
        Ok(body.into_profile())
    }

    async fn delete_user(&self, user: UserId) -> Result<(), RemoteError> {
        let response = self
            .authed(self.client.delete(self.url(&format!("/users/{user}"))))
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    async fn activate_certification(&self, user: UserId, key: &str) -> Result<(), RemoteError> {
        let response = self
            .authed(
                self.client
                    .post(self.url(&format!("/users/{user}/certification"))),
            )
            .json(&CertificationRequest { key })
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }
}
