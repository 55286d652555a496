//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::model::SessionRecordError;

/// Errors surfaced by the remote store client.
///
/// The first four variants classify rejections the caller may branch on;
/// in particular `NotFound` (no record for this user) must stay
/// distinguishable from `Unauthorized` (credential missing or rejected)
/// and from transport failure, because each drives a different fallback.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("no remote record")]
    NotFound,

    #[error("credential missing or rejected")]
    Unauthorized,

    #[error("conflict")]
    Conflict,

    #[error("request rejected as invalid")]
    Invalid,

    #[error("remote request failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    /// True when the failure means "this user has no record yet" — the one
    /// remote failure treated as a brand-new user rather than an outage.
    #[must_use]
    pub fn is_missing_record(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }
}

/// Errors emitted by `ProgressStore`.
///
/// Once a user is selected, reads and routine mutations recover from every
/// persistence failure internally; the only error a caller can see on those
/// paths is the absence of a selected user.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no user selected")]
    NoUserSelected,

    #[error("export serialization failed: {0}")]
    Export(String),
}

/// Errors emitted by certification-key activation.
///
/// Activation needs the server to enforce key uniqueness, so unlike the
/// rest of the store surface it has no local fallback and surfaces remote
/// rejections directly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificationError {
    #[error("no user selected")]
    NoUserSelected,

    #[error("certification requires the remote service")]
    RemoteUnavailable,

    #[error("certification key is already in use")]
    KeyInUse,

    #[error("certification key was rejected")]
    KeyRejected,

    #[error(transparent)]
    Remote(RemoteError),
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error("registration requires the remote service")]
    RemoteUnavailable,

    #[error("user name is already taken")]
    NameTaken,

    #[error(transparent)]
    Remote(RemoteError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while flushing a study session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionFlushError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] SessionRecordError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
