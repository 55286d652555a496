#![forbid(unsafe_code)]

pub mod accounts;
pub mod app_services;
pub mod error;
pub mod progress_store;
pub mod remote;
pub mod session_tracker;
pub mod statistics;
pub mod tier;

pub use vocab_core::Clock;

pub use accounts::AccountService;
pub use app_services::AppServices;
pub use error::{
    AccountError, AppServicesError, CertificationError, RemoteError, SessionFlushError, StoreError,
};
pub use progress_store::ProgressStore;
pub use remote::{HttpRemoteClient, RemoteConfig, VocabApi};
pub use session_tracker::{FlushOutcome, StudySessionTracker};
pub use statistics::LearningOverview;
pub use tier::PersistenceTier;
