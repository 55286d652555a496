use std::sync::Arc;

use storage::repository::Storage;
use vocab_core::Clock;

use crate::accounts::AccountService;
use crate::error::AppServicesError;
use crate::progress_store::ProgressStore;
use crate::remote::{HttpRemoteClient, RemoteConfig, VocabApi};

/// Assembles the store and its collaborators for the application.
///
/// This is the composition root's view of the crate: one explicit store
/// instance wired with injected remote/local backends, owned here and
/// passed by reference to consumers.
pub struct AppServices {
    store: ProgressStore,
    accounts: AccountService,
    clock: Clock,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and, when configured, the
    /// remote progress service.
    ///
    /// A missing remote config means a local-only session, not an error;
    /// an unavailable local medium is detected here (one probe) and leaves
    /// the session in-memory only.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        remote: Option<RemoteConfig>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::assemble(storage, remote, clock).await)
    }

    /// Build services over an already-constructed storage backend. Lets
    /// tests inject the in-memory implementation.
    pub async fn assemble(storage: Storage, remote: Option<RemoteConfig>, clock: Clock) -> Self {
        let remote_api: Option<Arc<dyn VocabApi>> = remote
            .map(|config| Arc::new(HttpRemoteClient::new(config)) as Arc<dyn VocabApi>);

        let store = ProgressStore::new(
            remote_api.clone(),
            Arc::clone(&storage.progress),
            clock,
        )
        .await;
        let accounts = AccountService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.progress),
            remote_api,
        );

        Self {
            store,
            accounts,
            clock,
        }
    }

    pub fn store(&mut self) -> &mut ProgressStore {
        &mut self.store
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }
}
