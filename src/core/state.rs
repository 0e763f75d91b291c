use std::sync::Arc;

use anyhow::Result;

use crate::api::attempts::AttemptsApi;
use crate::api::auth::AuthApi;
use crate::api::client::ApiClient;
use crate::api::exams::ExamsApi;
use crate::core::config::Settings;
use crate::services::bookmarks::Bookmarks;
use crate::services::results::ResultsService;
use crate::session::AuthSession;
use crate::storage::KeyValueStore;

/// Everything a screen needs, shared by cheap clone.
#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    session: AuthSession,
    exams: ExamsApi,
    attempts: AttemptsApi,
    auth: AuthApi,
    bookmarks: Bookmarks,
}

impl AppState {
    pub(crate) fn new(settings: Settings, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let session = AuthSession::restore(store.clone());
        let client = ApiClient::from_settings(&settings, session.clone())?;

        let exams = ExamsApi::new(client.clone());
        let attempts = AttemptsApi::new(client.clone());
        let auth = AuthApi::new(client, settings.session().default_token_ttl_seconds);
        let bookmarks = Bookmarks::new(store);

        Ok(Self {
            inner: Arc::new(InnerState { settings, session, exams, attempts, auth, bookmarks }),
        })
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    pub(crate) fn exams(&self) -> &ExamsApi {
        &self.inner.exams
    }

    pub(crate) fn attempts(&self) -> &AttemptsApi {
        &self.inner.attempts
    }

    pub(crate) fn auth(&self) -> &AuthApi {
        &self.inner.auth
    }

    pub(crate) fn bookmarks(&self) -> &Bookmarks {
        &self.inner.bookmarks
    }

    pub(crate) fn results(&self) -> ResultsService {
        ResultsService::new(self.inner.exams.clone(), self.inner.attempts.clone())
    }
}
