//! Application controller
//!
//! Owns the session store and dispatches enhancements to a small worker pool.
//! Workers never touch the store: each finished call is handed back to the
//! owner as a [`Completion`] and applied through [`EnhancerApp::apply`].

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::enhancer::{EnhanceError, EnhancementClient, EnhancementOutcome};
use crate::session::{CategorySession, CategorySessionStore, SessionError};

/// Number of enhancements allowed in flight at once
pub const WORKER_COUNT: usize = 2;

/// A finished enhancement, waiting to be applied by the owner
#[derive(Debug, Clone)]
pub struct Completion {
    pub category: String,
    pub outcome: EnhancementOutcome,
}

/// What applying a completion changed, for status display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub category: String,
    /// The completion belongs to the category currently selected
    pub is_active: bool,
    pub result: Result<String, EnhanceError>,
}

pub struct EnhancerApp {
    client: Arc<EnhancementClient>,
    token: Arc<str>,
    store: CategorySessionStore,
    active: String,
    permits: Arc<Semaphore>,
    workers: JoinSet<Completion>,
    in_flight: usize,
}

impl EnhancerApp {
    /// One session per catalog category; the first category starts selected
    pub fn new(
        client: Arc<EnhancementClient>,
        token: impl Into<String>,
        max_history: usize,
    ) -> Self {
        let store = CategorySessionStore::from_catalog(client.catalog(), max_history);
        let active = client.catalog().first().key().to_string();
        let token: String = token.into();

        info!("Application initialized with {} categories", store.categories().len());

        Self {
            client,
            token: Arc::from(token),
            store,
            active,
            permits: Arc::new(Semaphore::new(WORKER_COUNT)),
            workers: JoinSet::new(),
            in_flight: 0,
        }
    }

    pub fn store(&self) -> &CategorySessionStore {
        &self.store
    }

    pub fn active_category(&self) -> &str {
        &self.active
    }

    pub fn active_session(&self) -> Option<&CategorySession> {
        self.store.session(&self.active)
    }

    pub fn select_category(&mut self, key: &str) -> Result<(), SessionError> {
        if self.store.session(key).is_none() {
            return Err(SessionError::UnknownCategory(key.to_string()));
        }
        self.active = key.to_string();
        Ok(())
    }

    /// Requests submitted but not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Record the prompt under the active category and hand it to a worker
    pub fn submit(&mut self, prompt: &str) -> Result<(), EnhanceError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(EnhanceError::InvalidInput(
                "please enter a prompt to enhance".to_string(),
            ));
        }

        let category = self.active.clone();
        if let Err(e) = self.store.record_user_prompt(&category, prompt) {
            warn!("Could not record prompt: {}", e);
        }

        let client = self.client.clone();
        let token = self.token.clone();
        let permits = self.permits.clone();
        let prompt = prompt.to_string();

        self.workers.spawn(async move {
            // the semaphore is never closed while workers are joinable
            let _permit = permits.acquire_owned().await;
            let outcome = client.enhance(&prompt, &token, &category).await;
            Completion { category, outcome }
        });
        self.in_flight += 1;
        Ok(())
    }

    /// Wait for the next finished enhancement; `None` when nothing is in flight
    pub async fn next_completion(&mut self) -> Option<Completion> {
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(completion) => return Some(completion),
                Err(e) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    warn!("Enhancement worker failed: {}", e);
                }
            }
        }
        None
    }

    /// Record a completion into the store
    pub fn apply(&mut self, completion: Completion) -> StatusUpdate {
        self.in_flight = self.in_flight.saturating_sub(1);

        if let Err(e) = self.store.record_outcome(&completion.category, &completion.outcome) {
            warn!("Could not record outcome: {}", e);
        }

        StatusUpdate {
            is_active: completion.category == self.active,
            category: completion.category,
            result: completion.outcome.into_result(),
        }
    }

    /// Most recent result of the active category, for copying
    pub fn last_result(&self) -> Option<&str> {
        self.store.last_result(&self.active)
    }

    pub fn result_history(&self) -> Option<&VecDeque<String>> {
        self.store.result_history(&self.active).ok()
    }

    pub fn clear_active(&mut self) -> Result<(), SessionError> {
        self.store.clear(&self.active)
    }

    pub fn export_active(&self, path: &Path) -> Result<(), SessionError> {
        self.store.export_to_file(&self.active, path)
    }

    /// Abandon queued and in-flight work without waiting for it
    pub fn shutdown(mut self) {
        if self.in_flight > 0 {
            info!("Shutting down, abandoning {} pending request(s)", self.in_flight);
        }
        self.permits.close();
        self.workers.abort_all();
    }
}
