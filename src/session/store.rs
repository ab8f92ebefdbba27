//! Per-category conversation log and result cache

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::category::CategoryCatalog;
use crate::config::DEFAULT_MAX_HISTORY;
use crate::enhancer::EnhancementOutcome;

use super::entry::{ConversationEntry, EntryTag};

/// Separator between entries in an exported transcript
const TRANSCRIPT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("There is no history to export in category '{0}'")]
    EmptyHistory(String),

    #[error("Could not export history: {0}")]
    Io(#[from] std::io::Error),
}

/// History of one category
#[derive(Debug, Clone, Default)]
pub struct CategorySession {
    entries: Vec<ConversationEntry>,
    results: VecDeque<String>,
    last_result: Option<String>,
}

impl CategorySession {
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Past successful results, oldest first
    pub fn results(&self) -> &VecDeque<String> {
        &self.results
    }

    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.results.clear();
        self.last_result = None;
    }
}

/// In-memory history for every category.
///
/// Not synchronized: one owner mutates it.
#[derive(Debug, Clone)]
pub struct CategorySessionStore {
    sessions: HashMap<String, CategorySession>,
    order: Vec<String>,
    max_history: usize,
}

impl CategorySessionStore {
    /// One empty session per key; results beyond `max_history` are evicted oldest first
    pub fn new<I, K>(keys: I, max_history: usize) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut sessions = HashMap::new();
        let mut order = Vec::new();
        for key in keys {
            let key = key.into();
            if sessions.insert(key.clone(), CategorySession::default()).is_none() {
                order.push(key);
            }
        }
        Self {
            sessions,
            order,
            max_history,
        }
    }

    pub fn from_catalog(catalog: &CategoryCatalog, max_history: usize) -> Self {
        Self::new(catalog.keys(), max_history)
    }

    /// Category keys in creation order
    pub fn categories(&self) -> &[String] {
        &self.order
    }

    pub fn session(&self, category: &str) -> Option<&CategorySession> {
        self.sessions.get(category)
    }

    pub fn last_result(&self, category: &str) -> Option<&str> {
        self.sessions.get(category).and_then(|s| s.last_result())
    }

    pub fn result_history(&self, category: &str) -> Result<&VecDeque<String>, SessionError> {
        self.sessions
            .get(category)
            .map(|s| s.results())
            .ok_or_else(|| SessionError::UnknownCategory(category.to_string()))
    }

    pub fn record_user_prompt(&mut self, category: &str, text: &str) -> Result<(), SessionError> {
        let session = self.session_mut(category)?;
        session.entries.push(ConversationEntry::new(
            format!("Original Prompt: {}", text),
            EntryTag::User,
            true,
        ));
        Ok(())
    }

    pub fn record_success(&mut self, category: &str, text: &str) -> Result<(), SessionError> {
        let max_history = self.max_history;
        let session = self.session_mut(category)?;

        session.entries.push(ConversationEntry::new(
            format!("Enhanced Result:\n{}", text),
            EntryTag::Enhanced,
            false,
        ));
        session.results.push_back(text.to_string());
        while session.results.len() > max_history {
            session.results.pop_front();
        }
        session.last_result = Some(text.to_string());
        Ok(())
    }

    pub fn record_error(&mut self, category: &str, message: &str) -> Result<(), SessionError> {
        let session = self.session_mut(category)?;
        session.entries.push(ConversationEntry::new(
            format!("Error: {}", message),
            EntryTag::Error,
            false,
        ));
        Ok(())
    }

    /// Record a finished enhancement as a result or an error entry
    pub fn record_outcome(
        &mut self,
        category: &str,
        outcome: &EnhancementOutcome,
    ) -> Result<(), SessionError> {
        match (outcome.enhanced_prompt(), outcome.error()) {
            (Some(text), None) => self.record_success(category, text),
            (_, Some(err)) => self.record_error(category, &err.to_string()),
            (None, None) => self.record_error(category, "An unknown error occurred."),
        }
    }

    /// Drop the log, the result history and the last result of `category`
    pub fn clear(&mut self, category: &str) -> Result<(), SessionError> {
        self.session_mut(category)?.clear();
        info!("History for category '{}' cleared", category);
        Ok(())
    }

    /// Render the conversation log as a plain-text transcript
    pub fn export(&self, category: &str) -> Result<String, SessionError> {
        let session = self
            .sessions
            .get(category)
            .ok_or_else(|| SessionError::UnknownCategory(category.to_string()))?;

        if session.is_empty() {
            return Err(SessionError::EmptyHistory(category.to_string()));
        }

        Ok(session
            .entries
            .iter()
            .map(ConversationEntry::render)
            .collect::<Vec<_>>()
            .join(TRANSCRIPT_SEPARATOR))
    }

    /// Write the transcript of `category` to `path`
    pub fn export_to_file(&self, category: &str, path: &Path) -> Result<(), SessionError> {
        let transcript = self.export(category)?;
        fs::write(path, transcript)?;
        info!("History for '{}' exported to {:?}", category, path);
        Ok(())
    }

    fn session_mut(&mut self, category: &str) -> Result<&mut CategorySession, SessionError> {
        self.sessions
            .get_mut(category)
            .ok_or_else(|| SessionError::UnknownCategory(category.to_string()))
    }
}

impl Default for CategorySessionStore {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), DEFAULT_MAX_HISTORY)
    }
}
