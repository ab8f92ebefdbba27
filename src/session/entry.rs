//! Conversation log entries

use std::fmt;

use chrono::{DateTime, Local};

/// Semantic tag of an entry, used by front ends for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryTag {
    User,
    Enhanced,
    Error,
}

impl EntryTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Enhanced => "enhanced",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EntryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered unit of a category's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub tag: EntryTag,
    pub show_timestamp: bool,
}

impl ConversationEntry {
    pub fn new(message: impl Into<String>, tag: EntryTag, show_timestamp: bool) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
            tag,
            show_timestamp,
        }
    }

    /// `HH:MM:SS`
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// Transcript form: `[HH:MM:SS] message`, or the bare message
    pub fn render(&self) -> String {
        if self.show_timestamp {
            format!("[{}] {}", self.time_label(), self.message)
        } else {
            self.message.clone()
        }
    }
}

/// Single-line preview of a stored result for list views
pub fn preview_line(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let preview: String = flat.trim().chars().take(max_chars).collect();
    format!("{}...", preview)
}
