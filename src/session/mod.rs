//! Session module
//! In-memory per-category conversation history

mod entry;
mod store;

pub use entry::{preview_line, ConversationEntry, EntryTag};
pub use store::{CategorySession, CategorySessionStore, SessionError};
