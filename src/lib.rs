//! prompt-enhancer library - category-driven prompt enhancement with rate limiting and retry

pub mod app;
pub mod category;
pub mod config;
pub mod enhancer;
pub mod http_logger;
pub mod interactive;
pub mod logging;
pub mod service;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use app::{Completion, EnhancerApp, StatusUpdate};
pub use category::{CatalogError, CategoryCatalog, CategoryDefinition};
pub use config::{Config, ConfigOptions};
pub use enhancer::{EnhanceError, EnhancementClient, EnhancementOutcome};
pub use session::{CategorySessionStore, ConversationEntry, EntryTag, SessionError};
