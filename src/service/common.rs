//! Common types and utilities for service modules

use serde::{Deserialize, Serialize};

/// User-Agent header value
pub const USER_AGENT: &str = concat!("PromptEnhancer/", env!("CARGO_PKG_VERSION"));

/// Chat message in a completion request
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Join base URL and endpoint path without doubling the slash
pub fn build_endpoint_url(base_url: &str, endpoint: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    if endpoint.is_empty() {
        return base_url.to_string();
    }
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", base_url, endpoint)
}
