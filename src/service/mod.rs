//! Service modules for the enhancement API

pub mod common;
pub mod openai;
pub mod transport;

// Re-export commonly used items
pub use common::{build_endpoint_url, ChatMessage, USER_AGENT};
pub use openai::{extract_content, ChatCompletionRequest};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};
