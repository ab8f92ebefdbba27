//! OpenAI-style chat completion wire format

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::enhancer::EnhanceError;

use super::common::ChatMessage;

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatCompletionRequest {
    /// System instruction followed by the user's prompt
    pub fn new(config: &Config, system_prompt: String, user_prompt: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt.trim()),
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's content out of a successful response body.
///
/// Bodies that do not have the expected shape are `MalformedResponse`;
/// a present but missing, null or blank content is `EmptyResponse`.
pub fn extract_content(body: &str) -> Result<String, EnhanceError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| EnhanceError::MalformedResponse(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| EnhanceError::MalformedResponse("no choices in response".to_string()))?;

    let content = choice.message.content.unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(EnhanceError::EmptyResponse);
    }

    Ok(content.to_string())
}
