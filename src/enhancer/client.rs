//! Enhancement Client - validation, rate limiting and retry around one API call

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::category::CategoryCatalog;
use crate::config::Config;
use crate::http_logger::truncate_utf8_safe;
use crate::service::{
    build_endpoint_url, extract_content, ApiRequest, ApiResponse, ChatCompletionRequest,
    ReqwestTransport, Transport, TransportError,
};
use crate::utils::{Clock, SystemClock};

use super::outcome::{EnhanceError, EnhancementOutcome};
use super::rate_limit::RateLimiter;

/// Longest accepted prompt, in characters
pub const MAX_PROMPT_CHARS: usize = 15_000;

/// Upper bound for a single 429 backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Error bodies are cut to this size before logging
const MAX_LOGGED_ERROR_BODY: usize = 500;

/// What a single attempt produced
#[derive(Debug)]
enum AttemptOutcome {
    Completed(String),
    Fatal(EnhanceError),
    RateLimited,
    TransportFailed(String),
}

/// Backoff before the attempt following `attempt` after a 429
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

/// Sends prompts to the enhancement API.
///
/// Stateless across calls except for the rate limiter's last-dispatch time.
pub struct EnhancementClient {
    config: Config,
    catalog: Arc<CategoryCatalog>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    rate_limiter: RateLimiter,
    url: String,
}

impl EnhancementClient {
    /// Create a client backed by reqwest and the system clock
    pub fn new(config: Config, catalog: Arc<CategoryCatalog>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_parts(config, catalog, transport, Arc::new(SystemClock)))
    }

    /// Create a client with an explicit transport and clock
    pub fn with_parts(
        config: Config,
        catalog: Arc<CategoryCatalog>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let url = build_endpoint_url(&config.base_url, &config.endpoint);
        let rate_limiter = RateLimiter::per_minute(config.rate_limit);
        Self {
            config,
            catalog,
            transport,
            clock,
            rate_limiter,
            url,
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.url
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Enhance `prompt` for `category`; every anticipated failure is folded
    /// into the returned outcome
    pub async fn enhance(&self, prompt: &str, token: &str, category: &str) -> EnhancementOutcome {
        self.try_enhance(prompt, token, category).await.into()
    }

    /// Same as [`enhance`](Self::enhance), as a `Result`
    pub async fn try_enhance(
        &self,
        prompt: &str,
        token: &str,
        category: &str,
    ) -> Result<String, EnhanceError> {
        validate_prompt(prompt)?;

        let token = token.trim();
        if token.is_empty() {
            return Err(EnhanceError::MissingCredential);
        }

        let definition = self
            .catalog
            .get(category)
            .ok_or_else(|| EnhanceError::UnknownCategory(category.to_string()))?;

        self.rate_limiter.acquire(self.clock.as_ref()).await;

        let request = ApiRequest {
            url: self.url.clone(),
            token: token.to_string(),
            payload: ChatCompletionRequest::new(&self.config, definition.system_prompt(), prompt),
        };

        let result = self.dispatch_with_retry(&request, category).await;
        match &result {
            Ok(_) => info!("Prompt type '{}' enhanced successfully", category),
            Err(e) => warn!("Prompt type '{}' enhancement failed: {}", category, e),
        }
        result
    }

    async fn dispatch_with_retry(
        &self,
        request: &ApiRequest,
        category: &str,
    ) -> Result<String, EnhanceError> {
        let max_retries = self.config.max_retries;

        for attempt in 0..max_retries {
            let is_final = attempt + 1 >= max_retries;
            info!(
                "Making API request for type '{}' (attempt {}/{})",
                category,
                attempt + 1,
                max_retries
            );

            match classify(self.transport.send(request).await) {
                AttemptOutcome::Completed(text) => return Ok(text),
                AttemptOutcome::Fatal(err) => return Err(err),
                AttemptOutcome::RateLimited => {
                    if !is_final {
                        let delay = backoff_delay(attempt);
                        warn!(
                            "Rate limited (attempt {}/{}), retrying in {}s...",
                            attempt + 1,
                            max_retries,
                            delay.as_secs()
                        );
                        self.clock.sleep(delay).await;
                    }
                }
                AttemptOutcome::TransportFailed(msg) => {
                    if is_final {
                        return Err(EnhanceError::ConnectionFailed(msg));
                    }
                    warn!(
                        "Request failed (attempt {}/{}): {}, retrying...",
                        attempt + 1,
                        max_retries,
                        msg
                    );
                }
            }
        }

        Err(EnhanceError::RetriesExhausted {
            attempts: max_retries,
        })
    }
}

/// Non-empty after trimming, at most [`MAX_PROMPT_CHARS`] characters
pub fn validate_prompt(prompt: &str) -> Result<(), EnhanceError> {
    if prompt.trim().is_empty() {
        return Err(EnhanceError::InvalidInput("prompt is empty".to_string()));
    }
    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        warn!("Prompt too long: {} characters", length);
        return Err(EnhanceError::InvalidInput(format!(
            "prompt is {} characters, the limit is {}",
            length, MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

fn classify(result: Result<ApiResponse, TransportError>) -> AttemptOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            error!("Request error: {}", e);
            return AttemptOutcome::TransportFailed(e.0);
        }
    };

    if response.is_success() {
        return match extract_content(&response.body) {
            Ok(text) => AttemptOutcome::Completed(text),
            Err(err) => {
                error!("Error processing response: {}", err);
                AttemptOutcome::Fatal(err)
            }
        };
    }

    error!(
        "HTTP Error: {} - {}",
        response.status,
        truncate_utf8_safe(&response.body, MAX_LOGGED_ERROR_BODY)
    );
    match response.status {
        401 => AttemptOutcome::Fatal(EnhanceError::AuthenticationFailed),
        429 => AttemptOutcome::RateLimited,
        status => AttemptOutcome::Fatal(EnhanceError::HttpError { status }),
    }
}
