//! Prompt Enhancer module
//! Sends prompts to the enhancement API with validation, rate limiting and retry

mod client;
mod outcome;
mod rate_limit;

pub use client::{backoff_delay, validate_prompt, EnhancementClient, MAX_PROMPT_CHARS};
pub use outcome::{EnhanceError, EnhancementOutcome};
pub use rate_limit::RateLimiter;
