//! Enhancement errors and the structured outcome returned to callers

use thiserror::Error;

/// Every anticipated way an enhancement can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnhanceError {
    #[error("Invalid input prompt: {0}")]
    InvalidInput(String),

    #[error("API token is not configured")]
    MissingCredential,

    #[error("Prompt type '{0}' not found")]
    UnknownCategory(String),

    #[error("API returned an empty response")]
    EmptyResponse,

    #[error("Authentication failed. Check your API token")]
    AuthenticationFailed,

    #[error("API request failed (status: {status})")]
    HttpError { status: u16 },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid response format from API: {0}")]
    MalformedResponse(String),

    #[error("Failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl EnhanceError {
    /// The user has to change something (input, token, category) before retrying
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::MissingCredential
                | Self::UnknownCategory(_)
                | Self::AuthenticationFailed
        )
    }

    /// Trying again later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::RetriesExhausted { .. } => true,
            Self::HttpError { status } => *status >= 500,
            _ => false,
        }
    }
}

/// Result of one enhancement call.
///
/// Exactly one of the enhanced text and the error is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancementOutcome {
    enhanced_prompt: Option<String>,
    error: Option<EnhanceError>,
}

impl EnhancementOutcome {
    pub fn success(enhanced_prompt: impl Into<String>) -> Self {
        Self {
            enhanced_prompt: Some(enhanced_prompt.into()),
            error: None,
        }
    }

    pub fn failure(error: EnhanceError) -> Self {
        Self {
            enhanced_prompt: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn enhanced_prompt(&self) -> Option<&str> {
        self.enhanced_prompt.as_deref()
    }

    pub fn error(&self) -> Option<&EnhanceError> {
        self.error.as_ref()
    }

    pub fn into_result(self) -> Result<String, EnhanceError> {
        match (self.enhanced_prompt, self.error) {
            (_, Some(error)) => Err(error),
            (Some(text), None) => Ok(text),
            (None, None) => Err(EnhanceError::EmptyResponse),
        }
    }
}

impl From<Result<String, EnhanceError>> for EnhancementOutcome {
    fn from(result: Result<String, EnhanceError>) -> Self {
        match result {
            Ok(text) => Self::success(text),
            Err(error) => Self::failure(error),
        }
    }
}
