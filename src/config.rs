//! Configuration module - config file, CLI overrides and credential loading

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::service::build_endpoint_url;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://text.pollinations.ai";

/// Default chat completion path, appended to the base URL
pub const DEFAULT_ENDPOINT: &str = "/openai";

/// Default model identifier sent in every request
pub const DEFAULT_MODEL: &str = "gpt-4";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RATE_LIMIT: u32 = 10;
pub const DEFAULT_MAX_HISTORY: usize = 100;
pub const DEFAULT_MAX_TOKENS: u32 = 1200;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Environment variable holding the bearer token
pub const ENV_API_TOKEN: &str = "API_TOKEN";

/// Placeholder shipped in sample `.env` files, never a real token
const PLACEHOLDER_TOKEN: &str = "your-api-token";

/// Optional configuration parameters for Config::new()
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOptions {
    pub base_url: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub validate_ssl: Option<bool>,
    pub rate_limit: Option<u32>,
    pub max_history: Option<usize>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ConfigOptions {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    pub fn merge(self, overrides: ConfigOptions) -> ConfigOptions {
        ConfigOptions {
            base_url: overrides.base_url.or(self.base_url),
            endpoint: overrides.endpoint.or(self.endpoint),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            max_retries: overrides.max_retries.or(self.max_retries),
            validate_ssl: overrides.validate_ssl.or(self.validate_ssl),
            rate_limit: overrides.rate_limit.or(self.rate_limit),
            max_history: overrides.max_history.or(self.max_history),
            model: overrides.model.or(self.model),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            temperature: overrides.temperature.or(self.temperature),
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub validate_ssl: bool,
    /// Requests per minute, 0 disables client-side rate limiting
    pub rate_limit: u32,
    pub max_history: usize,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            validate_ssl: true,
            rate_limit: DEFAULT_RATE_LIMIT,
            max_history: DEFAULT_MAX_HISTORY,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Config {
    /// Create a Config from optional settings, applying documented fallbacks
    pub fn new(options: ConfigOptions) -> Result<Self> {
        let base_url = options
            .base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.is_empty() {
            return Err(anyhow!("base_url cannot be empty"));
        }

        let endpoint = match options.endpoint.map(|e| e.trim().to_string()) {
            Some(e) if e.is_empty() => String::new(),
            Some(e) if e.starts_with('/') => e,
            Some(e) => format!("/{}", e),
            None => DEFAULT_ENDPOINT.to_string(),
        };

        let timeout_secs = options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(anyhow!("timeout must be at least 1 second"));
        }

        let max_retries = options.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries == 0 {
            return Err(anyhow!("max_retries must be at least 1"));
        }

        let temperature = options.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(anyhow!("temperature must be a non-negative number"));
        }

        let model = options
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            base_url,
            endpoint,
            timeout_secs,
            max_retries,
            validate_ssl: options.validate_ssl.unwrap_or(true),
            rate_limit: options.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT),
            max_history: options.max_history.unwrap_or(DEFAULT_MAX_HISTORY),
            model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature,
        })
    }

    /// Load the config file at `path` and layer `overrides` on top.
    ///
    /// A missing file is created with default values. A file that cannot be
    /// parsed is reported and ignored, so the defaults apply.
    pub fn load(path: &Path, overrides: ConfigOptions) -> Result<Self> {
        let from_file = if path.exists() {
            match read_config_file(path) {
                Ok(options) => options,
                Err(e) => {
                    error!("Error loading config {:?}: {:#}", path, e);
                    ConfigOptions::default()
                }
            }
        } else {
            if let Err(e) = write_default_config(path) {
                error!("Error saving default config {:?}: {:#}", path, e);
            }
            ConfigOptions::default()
        };

        Self::new(from_file.merge(overrides))
    }

    /// Full request URL
    pub fn request_url(&self) -> String {
        build_endpoint_url(&self.base_url, &self.endpoint)
    }
}

/// On-disk layout of the config file
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiSection,
    app: AppSection,
    security: SecuritySection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_history: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SecuritySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    validate_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate_limit: Option<u32>,
}

impl From<ConfigFile> for ConfigOptions {
    fn from(file: ConfigFile) -> Self {
        ConfigOptions {
            base_url: file.api.base_url,
            endpoint: file.api.endpoint,
            timeout_secs: file.api.timeout,
            max_retries: file.api.max_retries,
            validate_ssl: file.security.validate_ssl,
            rate_limit: file.security.rate_limit,
            max_history: file.app.max_history,
            model: file.api.model,
            max_tokens: file.api.max_tokens,
            temperature: file.api.temperature,
        }
    }
}

impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        ConfigFile {
            api: ApiSection {
                base_url: Some(config.base_url.clone()),
                endpoint: Some(config.endpoint.clone()),
                timeout: Some(config.timeout_secs),
                max_retries: Some(config.max_retries),
                model: Some(config.model.clone()),
                max_tokens: Some(config.max_tokens),
                temperature: Some(config.temperature),
            },
            app: AppSection {
                max_history: Some(config.max_history),
            },
            security: SecuritySection {
                validate_ssl: Some(config.validate_ssl),
                rate_limit: Some(config.rate_limit),
            },
        }
    }
}

fn read_config_file(path: &Path) -> Result<ConfigOptions> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let file: ConfigFile =
        serde_json::from_str(&content).with_context(|| format!("failed to parse {:?}", path))?;
    Ok(file.into())
}

/// Write a config file populated with the default values
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(&ConfigFile::from(&Config::default()))?;
    fs::write(path, content)?;
    info!("Default config written to {:?}", path);
    Ok(())
}

/// Load the bearer token from `env_file` (if present) and the environment
pub fn load_api_token(env_file: &Path) -> Result<String> {
    if env_file.exists() {
        dotenvy::from_path(env_file)
            .with_context(|| format!("failed to read env file {:?}", env_file))?;
    } else {
        warn!("Env file {:?} not found, using process environment", env_file);
    }

    let token = std::env::var(ENV_API_TOKEN).unwrap_or_default();
    validate_api_token(&token)
}

/// Reject missing, blank and placeholder tokens
pub fn validate_api_token(token: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() || token == PLACEHOLDER_TOKEN {
        return Err(anyhow!(
            "{} not found or not set. Put your token in the .env file",
            ENV_API_TOKEN
        ));
    }
    Ok(token.to_string())
}
