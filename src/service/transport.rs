//! HTTP transport seam between the enhancement client and the network

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::http_logger::{self, HttpRequestLog, HttpResponseLog};

use super::common::USER_AGENT;
use super::openai::ChatCompletionRequest;

/// One outbound chat completion call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub token: String,
    pub payload: ChatCompletionRequest,
}

/// Status and raw body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection, DNS, timeout or body-read failure; no HTTP status available
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// reqwest-backed transport; the client's connection pool is reused across calls
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!config.validate_ssl)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let http_request_log = if http_logger::is_enabled() {
            Some(HttpRequestLog::chat_request(
                &request.url,
                USER_AGENT,
                &request.token,
                serde_json::to_string(&request.payload).ok(),
            ))
        } else {
            None
        };

        let start_time = Instant::now();

        let result = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", request.token))
            .json(&request.payload)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let duration_ms = start_time.elapsed().as_millis() as u64;
                if let Some(log) = &http_request_log {
                    http_logger::log_exchange(log, None, duration_ms, Some(&e.to_string()));
                }
                return Err(TransportError(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let response_headers = if http_request_log.is_some() {
            http_logger::extract_response_headers(&response)
        } else {
            Vec::new()
        };

        let body = response.text().await;
        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!("Enhancement API call completed in {}ms (status {})", duration_ms, status);

        match body {
            Ok(body) => {
                if let Some(log) = &http_request_log {
                    let response_log = HttpResponseLog {
                        status,
                        headers: response_headers,
                        body: Some(body.clone()),
                    };
                    http_logger::log_exchange(log, Some(&response_log), duration_ms, None);
                }
                Ok(ApiResponse { status, body })
            }
            Err(e) => {
                if let Some(log) = &http_request_log {
                    http_logger::log_exchange(log, None, duration_ms, Some(&e.to_string()));
                }
                Err(TransportError(format!("failed to read response body: {}", e)))
            }
        }
    }
}
