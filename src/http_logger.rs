//! HTTP Exchange Logger
//!
//! Appends every enhancement request and its response to a file when enabled
//! via environment variable.
//! Set `PROMPT_ENHANCER_HTTP_LOG=1` (or `true`, `yes`, `on`) to enable.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::Local;
use tracing::warn;

/// Environment variable to control HTTP logging
pub const ENV_HTTP_LOG: &str = "PROMPT_ENHANCER_HTTP_LOG";

/// Directory holding log files
pub const LOG_DIR: &str = "logs";

/// Log file name
const LOG_FILE_NAME: &str = "http_requests.log";

/// Maximum body size to log (10KB)
const MAX_BODY_SIZE: usize = 10000;

/// Sensitive headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "set-cookie",
    "cookie",
    "x-api-key",
    "proxy-authorization",
];

/// Serializes appends from concurrent workers
static LOG_MUTEX: Mutex<()> = Mutex::new(());

/// Check if HTTP logging is enabled
pub fn is_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var(ENV_HTTP_LOG)
            .map(|v| parse_flag(&v))
            .unwrap_or(false)
    })
}

/// Interpret an on/off environment value
pub fn parse_flag(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "1" || v == "true" || v == "yes" || v == "on"
}

fn log_file_path(log_dir: &Path) -> PathBuf {
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(log_dir) {
            warn!("Failed to create log directory {:?}: {}", log_dir, e);
        }
    }
    log_dir.join(LOG_FILE_NAME)
}

/// Outbound request as recorded in the log
pub struct HttpRequestLog {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequestLog {
    /// Chat completion POST with the headers the transport sends
    pub fn chat_request(url: &str, user_agent: &str, token: &str, body: Option<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.to_string(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), user_agent.to_string()),
                ("Authorization".to_string(), format!("Bearer {}", token)),
            ],
            body,
        }
    }
}

/// Response as recorded in the log
pub struct HttpResponseLog {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Append one request/response exchange to `logs/http_requests.log`
pub fn log_exchange(
    request: &HttpRequestLog,
    response: Option<&HttpResponseLog>,
    duration_ms: u64,
    error: Option<&str>,
) {
    if !is_enabled() {
        return;
    }

    let content = format_exchange(request, response, duration_ms, error);
    let log_path = log_file_path(Path::new(LOG_DIR));
    if let Err(e) = write_log(&log_path, &content) {
        warn!("Failed to write HTTP log: {}", e);
    }
}

/// Render an exchange as a log block, masking credentials
pub fn format_exchange(
    request: &HttpRequestLog,
    response: Option<&HttpResponseLog>,
    duration_ms: u64,
    error: Option<&str>,
) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let separator = "=".repeat(80);

    let mut out = String::new();
    out.push_str(&format!(
        "\n{}\n[{}] {} {}\n{}\n",
        separator, timestamp, request.method, request.url, separator
    ));

    out.push_str("\n--- Request Headers ---\n");
    for (name, value) in &request.headers {
        out.push_str(&format!("{}: {}\n", name, mask_sensitive_header(name, value)));
    }

    if let Some(body) = &request.body {
        out.push_str("\n--- Request Body ---\n");
        out.push_str(&format_body(body));
        out.push('\n');
    }

    if let Some(resp) = response {
        out.push_str(&format!("\n--- Response ({}ms) ---\n", duration_ms));
        out.push_str(&format!("Status: {}\n", resp.status));

        out.push_str("\n--- Response Headers ---\n");
        for (name, value) in &resp.headers {
            out.push_str(&format!("{}: {}\n", name, mask_sensitive_header(name, value)));
        }

        if let Some(body) = &resp.body {
            out.push_str("\n--- Response Body ---\n");
            out.push_str(&format_body(body));
            out.push('\n');
        }
    }

    if let Some(err) = error {
        out.push_str(&format!("\n--- Error ({}ms) ---\n", duration_ms));
        out.push_str(err);
        out.push('\n');
    }

    out.push_str(&format!("\n{}\n", separator));
    out
}

fn write_log(path: &Path, content: &str) -> std::io::Result<()> {
    let _guard = LOG_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Check if a header is sensitive and should be masked
pub fn is_sensitive_header(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    SENSITIVE_HEADERS.iter().any(|h| name_lower == *h)
}

fn mask_sensitive_header(name: &str, value: &str) -> String {
    if is_sensitive_header(name) {
        mask_token(value)
    } else {
        value.to_string()
    }
}

/// Keep the first and last four characters of a token, hide the rest
pub fn mask_token(value: &str) -> String {
    let (prefix, token) = match value.strip_prefix("Bearer ") {
        Some(token) => ("Bearer ", token),
        None => ("", value),
    };

    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}...{}", prefix, head, tail)
    } else {
        format!("{}****", prefix)
    }
}

fn format_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => {
            let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string());
            truncate_utf8_safe(&pretty, MAX_BODY_SIZE)
        }
        Err(_) => truncate_utf8_safe(body, MAX_BODY_SIZE),
    }
}

/// Truncate at a UTF-8 character boundary, noting the original size
pub fn truncate_utf8_safe(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...\n[truncated, total {} bytes]", &s[..end], s.len())
}

/// Collect response headers for the log
pub fn extract_response_headers(response: &reqwest::Response) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect()
}
