//! Client-side rate limiting: one dispatch slot, minimum spacing between requests

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::warn;

use crate::utils::Clock;

/// Enforces a minimum interval between dispatched requests.
///
/// The last-dispatch timestamp is read, waited on and rewritten under one
/// lock, so concurrent callers sharing a limiter are serialized.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `requests_per_minute == 0` disables limiting
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(60.0 / requests_per_minute as f64))
        };
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }

    /// Wait until a dispatch is allowed, then record it. Returns the time waited.
    pub async fn acquire(&self, clock: &dyn Clock) -> Duration {
        let Some(min_interval) = self.min_interval else {
            return Duration::ZERO;
        };

        let mut last_dispatch = self.last_dispatch.lock().await;
        let mut waited = Duration::ZERO;

        if let Some(last) = *last_dispatch {
            let since_last = clock.now().saturating_duration_since(last);
            if since_last < min_interval {
                waited = min_interval - since_last;
                warn!(
                    "Rate limiting: waiting {:.2} seconds",
                    waited.as_secs_f64()
                );
                clock.sleep(waited).await;
            }
        }

        *last_dispatch = Some(clock.now());
        waited
    }
}
