//! Periodic delivery of cached events.

use std::sync::Arc;
use std::time::Duration;

use beacon_cache::EventCache;
use beacon_types::RumEvent;
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backoff::ExponentialBackoff;
use crate::error::{DispatchError, TransportError};
use crate::http::{HttpHandler, HttpRequest};

fn default_endpoint() -> String {
    "http://localhost:4318/v1/events".to_string()
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// URL batches are POSTed to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Time between flushes.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Retries after the first attempt of each batch.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base of the exponential backoff between retries.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Per-attempt request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl DispatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(Duration::from_millis(self.backoff_base_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            interval_ms: default_interval_ms(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Wire body of one delivery: `{"batch": {"id", "userId", "events"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEnvelope {
    pub batch: Batch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub user_id: String,
    pub events: Vec<RumEvent>,
}

impl BatchEnvelope {
    pub fn new(user_id: String, events: Vec<RumEvent>) -> Self {
        Self {
            batch: Batch {
                id: uuid::Uuid::new_v4().to_string(),
                user_id,
                events,
            },
        }
    }
}

/// Drains an [`EventCache`] into an [`HttpHandler`].
///
/// Batches that fail terminally are logged and dropped; the cache never
/// sees them again.
pub struct Dispatcher<H> {
    cache: Arc<EventCache>,
    handler: H,
    endpoint: String,
    interval: Duration,
}

impl<H: HttpHandler> Dispatcher<H> {
    pub fn new(cache: Arc<EventCache>, handler: H, config: &DispatchConfig) -> Self {
        Self {
            cache,
            handler,
            endpoint: config.endpoint.clone(),
            interval: config.interval(),
        }
    }

    /// Sends the next batch. Returns the number of events delivered, which
    /// is zero when the cache was empty.
    pub async fn dispatch_batch(&self) -> Result<usize, DispatchError> {
        let events = self.cache.get_event_batch();
        if events.is_empty() {
            return Ok(0);
        }
        let count = events.len();
        let envelope = BatchEnvelope::new(self.cache.user_id(), events);
        let request = HttpRequest::post(self.endpoint.as_str())
            .json(&envelope)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        match self.handler.handle(&request).await {
            Ok(response) => {
                tracing::debug!(
                    count,
                    status = response.status,
                    batch_id = %envelope.batch.id,
                    "event batch delivered"
                );
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(
                    count,
                    batch_id = %envelope.batch.id,
                    error = %e,
                    "dropping event batch"
                );
                Err(e)
            }
        }
    }

    /// Flushes pending candidates and sends batches until the cache is
    /// empty. Returns the number of events delivered.
    pub async fn drain(&self) -> usize {
        self.cache.flush_candidates();
        let mut delivered = 0;
        while self.cache.has_events() {
            if let Ok(count) = self.dispatch_batch().await {
                delivered += count;
            }
        }
        delivered
    }

    /// Dispatches one batch per interval until `shutdown` fires, then
    /// drains what is left.
    pub async fn run(&self, shutdown: CancellationToken) {
        if self.interval.is_zero() {
            tracing::warn!("periodic dispatch disabled (interval=0)");
            shutdown.cancelled().await;
        } else {
            tracing::info!(
                endpoint = %self.endpoint,
                interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
                "starting event dispatch"
            );

            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + self.interval,
                self.interval,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        // Failures are logged inside.
                        let _ = self.dispatch_batch().await;
                    }
                }
            }
        }

        let delivered = self.drain().await;
        tracing::info!(delivered, "event dispatch stopped");
    }
}

impl<H> std::fmt::Debug for Dispatcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoint", &self.endpoint)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_camel_case_user_id() {
        let envelope = BatchEnvelope::new("user-1".to_string(), Vec::new());
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["batch"]["userId"], "user-1");
        assert!(json["batch"]["events"].as_array().unwrap().is_empty());
        assert!(uuid::Uuid::parse_str(json["batch"]["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: DispatchConfig =
            serde_json::from_str(r#"{"endpoint":"https://collector.test/events","retries":5}"#)
                .unwrap();

        assert_eq!(config.endpoint, "https://collector.test/events");
        assert_eq!(config.retries, 5);
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.backoff(), ExponentialBackoff::default());
    }
}
