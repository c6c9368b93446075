//! Beacon agent: wires a session manager, event cache, bus and dispatcher
//! into a running telemetry client.
//!
//! Host applications feed the agent [`Input`] commands, one JSON object per
//! line on stdin when run as a binary:
//!
//! ```text
//! {"kind":"page_view","pageId":"/checkout","pageTags":["shop"]}
//! {"kind":"event","type":"com.beacon.rum.click_event","details":{"target":"#buy"}}
//! ```

pub mod config;

use std::sync::Arc;

use beacon_bus::Topic;
use beacon_cache::{CacheConfigError, EventCache, Notification, RumEventBus};
use beacon_dispatch::{
    Dispatcher, ExponentialBackoff, HttpHandler, ReqwestHandler, RetryHttpHandler, TransportError,
};
use beacon_session::SessionManager;
use beacon_types::{Attributes, PageView};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use config::{load_config, Config, ConfigError, LoggingConfig};

/// Errors that prevent the agent from starting.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid cache configuration: {0}")]
    Cache(#[from] CacheConfigError),

    #[error("failed to build http transport: {0}")]
    Transport(#[from] TransportError),
}

/// A command from the host application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Input {
    Event {
        #[serde(rename = "type")]
        event_type: String,
        #[serde(default)]
        details: Value,
    },
    Candidate {
        #[serde(rename = "type")]
        event_type: String,
        #[serde(default)]
        details: Value,
    },
    PageView(PageView),
    SessionAttributes {
        attributes: Attributes,
    },
    FlushCandidates,
    Enable,
    Disable,
}

/// A running telemetry client.
pub struct Agent<H> {
    cache: Arc<EventCache>,
    bus: Arc<RumEventBus>,
    dispatcher: Dispatcher<RetryHttpHandler<H, ExponentialBackoff>>,
    shutdown: CancellationToken,
}

impl Agent<ReqwestHandler> {
    /// Builds an agent that delivers over HTTP.
    pub fn new(config: &Config) -> Result<Self, AgentError> {
        let transport = ReqwestHandler::new(config.dispatch.request_timeout())?;
        Self::with_transport(config, transport)
    }
}

impl<H: HttpHandler> Agent<H> {
    /// Builds an agent that delivers through `transport`.
    pub fn with_transport(config: &Config, transport: H) -> Result<Self, AgentError> {
        let bus = Arc::new(RumEventBus::new());
        bus.subscribe_fn(Topic::Session, |notification: &Notification| {
            if let Notification::SessionStarted(session) = notification {
                tracing::info!(
                    session_id = %session.session_id,
                    sampled = session.record,
                    "session started"
                );
            }
        });

        let sessions = SessionManager::new(config.session.clone());
        let cache = Arc::new(EventCache::new(
            config.cache.clone(),
            Box::new(sessions),
            Arc::clone(&bus),
        )?);

        let shutdown = CancellationToken::new();
        let handler = RetryHttpHandler::with_backoff(
            transport,
            config.dispatch.retries,
            config.dispatch.backoff(),
        )
        .with_shutdown(shutdown.clone());
        let dispatcher = Dispatcher::new(Arc::clone(&cache), handler, &config.dispatch);

        if let Some(page) = &config.initial_page {
            cache.record_page_view(page.as_str());
        }

        Ok(Self {
            cache,
            bus,
            dispatcher,
            shutdown,
        })
    }

    pub fn cache(&self) -> &Arc<EventCache> {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<RumEventBus> {
        &self.bus
    }

    /// Token whose cancellation stops [`Agent::run`] and aborts pending
    /// retry waits.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Applies one host command to the cache.
    pub fn apply(&self, input: Input) {
        match input {
            Input::Event {
                event_type,
                details,
            } => self.cache.record_event(&event_type, &details),
            Input::Candidate {
                event_type,
                details,
            } => self.cache.record_candidate(&event_type, &details),
            Input::PageView(page) => self.cache.record_page_view(page),
            Input::SessionAttributes { attributes } => {
                self.cache.add_session_attributes(attributes);
            }
            Input::FlushCandidates => self.cache.flush_candidates(),
            Input::Enable => self.cache.enable(),
            Input::Disable => self.cache.disable(),
        }
    }

    /// Parses and applies one line of JSON input. Blank lines are ignored.
    pub fn ingest(&self, line: &str) -> Result<(), serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let input: Input = serde_json::from_str(line)?;
        self.apply(input);
        Ok(())
    }

    /// Dispatches periodically until the shutdown token fires, then drains
    /// the cache once.
    pub async fn run(&self) {
        self.dispatcher.run(self.shutdown.clone()).await;
    }
}

impl<H> std::fmt::Debug for Agent<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
