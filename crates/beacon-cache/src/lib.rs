//! Admission-controlled, bounded event store for the beacon telemetry agent.
//!
//! [`EventCache`] is the single entry point instrumentation uses to record
//! telemetry. Every recording call runs an ordered chain of admission checks,
//! cheapest first, and silently drops the event on the first rejection:
//!
//! | Check | Rejects when |
//! |-------|--------------|
//! | enable flag | the cache is disabled |
//! | page filter | the current page is not included, or is excluded |
//! | sampling | the current session is not recorded |
//! | session quota | the session already holds `session_event_limit` events |
//! | capacity | the buffer already holds `event_cache_size` events |
//!
//! Admitted events are enriched with session, page and client metadata,
//! appended to a FIFO buffer, counted against the session, and published on
//! the [`EventBus`](beacon_bus::EventBus) under [`Topic::Event`](beacon_bus::Topic).
//! A scheduler drains the buffer with [`EventCache::get_event_batch`].
//!
//! Recording never returns an error: losing one event must never fault the
//! host application. Configuration mistakes (malformed page patterns, zero
//! limits) are reported once, by [`EventCache::new`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use beacon_cache::{CacheConfig, EventCache, RumEventBus};
//! use beacon_session::{SessionConfig, SessionManager};
//!
//! let bus = Arc::new(RumEventBus::new());
//! let sessions = SessionManager::new(SessionConfig::default());
//! let cache = EventCache::new(CacheConfig::default(), Box::new(sessions), bus)?;
//!
//! cache.record_page_view("/home");
//! cache.record_event("com.example.click", &json!({ "target": "buy" }));
//! let batch = cache.get_event_batch();
//! ```

mod cache;
mod config;
mod error;
mod filter;
mod page;

pub use cache::{EventCache, Notification, RumEventBus};
pub use config::CacheConfig;
pub use error::CacheConfigError;
pub use filter::PageFilter;
pub use page::PageManager;
