//! The event cache: admission, enrichment, buffering and batching.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use beacon_bus::{EventBus, Topic};
use beacon_session::SessionProvider;
use beacon_types::{
    keys, Attributes, Clock, PageView, ParsedRumEvent, RumEvent, Session, SystemClock,
    CLIENT_VERSION, PAGE_VIEW_EVENT_TYPE, SCHEMA_VERSION, SESSION_START_EVENT_TYPE,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::CacheConfig;
use crate::error::CacheConfigError;
use crate::filter::PageFilter;
use crate::page::PageManager;

/// Payloads published by the cache.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Published on [`Topic::Event`] for every buffered event.
    Event(ParsedRumEvent),
    /// Published on [`Topic::Session`] when a recorded session starts.
    SessionStarted(Session),
}

/// The bus type the cache publishes on.
pub type RumEventBus = EventBus<Notification>;

/// Mutable state guarded by the cache lock.
struct CacheState {
    events: VecDeque<RumEvent>,
    candidates: BTreeMap<String, ParsedRumEvent>,
    sessions: Box<dyn SessionProvider>,
    pages: PageManager,
}

/// Why an event was not recorded. Only used for trace logging.
#[derive(Debug, Clone, Copy)]
enum Rejection {
    PageFiltered,
    NotSampled,
    SessionLimit,
    CacheFull,
}

/// Bounded, admission-controlled event buffer.
///
/// All methods take `&self`; the buffer, candidates, session provider and page
/// state sit behind one mutex so the cache can be shared between recording
/// call sites and the dispatcher. Bus notifications are sent after the lock is
/// released, so subscribers may record events themselves.
pub struct EventCache {
    config: CacheConfig,
    filter: PageFilter,
    clock: Arc<dyn Clock>,
    bus: Arc<RumEventBus>,
    enabled: AtomicBool,
    state: Mutex<CacheState>,
}

impl EventCache {
    /// Builds a cache over the given session provider and bus.
    ///
    /// # Errors
    ///
    /// Returns `CacheConfigError` if a page pattern is malformed or a limit
    /// that must be positive is zero.
    pub fn new(
        config: CacheConfig,
        sessions: Box<dyn SessionProvider>,
        bus: Arc<RumEventBus>,
    ) -> Result<Self, CacheConfigError> {
        if config.batch_limit == 0 {
            return Err(CacheConfigError::ZeroBatchLimit);
        }
        if config.event_cache_size == 0 {
            return Err(CacheConfigError::ZeroCacheSize);
        }
        let filter = PageFilter::compile(&config.pages_to_include, &config.pages_to_exclude)?;

        Ok(Self {
            filter,
            clock: Arc::new(SystemClock),
            bus,
            enabled: AtomicBool::new(true),
            state: Mutex::new(CacheState {
                events: VecDeque::with_capacity(config.event_cache_size.min(1024)),
                candidates: BTreeMap::new(),
                sessions,
                pages: PageManager::new(),
            }),
            config,
        })
    }

    /// Replaces the clock used for event timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ── Recording ────────────────────────────────────────────────────

    /// Records a generic event of schema `event_type`.
    ///
    /// Silently does nothing when any admission check rejects the event.
    pub fn record_event<T: Serialize + ?Sized>(&self, event_type: &str, details: &T) {
        let Some(details) = self.serialize_details(event_type, details) else {
            return;
        };

        let mut outbox = Vec::new();
        {
            let mut state = self.lock();
            let page_id = state.pages.page_id().to_string();
            if let Err(reason) = self.admit(&mut state, &page_id, &mut outbox) {
                trace_rejection(event_type, reason);
            } else {
                let event = self.build_event(&state, event_type, details);
                self.append(&mut state, event, &mut outbox);
            }
        }
        self.publish(outbox);
    }

    /// Makes `page` the current page and records a page view for it.
    ///
    /// The page becomes current even when the view itself is not recorded, so
    /// later events are filtered and enriched against it. Viewing the page
    /// that is already current records nothing.
    pub fn record_page_view(&self, page: impl Into<PageView>) {
        let page = page.into();
        if !self.is_enabled() {
            return;
        }

        let mut outbox = Vec::new();
        {
            let mut state = self.lock();
            if state.pages.is_current(&page.page_id) {
                tracing::trace!(page_id = %page.page_id, "page already current");
                return;
            }
            let page_id = page.page_id.clone();
            state.pages.set(page);
            match self.admit(&mut state, &page_id, &mut outbox) {
                Err(reason) => trace_rejection(PAGE_VIEW_EVENT_TYPE, reason),
                Ok(()) => {
                    let details = json!({ "version": SCHEMA_VERSION, "pageId": page_id });
                    let event = self.build_event(&state, PAGE_VIEW_EVENT_TYPE, details);
                    self.append(&mut state, event, &mut outbox);
                }
            }
        }
        self.publish(outbox);
    }

    /// Records a candidate event: only the latest candidate of each type is
    /// kept, and candidates enter the buffer on [`flush_candidates`].
    ///
    /// [`flush_candidates`]: EventCache::flush_candidates
    pub fn record_candidate<T: Serialize + ?Sized>(&self, event_type: &str, details: &T) {
        let Some(details) = self.serialize_details(event_type, details) else {
            return;
        };

        let mut outbox = Vec::new();
        {
            let mut state = self.lock();
            let page_id = state.pages.page_id().to_string();
            if let Err(reason) = self.admit(&mut state, &page_id, &mut outbox) {
                trace_rejection(event_type, reason);
            } else {
                let event = self.build_event(&state, event_type, details);
                state.candidates.insert(event_type.to_string(), event);
            }
        }
        self.publish(outbox);
    }

    /// Moves every pending candidate into the buffer, in event type order.
    ///
    /// Each candidate passes the sampling and quota checks again, so a flush
    /// never takes the session past its limit. Candidates that are rejected
    /// or do not fit are dropped. A disabled cache discards its candidates.
    pub fn flush_candidates(&self) {
        let mut outbox = Vec::new();
        {
            let mut state = self.lock();
            let candidates = std::mem::take(&mut state.candidates);
            if !self.is_enabled() {
                if !candidates.is_empty() {
                    tracing::trace!(
                        count = candidates.len(),
                        "cache disabled, dropping candidates"
                    );
                }
                return;
            }
            for (event_type, event) in candidates {
                match self.admit_session(&mut state, &mut outbox) {
                    Ok(()) => self.append(&mut state, event, &mut outbox),
                    Err(reason) => trace_rejection(&event_type, reason),
                }
            }
        }
        self.publish(outbox);
    }

    pub fn has_candidates(&self) -> bool {
        !self.lock().candidates.is_empty()
    }

    // ── Draining ─────────────────────────────────────────────────────

    /// Removes and returns up to `batch_limit` of the oldest events.
    pub fn get_event_batch(&self) -> Vec<RumEvent> {
        let mut state = self.lock();
        let take = state.events.len().min(self.config.batch_limit);
        state.events.drain(..take).collect()
    }

    pub fn has_events(&self) -> bool {
        !self.lock().events.is_empty()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_events()
    }

    // ── Gate and session passthrough ─────────────────────────────────

    /// Re-opens the gate. Events dropped while disabled are not replayed.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Closes the gate. Buffered events are kept.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Adds custom session attributes that enrich subsequent events.
    pub fn add_session_attributes(&self, attributes: Attributes) {
        self.lock().sessions.add_session_attributes(attributes);
    }

    /// Current sampling verdict of the session provider.
    pub fn is_session_sampled(&self) -> bool {
        self.lock().sessions.is_sampled()
    }

    /// Identifier of the user the current session belongs to.
    pub fn user_id(&self) -> String {
        self.lock().sessions.user_id()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn serialize_details<T: Serialize + ?Sized>(
        &self,
        event_type: &str,
        details: &T,
    ) -> Option<Value> {
        if !self.is_enabled() {
            tracing::trace!(event_type, "cache disabled, dropping event");
            return None;
        }
        match serde_json::to_value(details) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(event_type, error = %e, "event details are not serializable");
                None
            }
        }
    }

    /// Runs the page, sampling and quota checks in order.
    ///
    /// Fetching the session may start a new one; its start event is queued
    /// before the event that triggered it.
    fn admit(
        &self,
        state: &mut CacheState,
        page_id: &str,
        outbox: &mut Vec<(Topic, Notification)>,
    ) -> Result<(), Rejection> {
        if !self.filter.allows(page_id) {
            return Err(Rejection::PageFiltered);
        }
        self.admit_session(state, outbox)
    }

    /// The sampling and quota checks of [`EventCache::admit`].
    fn admit_session(
        &self,
        state: &mut CacheState,
        outbox: &mut Vec<(Topic, Notification)>,
    ) -> Result<(), Rejection> {
        let session = state.sessions.session();
        if let Some(started) = state.sessions.take_session_start() {
            self.record_session_start(state, started, outbox);
        }

        if !session.record {
            return Err(Rejection::NotSampled);
        }
        let limit = self.config.session_event_limit;
        if limit > 0 && session.event_count >= limit {
            return Err(Rejection::SessionLimit);
        }
        Ok(())
    }

    /// Buffers the start event of a recorded session. It bypasses the page
    /// filter and the session quota and does not count against the quota.
    fn record_session_start(
        &self,
        state: &mut CacheState,
        session: Session,
        outbox: &mut Vec<(Topic, Notification)>,
    ) {
        if !session.record {
            return;
        }
        let details = json!({ "version": SCHEMA_VERSION });
        let event = self.build_event(state, SESSION_START_EVENT_TYPE, details);
        if self.push(state, &event).is_ok() {
            outbox.push((Topic::Session, Notification::SessionStarted(session)));
            outbox.push((Topic::Event, Notification::Event(event)));
        } else {
            trace_rejection(SESSION_START_EVENT_TYPE, Rejection::CacheFull);
        }
    }

    /// Session attributes, then page attributes, then the reserved client keys.
    fn build_event(&self, state: &CacheState, event_type: &str, details: Value) -> ParsedRumEvent {
        let mut metadata = Attributes::new();
        let layers = [state.sessions.attributes(), state.pages.attributes()];
        for (key, value) in layers.into_iter().flatten() {
            if !keys::RESERVED.contains(&key.as_str()) {
                metadata.insert(key, value);
            }
        }
        metadata.insert(keys::VERSION.into(), Value::from(SCHEMA_VERSION));
        metadata.insert(
            keys::CLIENT.into(),
            Value::from(self.config.install_mode.as_str()),
        );
        metadata.insert(keys::CLIENT_VERSION.into(), Value::from(CLIENT_VERSION));

        ParsedRumEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: self.clock.now(),
            event_type: event_type.to_string(),
            metadata,
            details,
        }
    }

    /// Buffers an admitted event, counts it against the session and queues
    /// its notification.
    fn append(
        &self,
        state: &mut CacheState,
        event: ParsedRumEvent,
        outbox: &mut Vec<(Topic, Notification)>,
    ) {
        match self.push(state, &event) {
            Ok(()) => {
                state.sessions.increment_session_event_count();
                outbox.push((Topic::Event, Notification::Event(event)));
            }
            Err(reason) => trace_rejection(&event.event_type, reason),
        }
    }

    /// Appends to the buffer unless it is full; the newest event is the one
    /// dropped.
    fn push(&self, state: &mut CacheState, event: &ParsedRumEvent) -> Result<(), Rejection> {
        if state.events.len() >= self.config.event_cache_size {
            return Err(Rejection::CacheFull);
        }
        state.events.push_back(event.to_rum_event());
        Ok(())
    }

    fn publish(&self, outbox: Vec<(Topic, Notification)>) {
        for (topic, notification) in outbox {
            self.bus.dispatch(topic, &notification);
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("event cache lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn trace_rejection(event_type: &str, reason: Rejection) {
    tracing::trace!(event_type, ?reason, "event not recorded");
}

impl std::fmt::Debug for EventCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCache")
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
