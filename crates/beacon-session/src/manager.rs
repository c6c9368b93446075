//! Default in-memory session manager.

use std::sync::Arc;

use beacon_types::{Attributes, ClientContext, Clock, Session, SystemClock};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::SessionProvider;

/// User id reported when the client may not keep a persistent identifier.
pub const NIL_USER_ID: &str = "00000000-0000-0000-0000-000000000000";

fn default_session_length_seconds() -> u64 {
    1800
}

fn default_session_sample_rate() -> f64 {
    1.0
}

/// Session policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Inactivity period after which the next event starts a new session.
    #[serde(default = "default_session_length_seconds")]
    pub session_length_seconds: u64,

    /// Fraction of sessions that are recorded, in `0.0..=1.0`.
    #[serde(default = "default_session_sample_rate")]
    pub session_sample_rate: f64,

    /// Whether a stable user id may be kept for the lifetime of the client.
    #[serde(default)]
    pub allow_cookies: bool,

    /// Custom attributes attached to every session.
    #[serde(default)]
    pub session_attributes: Attributes,

    /// Environment description used for default metadata.
    #[serde(default)]
    pub client: ClientContext,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_length_seconds: default_session_length_seconds(),
            session_sample_rate: default_session_sample_rate(),
            allow_cookies: false,
            session_attributes: Attributes::new(),
            client: ClientContext::default(),
        }
    }
}

#[derive(Debug)]
struct ActiveSession {
    session: Session,
    last_activity: DateTime<Utc>,
}

/// In-memory [`SessionProvider`] with inactivity expiry and per-session
/// sampling.
pub struct SessionManager {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    user_id: String,
    attributes: Attributes,
    current: Option<ActiveSession>,
    /// Verdict the next session will receive; drawn ahead so that
    /// `is_sampled` has an answer before the first session starts.
    next_verdict: bool,
    started: Option<Session>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock), StdRng::from_entropy())
    }

    /// Builds a manager with an explicit clock and a seeded sampler.
    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::with_parts(config, clock, StdRng::seed_from_u64(seed))
    }

    fn with_parts(config: SessionConfig, clock: Arc<dyn Clock>, mut rng: StdRng) -> Self {
        let user_id = if config.allow_cookies {
            uuid::Uuid::new_v4().to_string()
        } else {
            NIL_USER_ID.to_string()
        };

        let mut attributes = config.client.to_attributes();
        for (key, value) in &config.session_attributes {
            attributes.insert(key.clone(), value.clone());
        }

        let next_verdict = draw(&mut rng, config.session_sample_rate);

        Self {
            config,
            clock,
            rng,
            user_id,
            attributes,
            current: None,
            next_verdict,
            started: None,
        }
    }

    fn session_length(&self) -> Duration {
        session_length(self.config.session_length_seconds)
    }

    fn start_session(&mut self, now: DateTime<Utc>) -> Session {
        let session = Session {
            session_id: uuid::Uuid::new_v4().to_string(),
            record: self.next_verdict,
            event_count: 0,
        };
        self.next_verdict = draw(&mut self.rng, self.config.session_sample_rate);

        tracing::debug!(
            session_id = %session.session_id,
            record = session.record,
            "started new session"
        );

        self.started = Some(session.clone());
        self.current = Some(ActiveSession {
            session: session.clone(),
            last_activity: now,
        });
        session
    }
}

/// Lengths beyond what a `Duration` holds saturate to `Duration::MAX`.
fn session_length(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

fn draw(rng: &mut StdRng, rate: f64) -> bool {
    if rate >= 1.0 {
        true
    } else if rate <= 0.0 {
        false
    } else {
        rng.gen::<f64>() < rate
    }
}

impl SessionProvider for SessionManager {
    fn session(&mut self) -> Session {
        let now = self.clock.now();
        let length = self.session_length();
        if let Some(active) = self.current.as_mut() {
            if now - active.last_activity <= length {
                active.last_activity = now;
                return active.session.clone();
            }
        }
        self.start_session(now)
    }

    fn user_id(&self) -> String {
        self.user_id.clone()
    }

    fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn increment_session_event_count(&mut self) {
        if let Some(active) = self.current.as_mut() {
            active.session.event_count += 1;
        }
    }

    fn add_session_attributes(&mut self, attributes: Attributes) {
        for (key, value) in attributes {
            self.attributes.insert(key, value);
        }
    }

    fn is_sampled(&self) -> bool {
        self.current
            .as_ref()
            .map_or(self.next_verdict, |active| active.session.record)
    }

    fn take_session_start(&mut self) -> Option<Session> {
        self.started.take()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("user_id", &self.user_id)
            .field("current", &self.current)
            .finish()
    }
}
