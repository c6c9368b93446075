//! Session lifecycle and sampling for the beacon telemetry agent.
//!
//! The event cache consults a [`SessionProvider`] on every recording call to
//! learn the current session, whether it is sampled, how many events it has
//! already recorded, and which custom attributes enrich its events. The cache
//! never persists session state itself.
//!
//! [`SessionManager`] is the default in-memory provider: sessions expire after
//! a period of inactivity, each session draws its sampling verdict once, and a
//! fresh session leaves a pending session-start record for the cache to pick
//! up.

mod manager;

pub use manager::{SessionConfig, SessionManager, NIL_USER_ID};

use beacon_types::{Attributes, Session};

/// The session capability consumed by the event cache.
pub trait SessionProvider: Send {
    /// Returns the current session, starting a new one if none is active.
    fn session(&mut self) -> Session;

    /// Identifier of the user the session belongs to.
    fn user_id(&self) -> String;

    /// Attributes merged into the metadata of every event.
    fn attributes(&self) -> Attributes;

    /// Counts one more recorded event against the current session.
    fn increment_session_event_count(&mut self);

    /// Adds (or overrides) custom attributes for subsequent events.
    fn add_session_attributes(&mut self, attributes: Attributes);

    /// Sampling verdict for the current session.
    fn is_sampled(&self) -> bool;

    /// Takes the snapshot of a session that started since the last call, if
    /// any. Providers that do not announce session starts keep the default.
    fn take_session_start(&mut self) -> Option<Session> {
        None
    }
}
