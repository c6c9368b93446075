//! Shared types and constants for the beacon telemetry agent.
//!
//! This crate provides the foundational types used across all beacon crates:
//! the recorded event shapes, the session descriptor, page views, metadata
//! keys, and the [`Clock`] capability. Every other crate in the workspace
//! depends on `beacon-types` for cross-cutting definitions, which keeps the
//! dependency graph acyclic.

mod clock;
mod event;
mod page;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{Attributes, ParsedRumEvent, RumEvent};
pub use page::PageView;

use serde::{Deserialize, Serialize};

/// Schema identifier of the event recorded when a new session begins.
pub const SESSION_START_EVENT_TYPE: &str = "com.beacon.rum.session_start_event";

/// Schema identifier of page view events.
pub const PAGE_VIEW_EVENT_TYPE: &str = "com.beacon.rum.page_view_event";

/// Version of the metadata and details schemas written by this client.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Version of this client, reported in every event's metadata.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metadata keys written by the event cache and session manager.
pub mod keys {
    pub const VERSION: &str = "version";
    pub const CLIENT: &str = "beacon:client";
    pub const CLIENT_VERSION: &str = "beacon:clientVersion";
    pub const DOMAIN: &str = "domain";
    pub const BROWSER_LANGUAGE: &str = "browserLanguage";
    pub const BROWSER_NAME: &str = "browserName";
    pub const DEVICE_TYPE: &str = "deviceType";
    pub const PLATFORM_TYPE: &str = "platformType";
    pub const PAGE_ID: &str = "pageId";
    pub const PAGE_TAGS: &str = "pageTags";
    pub const TITLE: &str = "title";

    /// Keys that are always written by the client and cannot be overridden
    /// by session or page attributes.
    pub const RESERVED: [&str; 3] = [VERSION, CLIENT, CLIENT_VERSION];
}

/// How the client was installed into the host application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    /// Linked as a library module.
    #[default]
    Module,
    /// Loaded as a standalone script or sidecar.
    Script,
}

impl InstallMode {
    /// Returns the marker written under [`keys::CLIENT`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "beacon-module",
            Self::Script => "beacon-script",
        }
    }
}

impl std::fmt::Display for InstallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of the current session.
///
/// Owned by the session manager; the event cache fetches a fresh snapshot on
/// every recording call and never holds one across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque session identifier.
    pub session_id: String,
    /// Whether events in this session are persisted (the sampling verdict).
    pub record: bool,
    /// Number of events recorded so far in this session.
    pub event_count: u64,
}

/// Description of the environment the client runs in.
///
/// These values seed the default metadata of every event; session attributes
/// with the same keys override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientContext {
    /// Domain of the monitored application.
    pub domain: String,
    /// Preferred language of the user agent.
    pub browser_language: String,
    /// Name of the user agent.
    pub browser_name: String,
    /// Device class (e.g. `desktop`, `mobile`).
    pub device_type: String,
    /// Platform class (e.g. `web`).
    pub platform_type: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            browser_language: "en-US".to_string(),
            browser_name: "unknown".to_string(),
            device_type: "desktop".to_string(),
            platform_type: "web".to_string(),
        }
    }
}

impl ClientContext {
    /// Returns the context as metadata attributes, in a fixed key order.
    pub fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(keys::DOMAIN.into(), self.domain.clone().into());
        attributes.insert(
            keys::BROWSER_LANGUAGE.into(),
            self.browser_language.clone().into(),
        );
        attributes.insert(keys::BROWSER_NAME.into(), self.browser_name.clone().into());
        attributes.insert(keys::DEVICE_TYPE.into(), self.device_type.clone().into());
        attributes.insert(
            keys::PLATFORM_TYPE.into(),
            self.platform_type.clone().into(),
        );
        attributes
    }
}
