//! Event cache limits and page filter configuration.

use beacon_types::InstallMode;
use serde::Deserialize;

fn default_batch_limit() -> usize {
    100
}

fn default_event_cache_size() -> usize {
    1000
}

fn default_session_event_limit() -> u64 {
    200
}

/// Configuration consumed by [`EventCache`](crate::EventCache).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of events returned by one `get_event_batch` call.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Maximum number of events held in the buffer.
    #[serde(default = "default_event_cache_size")]
    pub event_cache_size: usize,

    /// Maximum number of events recorded per session. Zero means unlimited.
    #[serde(default = "default_session_event_limit")]
    pub session_event_limit: u64,

    /// Regular expressions a page id must match (any of) to be recorded.
    /// Empty means every page is included.
    #[serde(default)]
    pub pages_to_include: Vec<String>,

    /// Regular expressions that suppress recording when any of them matches.
    #[serde(default)]
    pub pages_to_exclude: Vec<String>,

    /// How the client was installed; reported in every event's metadata.
    #[serde(default)]
    pub install_mode: InstallMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            event_cache_size: default_event_cache_size(),
            session_event_limit: default_session_event_limit(),
            pages_to_include: Vec::new(),
            pages_to_exclude: Vec::new(),
            install_mode: InstallMode::default(),
        }
    }
}
