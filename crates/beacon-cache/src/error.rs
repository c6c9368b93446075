//! Error types for event cache construction.

/// Configuration problems detected when building an [`EventCache`](crate::EventCache).
#[derive(Debug, thiserror::Error)]
pub enum CacheConfigError {
    /// A page include or exclude pattern is not a valid regular expression.
    #[error("invalid page pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// `batch_limit` must be at least one.
    #[error("batch_limit must be greater than zero")]
    ZeroBatchLimit,

    /// `event_cache_size` must be at least one.
    #[error("event_cache_size must be greater than zero")]
    ZeroCacheSize,
}
