//! Error type reported by bus subscribers.

/// Failure raised by a subscriber while handling a payload.
///
/// The bus never propagates it to the dispatcher; it is logged and delivery
/// continues with the next subscriber.
#[derive(Debug, thiserror::Error)]
#[error("subscriber failed: {0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
