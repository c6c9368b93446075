//! Synchronous topic broadcaster for the beacon telemetry agent.
//!
//! The bus decouples event producers (the event cache) from consumers
//! (instrumentation plugins). Subscribers register against a [`Topic`];
//! [`EventBus::dispatch`] invokes every subscriber registered at the moment
//! of the call, in registration order, before returning.
//!
//! Dispatch iterates a snapshot of the subscriber list, so a subscriber may
//! subscribe or unsubscribe (itself or others) while being notified. A
//! failing subscriber, whether it returns an error or panics, is logged and
//! skipped; the remaining subscribers are still notified.
//!
//! # Usage
//!
//! ```rust
//! use beacon_bus::{EventBus, Topic};
//!
//! let bus: EventBus<String> = EventBus::new();
//! let handle = bus.subscribe_fn(Topic::Event, |payload: &String| {
//!     println!("saw {payload}");
//! });
//! assert_eq!(bus.dispatch(Topic::Event, &"hello".to_string()), 1);
//! bus.unsubscribe(Topic::Event, &handle);
//! ```

mod bus;
mod error;

pub use bus::{EventBus, Subscriber, Topic};
pub use error::SubscriberError;

#[cfg(test)]
mod tests;
