//! Outbound delivery for the beacon telemetry agent.
//!
//! The dispatch layer turns an unreliable transport into a policy-governed,
//! reliable-enough one:
//!
//! - [`HttpHandler`] is the single-call transport capability: send one
//!   request, get one response or fail.
//! - [`RetryHttpHandler`] wraps any handler with bounded retries and a
//!   pluggable [`Backoff`], and is itself an [`HttpHandler`], so it can stand
//!   in wherever the bare transport is expected.
//! - [`ReqwestHandler`] is the production transport.
//! - [`Dispatcher`] periodically drains the event cache and sends each batch
//!   through a handler.
//!
//! # Retry policy
//!
//! | Outcome | Action |
//! |---------|--------|
//! | transport error | retry while attempts remain, then return the error |
//! | `429` or `5xx` | retry while attempts remain, then `DispatchError::Exhausted` |
//! | other `4xx` | fail immediately with `DispatchError::Status` |
//! | anything else | return the response |
//!
//! A call makes at most `retries + 1` attempts. Backoff waits suspend only
//! the calling future and end early with `DispatchError::Cancelled` when the
//! configured shutdown token fires.

mod backoff;
mod dispatcher;
mod error;
mod http;
mod reqwest_handler;
mod retry;

pub use backoff::{Backoff, ExponentialBackoff, NoBackoff, DEFAULT_BACKOFF_BASE};
pub use dispatcher::{Batch, BatchEnvelope, DispatchConfig, Dispatcher};
pub use error::{DispatchError, TransportError};
pub use http::{HttpHandler, HttpRequest, HttpResponse};
pub use reqwest_handler::ReqwestHandler;
pub use retry::RetryHttpHandler;
