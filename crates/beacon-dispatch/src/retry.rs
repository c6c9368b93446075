//! Bounded retry decorator over any [`HttpHandler`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backoff::{Backoff, ExponentialBackoff};
use crate::error::DispatchError;
use crate::http::{HttpHandler, HttpRequest, HttpResponse};

/// Retries transient failures of an inner handler.
///
/// Makes at most `retries + 1` attempts. Transport errors, `429` and `5xx`
/// are retried after `backoff.delay(n)` for the `n`th retry; any other `4xx`
/// fails at once. The handler keeps no state between calls, so concurrent
/// calls share nothing but the inner handler.
#[derive(Debug)]
pub struct RetryHttpHandler<H, B = ExponentialBackoff> {
    inner: H,
    retries: u32,
    backoff: B,
    shutdown: Option<CancellationToken>,
}

impl<H: HttpHandler> RetryHttpHandler<H> {
    /// Wraps `inner` with the default exponential backoff.
    pub fn new(inner: H, retries: u32) -> Self {
        Self::with_backoff(inner, retries, ExponentialBackoff::default())
    }
}

impl<H: HttpHandler, B: Backoff> RetryHttpHandler<H, B> {
    pub fn with_backoff(inner: H, retries: u32, backoff: B) -> Self {
        Self {
            inner,
            retries,
            backoff,
            shutdown: None,
        }
    }

    /// Ends pending backoff waits with [`DispatchError::Cancelled`] once
    /// `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    async fn wait(&self, delay: Duration) -> Result<(), DispatchError> {
        match &self.shutdown {
            Some(token) => {
                tokio::select! {
                    () = token.cancelled() => Err(DispatchError::Cancelled),
                    () = tokio::time::sleep(delay) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

impl<H: HttpHandler, B: Backoff> HttpHandler for RetryHttpHandler<H, B> {
    async fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, DispatchError> {
        let mut attempt: u32 = 0;
        loop {
            let failure = match self.inner.handle(request).await {
                Ok(response) if is_retryable_status(response.status) => {
                    DispatchError::Exhausted { response }
                }
                Ok(response) if is_client_error(response.status) => {
                    tracing::debug!(
                        status = response.status,
                        url = %request.url,
                        "request rejected"
                    );
                    return Err(DispatchError::Status {
                        status: response.status,
                    });
                }
                Ok(response) => return Ok(response),
                Err(e) if is_retryable(&e) => e,
                Err(e) => return Err(e),
            };

            if attempt >= self.retries {
                tracing::warn!(
                    attempts = attempt + 1,
                    url = %request.url,
                    error = %failure,
                    "request failed, retries exhausted"
                );
                return Err(failure);
            }

            attempt += 1;
            let delay = self.backoff.delay(attempt);
            tracing::debug!(
                attempt,
                retries = self.retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "retrying request"
            );
            self.wait(delay).await?;
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn is_client_error(status: u16) -> bool {
    (400..500).contains(&status)
}

fn is_retryable(error: &DispatchError) -> bool {
    match error {
        DispatchError::Transport(_) => true,
        DispatchError::Exhausted { response } => is_retryable_status(response.status),
        DispatchError::Status { .. } | DispatchError::Cancelled => false,
    }
}
