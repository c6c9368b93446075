mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use beacon_dispatch::{
    Backoff, DispatchError, ExponentialBackoff, HttpHandler, HttpRequest, HttpResponse,
    NoBackoff, RetryHttpHandler, TransportError,
};
use common::FakeTransport;
use tokio_util::sync::CancellationToken;

fn request() -> HttpRequest {
    HttpRequest::post("https://collector.test/events")
}

/// Records every delay it hands out.
#[derive(Clone, Default)]
struct RecordingBackoff {
    inner: ExponentialBackoff,
    attempts: Arc<Mutex<Vec<u32>>>,
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl Backoff for RecordingBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let delay = self.inner.delay(attempt);
        self.attempts.lock().unwrap().push(attempt);
        self.delays.lock().unwrap().push(delay);
        delay
    }
}

#[tokio::test]
async fn transport_failure_is_returned_when_retries_run_out() {
    let transport = FakeTransport::failing("Something went wrong!");
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 1, NoBackoff);

    let err = handler.handle(&request()).await.unwrap_err();

    assert_eq!(transport.calls(), 2);
    assert_eq!(err.to_string(), "Something went wrong!");
    match err {
        DispatchError::Transport(TransportError::Other(reason)) => {
            assert_eq!(reason, "Something went wrong!");
        }
        other => panic!("expected the transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn second_attempt_succeeds_after_transport_failure() {
    let transport = FakeTransport::new(|_, call| {
        if call == 0 {
            Err(TransportError::Timeout.into())
        } else {
            Ok(HttpResponse::new(200))
        }
    });
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 1, NoBackoff);

    let response = handler.handle(&request()).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn server_error_is_retried_once_with_first_retry_index() {
    let transport = FakeTransport::statuses(&[500, 200]);
    let backoff = RecordingBackoff::default();
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 1, backoff.clone());

    let response = handler.handle(&request()).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 2);
    assert_eq!(*backoff.attempts.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn client_error_fails_without_retrying() {
    let transport = FakeTransport::statuses(&[400]);
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 3, NoBackoff);

    let err = handler.handle(&request()).await.unwrap_err();

    assert_eq!(transport.calls(), 1);
    assert_eq!(err.to_string(), "400");
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn too_many_requests_is_retried() {
    let transport = FakeTransport::statuses(&[429, 429, 202]);
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 2, NoBackoff);

    let response = handler.handle(&request()).await.unwrap();

    assert_eq!(response.status, 202);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn retryable_status_on_every_attempt_surfaces_last_response() {
    let transport = FakeTransport::statuses(&[500, 502, 503]);
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 2, NoBackoff);

    let err = handler.handle(&request()).await.unwrap_err();

    assert_eq!(transport.calls(), 3);
    match err {
        DispatchError::Exhausted { response } => assert_eq!(response.status, 503),
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_retries_makes_a_single_attempt() {
    let transport = FakeTransport::statuses(&[503]);
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 0, NoBackoff);

    let err = handler.handle(&request()).await.unwrap_err();

    assert_eq!(transport.calls(), 1);
    assert_eq!(err.status(), Some(503));
}

#[tokio::test(start_paused = true)]
async fn default_backoff_doubles_between_attempts() {
    let transport = FakeTransport::statuses(&[500, 500, 200]);
    let backoff = RecordingBackoff::default();
    let handler = RetryHttpHandler::with_backoff(transport.clone(), 2, backoff.clone());

    let started = tokio::time::Instant::now();
    let response = handler.handle(&request()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 3);
    assert_eq!(
        *backoff.delays.lock().unwrap(),
        vec![Duration::from_millis(2000), Duration::from_millis(4000)]
    );
    assert!(elapsed >= Duration::from_millis(6000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(6100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn retry_waits_for_the_backoff_to_elapse() {
    let transport = FakeTransport::statuses(&[500, 200]);
    let handler = Arc::new(RetryHttpHandler::new(transport.clone(), 1));

    let task = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move { handler.handle(&request()).await })
    };

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(transport.calls(), 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(transport.calls(), 2);

    let response = task.await.unwrap().unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test(start_paused = true)]
async fn backoff_does_not_block_other_calls() {
    let transport = FakeTransport::new(|request, _| {
        if request.url.ends_with("/slow") {
            Ok(HttpResponse::new(503))
        } else {
            Ok(HttpResponse::new(200))
        }
    });
    let handler = Arc::new(RetryHttpHandler::new(transport, 1));

    let slow = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            handler
                .handle(&HttpRequest::post("https://collector.test/slow"))
                .await
        })
    };
    tokio::task::yield_now().await;

    let started = tokio::time::Instant::now();
    let fast = handler
        .handle(&HttpRequest::post("https://collector.test/fast"))
        .await
        .unwrap();

    assert_eq!(fast.status, 200);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(slow.await.unwrap().unwrap_err().status(), Some(503));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_a_pending_backoff() {
    let transport = FakeTransport::statuses(&[500, 200]);
    let shutdown = CancellationToken::new();
    let handler = Arc::new(
        RetryHttpHandler::new(transport.clone(), 3).with_shutdown(shutdown.clone()),
    );

    let task = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move { handler.handle(&request()).await })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, DispatchError::Cancelled));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn retry_handler_stands_in_for_the_transport() {
    async fn send<H: HttpHandler>(handler: &H) -> u16 {
        handler.handle(&request()).await.unwrap().status
    }

    let transport = FakeTransport::statuses(&[204]);
    let wrapped = RetryHttpHandler::with_backoff(transport.clone(), 2, NoBackoff);
    let twice_wrapped = RetryHttpHandler::with_backoff(
        RetryHttpHandler::with_backoff(transport.clone(), 1, NoBackoff),
        1,
        NoBackoff,
    );

    assert_eq!(send(&transport).await, 204);
    assert_eq!(send(&wrapped).await, 204);
    assert_eq!(send(&twice_wrapped).await, 204);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn closure_backoff_is_accepted() {
    let transport = FakeTransport::statuses(&[500, 200]);
    let handler =
        RetryHttpHandler::with_backoff(transport.clone(), 1, |_attempt: u32| Duration::ZERO);

    assert_eq!(handler.handle(&request()).await.unwrap().status, 200);
    assert_eq!(transport.calls(), 2);
}
