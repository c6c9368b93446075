#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use beacon_dispatch::{DispatchError, HttpHandler, HttpRequest, HttpResponse, TransportError};

pub type Outcome = Result<HttpResponse, DispatchError>;

type Script = dyn Fn(&HttpRequest, usize) -> Outcome + Send + Sync;

/// Transport whose answers come from a script keyed by call number.
#[derive(Clone)]
pub struct FakeTransport {
    script: Arc<Script>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn new(script: impl Fn(&HttpRequest, usize) -> Outcome + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers with the given statuses in order, repeating the last one.
    pub fn statuses(statuses: &[u16]) -> Self {
        let statuses = statuses.to_vec();
        Self::new(move |_, call| {
            let status = statuses[call.min(statuses.len() - 1)];
            Ok(HttpResponse::new(status))
        })
    }

    /// Fails every call at the transport level.
    pub fn failing(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::new(move |_, _| Err(TransportError::Other(reason.clone()).into()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpHandler for FakeTransport {
    async fn handle(&self, request: &HttpRequest) -> Outcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.script)(request, call)
    }
}
