//! Transport-neutral request and response shapes.

use std::future::Future;

use serde::Serialize;

use crate::error::DispatchError;

/// An outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialises `body` as JSON and sets the content type.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(body)?;
        let mut request = self.header("content-type", "application/json");
        request.body = bytes;
        Ok(request)
    }
}

/// A received HTTP response. Only the status drives retry decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

/// Sends one request and yields one response or one failure.
pub trait HttpHandler: Send + Sync {
    fn handle(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, DispatchError>> + Send;
}
