//! The authenticated-request executor.
//!
//! [`RequestExecutor`] runs a single HTTP request and classifies the
//! outcome: any status in `[200, 300)` and `304` resolve with the body
//! text; everything else rejects with [`HttpError`] carrying the status
//! and body. Callers that care about readiness can observe non-terminal
//! [`ReadinessStage`] notifications on a channel; those never resolve or
//! reject the operation.

use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for request execution.
///
/// Transport-level failures (connection refused, DNS, aborted reads)
/// carry `status: 0`.
#[derive(Debug, Error)]
#[error("http request failed with status {status}")]
pub struct HttpError {
    /// Final HTTP status, or `0` when no response was received.
    pub status: u16,
    /// Response body, or the transport error's description.
    pub body: String,
}

/// Non-terminal readiness marker reported while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessStage {
    /// The request has been prepared and handed to the transport.
    Opened,
    /// Response status and headers have arrived.
    HeadersReceived,
    /// The response body is being received.
    Loading,
}

/// A single HTTP request to execute.
///
/// Built per call and discarded after execution. Headers keep their
/// insertion order.
#[derive(Debug, Clone)]
pub struct Request {
    pub uri: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    /// Create a GET request for `uri`.
    pub fn get(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Override the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Executes single HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
}

impl RequestExecutor {
    /// Create an executor with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Create an executor over an existing HTTP client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Execute `request` and return the response body text.
    pub async fn send(&self, request: Request) -> Result<String, HttpError> {
        self.execute(request, None).await
    }

    /// Execute `request`, reporting readiness stages on `progress`.
    ///
    /// A dropped receiver only discards the notifications; it does not
    /// affect the request.
    pub async fn send_with_progress(
        &self,
        request: Request,
        progress: mpsc::UnboundedSender<ReadinessStage>,
    ) -> Result<String, HttpError> {
        self.execute(request, Some(progress)).await
    }

    async fn execute(
        &self,
        request: Request,
        progress: Option<mpsc::UnboundedSender<ReadinessStage>>,
    ) -> Result<String, HttpError> {
        let notify = |stage: ReadinessStage| {
            if let Some(progress) = &progress {
                let _ = progress.send(stage);
            }
        };

        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|err| HttpError {
                status: 0,
                body: format!("invalid http method {:?}: {err}", request.method),
            })?;

        let mut builder = self.http.request(method, request.uri.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        notify(ReadinessStage::Opened);

        let response = builder.send().await.map_err(|err| HttpError {
            status: 0,
            body: err.to_string(),
        })?;

        notify(ReadinessStage::HeadersReceived);

        let status = response.status().as_u16();

        notify(ReadinessStage::Loading);

        let body = response.text().await.map_err(|err| HttpError {
            status,
            body: err.to_string(),
        })?;

        if (200..300).contains(&status) || status == 304 {
            Ok(body)
        } else {
            Err(HttpError { status, body })
        }
    }
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_get() {
        let request = Request::get("https://example.com/services");
        assert_eq!(request.method, "GET");
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }

    #[test]
    fn headers_keep_insertion_order() {
        let request = Request::get("https://example.com/")
            .header("Accept", "application/json;odata=verbose")
            .header("Authorization", "Bearer token");

        assert_eq!(request.headers[0].0, "Accept");
        assert_eq!(request.headers[1].0, "Authorization");
    }

    #[tokio::test]
    async fn transport_failure_carries_status_zero() {
        let executor = RequestExecutor::new();
        // Nothing listens on this port.
        let err = executor
            .send(Request::get("http://127.0.0.1:1/never"))
            .await
            .unwrap_err();
        assert_eq!(err.status, 0);
    }
}
