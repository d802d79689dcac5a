// ABOUTME: Axum HTTP testing utilities for integration tests
// ABOUTME: Provides helpers to test Axum routes without running a full server

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde::Serialize;
use tower::ServiceExt;

/// Helper to build and execute HTTP requests against Axum routers
pub struct AxumTestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl AxumTestRequest {
    /// Create a new GET request
    pub fn get(uri: &str) -> Self {
        Self {
            method: Method::GET,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Create a new POST request
    pub fn post(uri: &str) -> Self {
        Self {
            method: Method::POST,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header to the request
    #[allow(dead_code)]
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Add JSON body to the request
    pub fn json<T: Serialize>(mut self, data: &T) -> Self {
        self.body = Some(serde_json::to_string(data).expect("Failed to serialize JSON"));
        self.headers.push((
            header::CONTENT_TYPE.as_str().to_owned(),
            "application/json".to_owned(),
        ));
        self
    }

    /// Execute the request against an Axum router, reading the full body.
    ///
    /// Completion SSE responses are finite (they end after the `[DONE]`
    /// marker), so this works for them too.
    pub async fn send(self, app: Router) -> AxumTestResponse {
        let response = app
            .oneshot(self.build())
            .await
            .expect("Failed to execute request");

        AxumTestResponse::from_response(response).await
    }

    /// Execute a request against a live (never-ending) SSE endpoint.
    ///
    /// Reads at most one second of body, which is enough to observe events
    /// already buffered on the subscription without hanging on the open
    /// stream.
    #[allow(dead_code)]
    pub async fn send_live_sse(self, app: Router) -> AxumTestResponse {
        let response = app
            .oneshot(self.build())
            .await
            .expect("Failed to execute request");

        AxumTestResponse::from_live_sse_response(response).await
    }

    fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);

        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }

        let body = self.body.unwrap_or_default();
        builder
            .body(Body::from(body))
            .expect("Failed to build request")
    }
}

/// Wrapper around Axum HTTP response for testing
pub struct AxumTestResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl AxumTestResponse {
    /// Create from response by eagerly reading the body
    async fn from_response(response: axum::http::Response<Body>) -> Self {
        use axum::body::to_bytes;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body")
            .to_vec();
        Self { status, body }
    }

    /// Create from a live SSE response, reading frames until the stream goes
    /// quiet.
    ///
    /// The live events feed never closes on its own, so the body is read
    /// frame-by-frame and the read stops after a short idle period.
    #[allow(dead_code)]
    async fn from_live_sse_response(response: axum::http::Response<Body>) -> Self {
        use futures_util::StreamExt;

        let status = response.status();
        let mut frames = response.into_body().into_data_stream();
        let mut body = Vec::new();

        while let Ok(Some(Ok(bytes))) =
            tokio::time::timeout(std::time::Duration::from_millis(250), frames.next()).await
        {
            body.extend_from_slice(&bytes);
            if body.len() > 64 * 1024 {
                break;
            }
        }

        Self { status, body }
    }

    /// Get the response status code as u16 for easy assertion
    #[allow(dead_code)]
    pub const fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Get the response status code as `StatusCode`
    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Get the response body as a JSON value
    pub fn json<T: serde::de::DeserializeOwned>(self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to deserialize JSON response")
    }

    /// Get the response body as a string
    pub fn text(self) -> String {
        String::from_utf8(self.body).expect("Failed to decode response as UTF-8")
    }
}

/// Extract the `data:` payloads from an SSE body, in order.
#[allow(dead_code)]
pub fn sse_data_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(ToOwned::to_owned)
        .collect()
}
