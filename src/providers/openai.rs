//! OpenAI-compatible provider adapter.
//!
//! Works with any endpoint that accepts the OpenAI chat-completion format.
//! The route's model replaces the client's `model`, the route's credential is
//! sent as a bearer token, and a successful response is streamed back with its
//! status and content type intact (SSE included).

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use futures_util::StreamExt;
use tokio::time::Instant;

use crate::providers::{ChatProvider, ChatRequest, ProviderError, ProviderResponse};

/// Longest upstream error body kept in a `ProviderError::Status`.
const MAX_ERROR_BODY: usize = 2048;

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl OpenAiCompatProvider {
    /// `request_timeout` bounds the wait for response headers only; a
    /// streamed body may run longer.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            http,
            request_timeout,
        })
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn classify(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Read at most `MAX_ERROR_BODY` bytes of an error body before `deadline`.
/// Whatever arrived in time is kept.
async fn read_error_body(upstream: reqwest::Response, deadline: Instant) -> String {
    let mut chunks = upstream.bytes_stream();
    let mut body = Vec::new();
    while body.len() < MAX_ERROR_BODY {
        match tokio::time::timeout_at(deadline, chunks.next()).await {
            Ok(Some(Ok(chunk))) => body.extend_from_slice(&chunk),
            _ => break,
        }
    }
    body.truncate(MAX_ERROR_BODY);
    truncate(String::from_utf8_lossy(&body).into_owned())
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_completion(
        &self,
        request: &ChatRequest,
        model: &str,
        credential: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        tracing::debug!(
            provider = %self.name,
            model = %model,
            stream = request.is_stream(),
            "Sending chat completion request"
        );

        let send = self
            .http
            .post(self.completions_url())
            .bearer_auth(credential)
            .json(&request.with_model(model))
            .send();

        let deadline = Instant::now() + self.request_timeout;
        let upstream = tokio::time::timeout_at(deadline, send)
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(classify)?;

        let status = upstream.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: read_error_body(upstream, deadline).await,
            });
        }

        let mut response = Response::builder().status(status);
        if let Some(content_type) = upstream.headers().get(CONTENT_TYPE) {
            response = response.header(CONTENT_TYPE, content_type.clone());
        }
        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}
