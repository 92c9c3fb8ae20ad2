//! Canonical chat-completion request.
//!
//! The gateway forwards the client's JSON body almost untouched: only the
//! `model` field is rewritten per route. Everything else (sampling params,
//! tools, `stream`) passes through so new provider features need no gateway
//! change.

use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Request body must contain a 'messages' array")]
    MissingMessages,
}

/// A validated chat-completion request body.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    body: Map<String, Value>,
}

impl ChatRequest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RequestError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| RequestError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Object(body) = value else {
            return Err(RequestError::NotAnObject);
        };
        if !matches!(body.get("messages"), Some(Value::Array(_))) {
            return Err(RequestError::MissingMessages);
        }
        Ok(Self { body })
    }

    /// Whether the client asked for a streamed (SSE) response.
    pub fn is_stream(&self) -> bool {
        self.body
            .get("stream")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Model the client asked for, if any. Routes override it.
    pub fn requested_model(&self) -> Option<&str> {
        self.body.get("model").and_then(Value::as_str)
    }

    /// Body to send upstream with `model` set to the route's model.
    pub fn with_model(&self, model: &str) -> Value {
        let mut body = self.body.clone();
        body.insert("model".to_string(), Value::String(model.to_string()));
        Value::Object(body)
    }
}
