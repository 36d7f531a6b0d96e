//! Request and reply types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single dispatch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(format!("req_{}", Uuid::new_v4()))
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single free-text user message
///
/// Fields are private so a request cannot change once it has been received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    message: String,
    received_at: DateTime<Utc>,
}

impl Request {
    /// Create a request, trimming surrounding whitespace from the message
    pub fn new(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            id: RequestId::new(),
            message: message.trim().to_string(),
            received_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

/// The answer produced by the handler that served a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Name of the handler that produced this reply
    pub handler: String,
    /// Text shown to the caller
    pub text: String,
    /// Optional structured payload (tool calls, classifier output, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Reply {
    pub fn text(handler: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            text: text.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
