//! AI Inference Abstraction
//!
//! The managed backend exposes a single "invoke LLM" endpoint that takes a
//! prompt and, optionally, a JSON schema the answer should follow. Responses
//! are untrusted: callers validate them before use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A single structured generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub prompt: String,
    /// JSON schema the response is asked to follow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Inference client trait
///
/// Implementations forward the request to the backend and return the raw JSON
/// answer. No validation happens at this layer.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke(&self, request: InferenceRequest) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = InferenceRequest::new("Translate").with_schema(json!({"type": "object"}));
        assert_eq!(request.prompt, "Translate");
        assert_eq!(request.response_schema, Some(json!({"type": "object"})));
    }

    #[test]
    fn test_schema_omitted_when_absent() {
        let encoded = serde_json::to_value(InferenceRequest::new("hi")).unwrap();
        assert_eq!(encoded, json!({"prompt": "hi"}));
    }
}
