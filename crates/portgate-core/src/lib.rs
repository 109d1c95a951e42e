//! Core types and error definitions for the portgate gateway.
//!
//! This crate provides the foundational types shared by the discovery core and
//! the binary: error handling, the uniform tool-call result shape, and the
//! gateway configuration.
//!
//! # Main types
//!
//! - [`PortgateError`]: Unified error enum for all portgate subsystems.
//! - [`PortgateResult`]: Convenience alias for `Result<T, PortgateError>`.
//! - [`ToolResult`]: A tool-call result in the MCP `content` shape.
//! - [`GatewayConfig`]: Port range, endpoint paths and deadlines.

/// Gateway configuration and its defaults.
pub mod config;

pub use config::GatewayConfig;

use serde::{Deserialize, Serialize};

// --- Error types ---

/// Top-level error type for portgate.
#[derive(Debug, thiserror::Error)]
pub enum PortgateError {
    /// Transport failure talking to a peer: connection refused, timeout, non-2xx.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The peer answered, but not with a well-formed handshake or JSON-RPC message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A switch targeted an id the registry does not hold.
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// A call needed an active instance and none is selected.
    #[error("No active instance. Run gateway_scan.")]
    NoActiveInstance,

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`PortgateError`].
pub type PortgateResult<T> = Result<T, PortgateError>;

// --- Tool result ---

/// Result of a tool invocation, in the shape the outer protocol returns.
///
/// Results produced by the gateway itself look like
/// `{"content":[{"type":"text","text":..}],"isError":true}`. Results relayed
/// from a peer are carried verbatim, whatever extra fields they hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolResult(serde_json::Value);

impl ToolResult {
    /// A successful result with a single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self(serde_json::json!({
            "content": [{ "type": "text", "text": text.into() }],
        }))
    }

    /// An error result with a single text item.
    pub fn error(text: impl Into<String>) -> Self {
        Self(serde_json::json!({
            "isError": true,
            "content": [{ "type": "text", "text": text.into() }],
        }))
    }

    /// Wrap a peer's `result` object without touching it.
    pub fn passthrough(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Whether the result is flagged with `isError: true`.
    pub fn is_error(&self) -> bool {
        self.0
            .get("isError")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Text of the first content item, if it has one.
    pub fn first_text(&self) -> Option<&str> {
        self.0
            .get("content")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consume the result and return the underlying JSON value.
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<PortgateError> for ToolResult {
    fn from(err: PortgateError) -> Self {
        Self::error(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_result_shape() {
        let result = ToolResult::text("hello");
        assert!(!result.is_error());
        assert_eq!(result.first_text(), Some("hello"));
        assert_eq!(result.as_value()["content"][0]["type"], "text");
        assert!(result.as_value().get("isError").is_none());
    }

    #[test]
    fn test_error_result_shape() {
        let result = ToolResult::error("boom");
        assert!(result.is_error());
        assert_eq!(result.first_text(), Some("boom"));
    }

    #[test]
    fn test_passthrough_keeps_extra_fields() {
        let raw = serde_json::json!({
            "content": [{"type": "text", "text": "0x401000: push rbp"}],
            "structuredContent": {"addr": "0x401000"},
        });
        let result = ToolResult::passthrough(raw.clone());
        assert!(!result.is_error());
        assert_eq!(result.into_value(), raw);
    }

    #[test]
    fn test_first_text_missing_content() {
        let result = ToolResult::passthrough(serde_json::json!({"other": 1}));
        assert_eq!(result.first_text(), None);
    }

    #[test]
    fn test_error_converts_to_tool_result() {
        let result: ToolResult = PortgateError::NoActiveInstance.into();
        assert!(result.is_error());
        assert!(result.first_text().unwrap().contains("No active instance"));

        let result: ToolResult = PortgateError::InstanceNotFound("x.idb".into()).into();
        assert_eq!(result.first_text(), Some("Instance not found: x.idb"));
    }

    #[test]
    fn test_serializes_transparently() {
        let json = serde_json::to_string(&ToolResult::error("e")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["isError"], true);
        assert_eq!(parsed["content"][0]["text"], "e");
    }
}
