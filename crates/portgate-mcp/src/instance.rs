//! The record kept for each discovered peer.

use crate::protocol::McpToolDef;
use crate::sse::StreamHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A discovered peer.
///
/// Everything except the id is fixed at discovery time. The capability list
/// is a snapshot from the probe and is never refreshed.
#[derive(Debug)]
pub struct Instance {
    id: String,
    port: u16,
    base_url: String,
    endpoint: String,
    capabilities: Vec<McpToolDef>,
    metadata: serde_json::Value,
    discovered_at: DateTime<Utc>,
    /// Keeps the peer's session alive; closed when the instance is dropped.
    stream: Option<StreamHandle>,
}

impl Instance {
    /// A record without a stream; see [`Instance::with_stream`].
    pub fn new(
        id: impl Into<String>,
        port: u16,
        base_url: impl Into<String>,
        endpoint: impl Into<String>,
        capabilities: Vec<McpToolDef>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            port,
            base_url: base_url.into(),
            endpoint: endpoint.into(),
            capabilities,
            metadata,
            discovered_at: Utc::now(),
            stream: None,
        }
    }

    /// Attach the handshake stream that must stay open for this instance.
    pub fn with_stream(mut self, stream: StreamHandle) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Registry key.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Port the peer listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://<host>:<port>` of the peer.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// JSON-RPC call endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Tools the peer advertised when probed.
    pub fn capabilities(&self) -> &[McpToolDef] {
        &self.capabilities
    }

    /// Metadata from identity resolution.
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    /// When the probe succeeded.
    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }

    /// Whether the handshake stream is still held.
    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }
}

/// One row of the registry listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSummary {
    /// Registry key.
    pub id: String,
    /// Port the peer listens on.
    pub port: u16,
    /// Metadata from identity resolution.
    pub metadata: serde_json::Value,
    /// Whether calls are currently routed here.
    pub active: bool,
    /// Number of advertised tools.
    pub tool_count: usize,
    /// When the probe succeeded.
    pub discovered_at: DateTime<Utc>,
}
