//! Relays tool calls to the active instance.

use crate::client::PeerClient;
use crate::registry::Registry;
use portgate_core::ToolResult;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes tool calls to the active instance.
pub struct Forwarder {
    client: Arc<PeerClient>,
}

impl Forwarder {
    /// Build a forwarder sending through `client`.
    pub fn new(client: Arc<PeerClient>) -> Self {
        Self { client }
    }

    /// Forward `name(arguments)` to the active instance.
    ///
    /// The peer's `result` is returned verbatim. Every failure, including a
    /// missing active instance, becomes an error result; nothing is retried.
    pub async fn forward(
        &self,
        registry: &Registry,
        name: &str,
        arguments: serde_json::Value,
    ) -> ToolResult {
        let instance = match registry.active() {
            Ok(instance) => instance,
            Err(e) => return e.into(),
        };

        debug!(tool = %name, instance = %instance.id(), "Forwarding tool call");

        let resp = match self
            .client
            .call_tool(instance.endpoint(), name, arguments, None)
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(tool = %name, instance = %instance.id(), error = %e, "Forwarding failed");
                return ToolResult::error(format!("Communication error: {e}"));
            }
        };

        if let Some(result) = resp.result {
            return ToolResult::passthrough(result);
        }
        if let Some(error) = resp.error {
            warn!(tool = %name, instance = %instance.id(), error = %error, "Instance returned an error");
            return ToolResult::error(format!("Instance error: {error}"));
        }
        ToolResult::error("Empty response from instance")
    }
}
