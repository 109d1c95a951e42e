//! The gateway's tool surface: three tools of its own plus whatever the
//! active instance advertises.

use crate::client::PeerClient;
use crate::forwarder::Forwarder;
use crate::instance::InstanceSummary;
use crate::probe::Prober;
use crate::protocol::McpToolDef;
use crate::registry::Registry;
use crate::scanner::Scanner;
use portgate_core::{GatewayConfig, PortgateResult, ToolResult};
use std::sync::Arc;

/// Rescan the port range.
pub const TOOL_SCAN: &str = "gateway_scan";
/// List discovered instances.
pub const TOOL_LIST: &str = "gateway_list";
/// Change the active instance.
pub const TOOL_SWITCH: &str = "gateway_switch";

/// Owns the registry and the components that read or fill it.
pub struct Gateway {
    config: Arc<GatewayConfig>,
    registry: Registry,
    scanner: Scanner,
    forwarder: Forwarder,
}

impl Gateway {
    /// Validate `config` and build a gateway with an empty registry.
    pub fn new(config: GatewayConfig) -> PortgateResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let client = Arc::new(PeerClient::new(config.request_timeout())?);
        let prober = Prober::new(client.clone(), config.clone());

        Ok(Self {
            scanner: Scanner::new(prober, config.clone()),
            forwarder: Forwarder::new(client),
            registry: Registry::new(),
            config,
        })
    }

    /// Discovered instances.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scan the configured port range; returns the number of new instances.
    pub async fn scan(&mut self) -> usize {
        self.scanner.scan(&mut self.registry).await
    }

    /// Scan specific ports instead of the configured range.
    pub async fn scan_ports(&mut self, ports: impl IntoIterator<Item = u16>) -> usize {
        self.scanner.scan_ports(&mut self.registry, ports).await
    }

    /// Listing rows, ordered by port.
    pub fn list(&self) -> Vec<InstanceSummary> {
        self.registry.list()
    }

    /// Route later calls to `id`.
    pub fn switch_active(&mut self, id: &str) -> PortgateResult<()> {
        self.registry.switch_active(id)
    }

    /// Forward a call to the active instance.
    pub async fn forward(&self, name: &str, arguments: serde_json::Value) -> ToolResult {
        self.forwarder.forward(&self.registry, name, arguments).await
    }

    /// Gateway tools followed by the active instance's capabilities.
    ///
    /// An empty registry triggers a scan first.
    pub async fn list_tools(&mut self) -> Vec<McpToolDef> {
        if self.registry.is_empty() {
            self.scan().await;
        }

        let mut tools = gateway_tools(self.config.base_port);
        if let Ok(active) = self.registry.active() {
            tools.extend(active.capabilities().iter().cloned());
        }
        tools
    }

    /// Dispatch a tool call: gateway tools are handled here, everything else
    /// is forwarded.
    pub async fn call_tool(&mut self, name: &str, arguments: serde_json::Value) -> ToolResult {
        match name {
            TOOL_SCAN => {
                self.scan().await;
                ToolResult::text(format!(
                    "Scan complete. Found: {}",
                    self.registry.ids().join(", ")
                ))
            }
            TOOL_LIST => match serde_json::to_string_pretty(&self.list()) {
                Ok(json) => ToolResult::text(json),
                Err(e) => ToolResult::error(format!("Failed to serialize instance list: {e}")),
            },
            TOOL_SWITCH => {
                let Some(target) = arguments.get("id").and_then(serde_json::Value::as_str) else {
                    return ToolResult::error("Missing required string argument 'id'");
                };
                match self.switch_active(target) {
                    Ok(()) => ToolResult::text(format!("Switched to {target}")),
                    Err(e) => e.into(),
                }
            }
            _ => self.forward(name, arguments).await,
        }
    }
}

/// Definitions of the gateway's own tools.
pub fn gateway_tools(base_port: u16) -> Vec<McpToolDef> {
    vec![
        McpToolDef::new(
            TOOL_SCAN,
            format!("Scan local ports ({base_port}+) for analysis tool instances."),
            serde_json::json!({"type": "object", "properties": {}}),
        ),
        McpToolDef::new(
            TOOL_LIST,
            "List connected analysis tool instances.",
            serde_json::json!({"type": "object", "properties": {}}),
        ),
        McpToolDef::new(
            TOOL_SWITCH,
            "Switch the active analysis tool instance.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Instance ID (usually filename)"}
                },
                "required": ["id"]
            }),
        ),
    ]
}
