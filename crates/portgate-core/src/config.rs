use crate::{PortgateError, PortgateResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Port range, endpoint layout and deadlines used to discover and reach peers.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host the peers listen on.
    #[serde(default = "default_host")]
    pub host: String,
    /// First candidate port of the scan.
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Number of contiguous candidate ports.
    #[serde(default = "default_scan_width")]
    pub scan_width: u16,
    /// Path of the streaming handshake endpoint.
    #[serde(default = "default_sse_path")]
    pub sse_path: String,
    /// Path of the JSON-RPC call endpoint.
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,
    /// Deadline for a whole probe: handshake, `tools/list` and identity.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Deadline for the `tools/list` request issued while probing.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_rpc_timeout_ms: u64,
    /// Transport deadline for every other request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Prefix of ids synthesized from a port, e.g. `ida-13337`.
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    /// Substrings that mark a capability as a metadata source.
    #[serde(default = "default_identity_markers")]
    pub identity_markers: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_base_port() -> u16 {
    13337
}
fn default_scan_width() -> u16 {
    10
}
fn default_sse_path() -> String {
    "/sse".to_string()
}
fn default_rpc_path() -> String {
    "/mcp".to_string()
}
fn default_probe_timeout_ms() -> u64 {
    1000
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_id_prefix() -> String {
    "ida".to_string()
}
fn default_identity_markers() -> Vec<String> {
    vec!["meta".to_string(), "info".to_string()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            base_port: default_base_port(),
            scan_width: default_scan_width(),
            sse_path: default_sse_path(),
            rpc_path: default_rpc_path(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_rpc_timeout_ms: default_probe_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            id_prefix: default_id_prefix(),
            identity_markers: default_identity_markers(),
        }
    }
}

impl GatewayConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(raw: &str) -> PortgateResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| PortgateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> PortgateResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PortgateError::Config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject configurations the scanner or probe cannot work with.
    pub fn validate(&self) -> PortgateResult<()> {
        if self.scan_width == 0 {
            return Err(PortgateError::Config("scan_width must be at least 1".into()));
        }
        if u32::from(self.base_port) + u32::from(self.scan_width) - 1 > u32::from(u16::MAX) {
            return Err(PortgateError::Config(format!(
                "port range {}+{} exceeds 65535",
                self.base_port, self.scan_width
            )));
        }
        if self.probe_timeout_ms == 0
            || self.probe_rpc_timeout_ms == 0
            || self.request_timeout_secs == 0
        {
            return Err(PortgateError::Config("timeouts must be non-zero".into()));
        }
        if self.id_prefix.trim().is_empty() {
            return Err(PortgateError::Config("id_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Candidate ports, `base_port` through `base_port + scan_width - 1`.
    pub fn ports(&self) -> impl Iterator<Item = u16> {
        let end = self.base_port.saturating_add(self.scan_width.saturating_sub(1));
        self.base_port..=end
    }

    /// `http://<host>:<port>`.
    pub fn base_url(&self, port: u16) -> String {
        format!("http://{}:{port}", self.host)
    }

    /// Handshake URL for a port.
    pub fn sse_url(&self, port: u16) -> String {
        format!("{}{}", self.base_url(port), self.sse_path)
    }

    /// JSON-RPC call endpoint for a port.
    pub fn rpc_url(&self, port: u16) -> String {
        format!("{}{}", self.base_url(port), self.rpc_path)
    }

    /// Overall deadline for probing one port.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Deadline for `tools/list` while probing.
    pub fn probe_rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_rpc_timeout_ms)
    }

    /// Default transport deadline for peer requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
