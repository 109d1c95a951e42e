//! Derive a human-meaningful id for a probed peer.
//!
//! Peers usually expose some metadata tool (`idb_meta`, `get_file_info`, ...).
//! If one is advertised it is called once and its first text payload is
//! mined for a file name. Every failure falls back to a port-derived id.

use crate::client::PeerClient;
use crate::protocol::{McpToolDef, McpToolResult};
use portgate_core::GatewayConfig;
use tracing::debug;

/// Raw text shorter than this (in characters) can serve as an id.
const MAX_RAW_ID_LEN: usize = 50;

/// Id and display metadata of a peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Registry key candidate.
    pub id: String,
    /// Shown in listings.
    pub metadata: serde_json::Value,
}

impl Identity {
    /// The identity used when nothing better is known: `<prefix>-<port>`.
    pub fn fallback(prefix: &str, port: u16) -> Self {
        Self {
            id: format!("{prefix}-{port}"),
            metadata: serde_json::json!({ "description": format!("Unknown (Port {port})") }),
        }
    }
}

/// What a metadata payload told us about the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityHint {
    /// A `filename` field: it becomes the id and the whole object the metadata.
    Filename {
        id: String,
        metadata: serde_json::Value,
    },
    /// The last component of a `path` field.
    PathName(String),
    /// Short non-JSON text, trimmed.
    RawText(String),
}

impl IdentityHint {
    fn apply(self, fallback: Identity) -> Identity {
        match self {
            IdentityHint::Filename { id, metadata } => Identity { id, metadata },
            IdentityHint::PathName(id) | IdentityHint::RawText(id) => Identity {
                id,
                metadata: fallback.metadata,
            },
        }
    }
}

/// First capability whose name contains one of `markers` (case-sensitive).
pub fn find_metadata_tool<'a>(tools: &'a [McpToolDef], markers: &[String]) -> Option<&'a McpToolDef> {
    tools
        .iter()
        .find(|t| markers.iter().any(|m| t.name.contains(m.as_str())))
}

/// Interpret a metadata tool's text payload.
pub fn hint_from_text(text: &str) -> Option<IdentityHint> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => {
            let obj = value.as_object()?;
            if let Some(filename) = non_empty_str(obj.get("filename")) {
                return Some(IdentityHint::Filename {
                    id: filename.to_string(),
                    metadata: value.clone(),
                });
            }
            let path = non_empty_str(obj.get("path"))?;
            path.rsplit(['/', '\\'])
                .find(|part| !part.is_empty())
                .map(|name| IdentityHint::PathName(name.to_string()))
        }
        Err(_) => {
            let trimmed = text.trim();
            (text.chars().count() < MAX_RAW_ID_LEN && !trimmed.is_empty())
                .then(|| IdentityHint::RawText(trimmed.to_string()))
        }
    }
}

fn non_empty_str(value: Option<&serde_json::Value>) -> Option<&str> {
    value
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Resolve a peer's identity. Never fails: any problem yields the fallback.
pub async fn resolve_identity(
    client: &PeerClient,
    endpoint: &str,
    tools: &[McpToolDef],
    port: u16,
    config: &GatewayConfig,
) -> Identity {
    let fallback = Identity::fallback(&config.id_prefix, port);

    let Some(tool) = find_metadata_tool(tools, &config.identity_markers) else {
        debug!(port, "No metadata tool advertised, using port identity");
        return fallback;
    };

    let resp = match client
        .call_tool(endpoint, &tool.name, serde_json::json!({}), None)
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            debug!(port, tool = %tool.name, error = %e, "Metadata fetch failed");
            return fallback;
        }
    };

    let Some(result) = resp.result else {
        debug!(port, tool = %tool.name, "Metadata call returned no result");
        return fallback;
    };

    let text = match serde_json::from_value::<McpToolResult>(result) {
        Ok(parsed) => parsed.content.into_iter().next().and_then(|c| c.text),
        Err(e) => {
            debug!(port, error = %e, "Metadata result is not a tool result");
            None
        }
    };

    match text.as_deref().and_then(hint_from_text) {
        Some(hint) => {
            let identity = hint.apply(fallback);
            debug!(port, id = %identity.id, "Resolved instance identity");
            identity
        }
        None => {
            debug!(port, tool = %tool.name, "Metadata payload carried no usable identity");
            fallback
        }
    }
}
