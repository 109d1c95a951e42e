//! Newline-delimited JSON-RPC server on stdin/stdout in front of a [`Gateway`].

use crate::gateway::Gateway;
use crate::protocol::*;
use portgate_core::PortgateResult;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Protocol version reported when the caller does not name one.
const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Serves the gateway's tools to one caller, one message per line.
pub struct StdioServer {
    gateway: Gateway,
}

impl StdioServer {
    /// Serve `gateway`.
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// The gateway behind this server.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Read messages until EOF, writing one response line per request.
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> PortgateResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_line(&line).await {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        info!("Input closed, stopping server");
        Ok(())
    }

    /// Handle one raw line. Returns the serialized reply, if one is due.
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<IncomingMessage>(line) {
            Ok(msg) => self.handle(msg).await?,
            Err(e) => {
                warn!(error = %e, "Unparsable message from caller");
                OutgoingResponse::failure(
                    serde_json::Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
                )
            }
        };

        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "Failed to serialize response");
                None
            }
        }
    }

    /// Handle one message. Notifications get no response.
    pub async fn handle(&mut self, msg: IncomingMessage) -> Option<OutgoingResponse> {
        let Some(id) = msg.id else {
            debug!(method = %msg.method, "Ignoring notification");
            return None;
        };
        debug!(method = %msg.method, "Handling request");

        let params = msg.params.unwrap_or(serde_json::Value::Null);
        let outcome = match msg.method.as_str() {
            "initialize" => Ok(initialize_result(&params)),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => {
                let tools = self.gateway.list_tools().await;
                Ok(serde_json::json!({ "tools": tools }))
            }
            "tools/call" => self.call_tool(params).await,
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Some(match outcome {
            Ok(result) => OutgoingResponse::success(id, result),
            Err(error) => OutgoingResponse::failure(id, error),
        })
    }

    async fn call_tool(
        &mut self,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let name = params
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "tools/call requires a string 'name'"))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        let result = self.gateway.call_tool(name, arguments).await;
        Ok(result.into_value())
    }
}

fn initialize_result(params: &serde_json::Value) -> serde_json::Value {
    let version = params
        .get("protocolVersion")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    serde_json::json!({
        "protocolVersion": version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": "portgate",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}
