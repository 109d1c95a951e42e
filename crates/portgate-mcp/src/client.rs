//! HTTP client that exchanges JSON-RPC 2.0 messages with a peer's call endpoint.

use crate::protocol::*;
use portgate_core::{PortgateError, PortgateResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// JSON-RPC client shared by every probe and forwarded call.
///
/// Request ids come from one counter, so every request this process sends
/// carries a distinct, increasing id.
pub struct PeerClient {
    http: reqwest::Client,
    /// No overall timeout: handshake streams stay open for the instance's lifetime.
    streams: reqwest::Client,
    next_id: AtomicU64,
}

impl PeerClient {
    /// Build a client whose requests time out after `request_timeout` unless a
    /// call overrides it.
    pub fn new(request_timeout: Duration) -> PortgateResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PortgateError::Http(format!("failed to build HTTP client: {e}")))?;

        let streams = reqwest::Client::builder()
            .build()
            .map_err(|e| PortgateError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            streams,
            next_id: AtomicU64::new(1),
        })
    }

    /// Client used to open long-lived handshake streams.
    pub fn streams(&self) -> &reqwest::Client {
        &self.streams
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// POST a JSON-RPC request and parse the response envelope.
    ///
    /// Transport failures, timeouts and non-2xx statuses are `Http` errors; a
    /// body that is not a JSON-RPC response is a `Protocol` error. A response
    /// carrying `error` is returned as-is for the caller to interpret.
    pub async fn request(
        &self,
        endpoint: &str,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> PortgateResult<JsonRpcResponse> {
        let req = JsonRpcRequest::new(self.next_id(), method, params);
        debug!(endpoint = %endpoint, method = %method, id = req.id, "Sending JSON-RPC request");

        let mut builder = self.http.post(endpoint).json(&req);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PortgateError::Http(format!("request '{method}' to {endpoint} timed out"))
            } else {
                PortgateError::Http(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PortgateError::Http(format!(
                "{endpoint} answered '{method}' with status {status}"
            )));
        }

        resp.json::<JsonRpcResponse>().await.map_err(|e| {
            if e.is_timeout() {
                PortgateError::Http(format!("request '{method}' to {endpoint} timed out"))
            } else {
                PortgateError::Protocol(format!("invalid JSON-RPC response to '{method}': {e}"))
            }
        })
    }

    /// List a peer's tools. A response without `result` is a protocol error.
    pub async fn list_tools(
        &self,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> PortgateResult<Vec<McpToolDef>> {
        let resp = self.request(endpoint, "tools/list", None, timeout).await?;
        let result = resp
            .result
            .ok_or_else(|| PortgateError::Protocol("response to tools/list carried no result".into()))?;

        let tools = result
            .get("tools")
            .filter(|tools| !tools.is_null())
            .cloned()
            .unwrap_or_else(|| serde_json::json!([]));

        serde_json::from_value(tools)
            .map_err(|e| PortgateError::Protocol(format!("failed to parse tools: {e}")))
    }

    /// Invoke `tools/call` and return the raw response envelope.
    pub async fn call_tool(
        &self,
        endpoint: &str,
        name: &str,
        arguments: serde_json::Value,
        timeout: Option<Duration>,
    ) -> PortgateResult<JsonRpcResponse> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        self.request(endpoint, "tools/call", Some(params), timeout)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let client = PeerClient::new(Duration::from_secs(1)).unwrap();
        let a = client.next_id();
        let b = client.next_id();
        let c = client.next_id();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_request_connection_refused() {
        // Bind then drop to obtain a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = PeerClient::new(Duration::from_secs(2)).unwrap();
        let err = client
            .request(&format!("http://127.0.0.1:{port}/mcp"), "tools/list", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PortgateError::Http(_)));
    }
}
