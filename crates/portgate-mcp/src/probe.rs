//! Probe one candidate port for a live peer.

use crate::client::PeerClient;
use crate::identity::resolve_identity;
use crate::instance::Instance;
use crate::sse::StreamHandle;
use portgate_core::{GatewayConfig, PortgateError, PortgateResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Opens the handshake, lists tools and resolves the identity of a peer.
pub struct Prober {
    client: Arc<PeerClient>,
    config: Arc<GatewayConfig>,
}

/// Where a probe gave up.
enum ProbeFailure {
    /// Nothing answered the handshake, or it was refused.
    Handshake(PortgateError),
    /// The handshake opened but the peer did not speak the protocol.
    Peer(PortgateError),
    /// The probe deadline passed first.
    Expired,
}

impl Prober {
    /// Build a prober sharing `client` with the rest of the gateway.
    pub fn new(client: Arc<PeerClient>, config: Arc<GatewayConfig>) -> Self {
        Self { client, config }
    }

    /// Probe `port`. Resolves to `None` on every failure; nothing propagates.
    ///
    /// The whole probe, identity resolution included, must finish within the
    /// probe deadline, and `tools/list` must also answer within the probe RPC
    /// deadline. A failed or expired probe drops its handshake stream, which
    /// closes it.
    pub async fn probe(&self, port: u16) -> Option<Instance> {
        let deadline = self.config.probe_timeout();
        let outcome = match tokio::time::timeout(deadline, self.try_probe(port)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeFailure::Expired),
        };

        match outcome {
            Ok(instance) => Some(instance),
            Err(ProbeFailure::Handshake(e)) => {
                debug!(port, error = %e, "No peer on port");
                None
            }
            Err(ProbeFailure::Peer(e)) => {
                debug!(port, error = %e, "Port answered the handshake but probe failed");
                None
            }
            Err(ProbeFailure::Expired) => {
                debug!(
                    port,
                    timeout_ms = self.config.probe_timeout_ms,
                    "Probe did not finish in time"
                );
                None
            }
        }
    }

    async fn try_probe(&self, port: u16) -> Result<Instance, ProbeFailure> {
        let stream = self.open_handshake(port).await.map_err(ProbeFailure::Handshake)?;

        let endpoint = self.config.rpc_url(port);
        debug!(port, endpoint = %endpoint, "Handshake open, probing call endpoint");

        let tools = self
            .client
            .list_tools(&endpoint, Some(self.config.probe_rpc_timeout()))
            .await
            .map_err(ProbeFailure::Peer)?;
        debug!(port, tools = tools.len(), "Peer listed its tools");

        let identity = resolve_identity(&self.client, &endpoint, &tools, port, &self.config).await;
        info!(port, id = %identity.id, tools = tools.len(), "Found instance");

        Ok(Instance::new(
            identity.id,
            port,
            self.config.base_url(port),
            endpoint,
            tools,
            identity.metadata,
        )
        .with_stream(stream))
    }

    async fn open_handshake(&self, port: u16) -> PortgateResult<StreamHandle> {
        StreamHandle::open(self.client.streams(), &self.config.sse_url(port)).await
    }
}
