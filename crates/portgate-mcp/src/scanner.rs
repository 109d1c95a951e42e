//! Concurrent discovery over the candidate port range.

use crate::probe::Prober;
use crate::registry::Registry;
use futures_util::future::join_all;
use portgate_core::GatewayConfig;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Fans probes out over the candidate port range and merges the results.
pub struct Scanner {
    prober: Prober,
    config: Arc<GatewayConfig>,
}

impl Scanner {
    /// Build a scanner over the range in `config`.
    pub fn new(prober: Prober, config: Arc<GatewayConfig>) -> Self {
        Self { prober, config }
    }

    /// Scan the configured range. Returns how many instances were added.
    pub async fn scan(&self, registry: &mut Registry) -> usize {
        self.scan_ports(registry, self.config.ports()).await
    }

    /// Scan an explicit set of ports.
    ///
    /// Ports already held by a registered instance are skipped. All remaining
    /// probes run concurrently, each bounded by its own deadlines, and the
    /// registry is only touched after every probe has settled.
    pub async fn scan_ports(
        &self,
        registry: &mut Registry,
        ports: impl IntoIterator<Item = u16>,
    ) -> usize {
        let candidates: BTreeSet<u16> = ports.into_iter().collect();
        let pending: Vec<u16> = candidates
            .iter()
            .copied()
            .filter(|port| !registry.contains_port(*port))
            .collect();

        info!(
            candidates = candidates.len(),
            probing = pending.len(),
            "Scanning ports"
        );

        let results = join_all(pending.iter().map(|&port| self.prober.probe(port))).await;

        let mut added = 0;
        for instance in results.into_iter().flatten() {
            let base_url = instance.base_url().to_string();
            let id = registry.add(instance);
            info!(id = %id, url = %base_url, "Instance added");
            added += 1;
        }

        info!(added, total = registry.len(), "Scan complete");
        added
    }
}
