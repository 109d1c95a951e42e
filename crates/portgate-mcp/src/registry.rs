use crate::instance::{Instance, InstanceSummary};
use portgate_core::{PortgateError, PortgateResult};
use std::collections::HashMap;
use tracing::info;

/// Discovered instances keyed by id, plus the active selection.
///
/// Invariants: ids are non-empty and unique, and `active_id` always names a
/// key of `instances`. Entries are only ever added.
#[derive(Debug, Default)]
pub struct Registry {
    instances: HashMap<String, Instance>,
    active_id: Option<String>,
}

impl Registry {
    /// An empty registry with no active instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an instance and return the id it was stored under.
    ///
    /// A taken id is rewritten to `<id>-<port>`; if that is taken too, a
    /// counter is appended. The first instance added becomes active.
    pub fn add(&mut self, mut instance: Instance) -> String {
        let port = instance.port();
        let mut id = instance.id().to_string();
        if id.trim().is_empty() {
            id = format!("instance-{port}");
        }

        if self.instances.contains_key(&id) {
            let suffixed = format!("{id}-{port}");
            id = suffixed.clone();
            let mut n = 2;
            while self.instances.contains_key(&id) {
                id = format!("{suffixed}-{n}");
                n += 1;
            }
        }

        instance.set_id(id.clone());
        self.instances.insert(id.clone(), instance);
        info!(id = %id, port, "Registered instance");

        if self.active_id.is_none() {
            info!(id = %id, "Auto-selected active instance");
            self.active_id = Some(id.clone());
        }
        id
    }

    /// Snapshot of every instance, ordered by port.
    pub fn list(&self) -> Vec<InstanceSummary> {
        let mut rows: Vec<InstanceSummary> = self
            .instances
            .values()
            .map(|i| InstanceSummary {
                id: i.id().to_string(),
                port: i.port(),
                metadata: i.metadata().clone(),
                active: self.active_id.as_deref() == Some(i.id()),
                tool_count: i.capabilities().len(),
                discovered_at: i.discovered_at(),
            })
            .collect();
        rows.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.id.cmp(&b.id)));
        rows
    }

    /// Make `id` the active instance. Unknown ids leave the selection unchanged.
    pub fn switch_active(&mut self, id: &str) -> PortgateResult<()> {
        if !self.instances.contains_key(id) {
            return Err(PortgateError::InstanceNotFound(id.to_string()));
        }
        info!(id = %id, "Switched active instance");
        self.active_id = Some(id.to_string());
        Ok(())
    }

    /// The active instance.
    pub fn active(&self) -> PortgateResult<&Instance> {
        self.active_id
            .as_deref()
            .and_then(|id| self.instances.get(id))
            .ok_or(PortgateError::NoActiveInstance)
    }

    /// Id of the active instance, if any.
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// Look up an instance by id.
    pub fn get(&self, id: &str) -> Option<&Instance> {
        self.instances.get(id)
    }

    /// Whether some instance already listens on `port`.
    pub fn contains_port(&self, port: u16) -> bool {
        self.instances.values().any(|i| i.port() == port)
    }

    /// Ids of every instance, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.instances.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether nothing has been discovered yet.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::protocol::McpToolDef;

    fn make_instance(id: &str, port: u16) -> Instance {
        Instance::new(
            id,
            port,
            format!("http://127.0.0.1:{port}"),
            format!("http://127.0.0.1:{port}/mcp"),
            vec![McpToolDef::new("decompile", "Decompile a function", serde_json::json!({}))],
            serde_json::json!({"filename": id}),
        )
    }

    fn assert_active_is_live(registry: &Registry) {
        if let Some(id) = registry.active_id() {
            assert!(registry.get(id).is_some(), "active id {id} not in registry");
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
        assert!(matches!(registry.active(), Err(PortgateError::NoActiveInstance)));
    }

    #[test]
    fn test_first_add_becomes_active() {
        let mut registry = Registry::new();
        let id = registry.add(make_instance("a.idb", 13337));
        assert_eq!(id, "a.idb");
        assert_eq!(registry.active_id(), Some("a.idb"));

        registry.add(make_instance("b.idb", 13338));
        registry.add(make_instance("c.idb", 13339));
        assert_eq!(registry.active_id(), Some("a.idb"));
        assert_eq!(registry.active().unwrap().port(), 13337);
    }

    #[test]
    fn test_duplicate_id_gets_port_suffix() {
        let mut registry = Registry::new();
        assert_eq!(registry.add(make_instance("sample.idb", 13337)), "sample.idb");
        assert_eq!(registry.add(make_instance("sample.idb", 13340)), "sample.idb-13340");
        assert_eq!(registry.add(make_instance("sample.idb", 13341)), "sample.idb-13341");

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("sample.idb").unwrap().port(), 13337);
        assert_eq!(registry.get("sample.idb-13340").unwrap().id(), "sample.idb-13340");
    }

    #[test]
    fn test_suffixed_id_collision_stays_unique() {
        let mut registry = Registry::new();
        registry.add(make_instance("x", 1));
        registry.add(make_instance("x-2", 5));
        let id = registry.add(make_instance("x", 2));
        assert_eq!(id, "x-2-2");

        let ids = registry.ids();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_blank_id_is_replaced() {
        let mut registry = Registry::new();
        let id = registry.add(make_instance("   ", 13345));
        assert_eq!(id, "instance-13345");
    }

    #[test]
    fn test_switch_active() {
        let mut registry = Registry::new();
        registry.add(make_instance("a.idb", 13337));
        registry.add(make_instance("b.idb", 13338));

        registry.switch_active("b.idb").unwrap();
        assert_eq!(registry.active_id(), Some("b.idb"));
        assert_eq!(registry.active().unwrap().port(), 13338);
    }

    #[test]
    fn test_switch_to_unknown_id_keeps_active() {
        let mut registry = Registry::new();
        registry.add(make_instance("a.idb", 13337));

        let err = registry.switch_active("missing.idb").unwrap_err();
        assert!(matches!(err, PortgateError::InstanceNotFound(ref id) if id == "missing.idb"));
        assert_eq!(registry.active_id(), Some("a.idb"));
    }

    #[test]
    fn test_switch_on_empty_registry() {
        let mut registry = Registry::new();
        assert!(registry.switch_active("a.idb").is_err());
        assert_eq!(registry.active_id(), None);
    }

    #[test]
    fn test_active_invariant_over_mixed_operations() {
        let mut registry = Registry::new();
        let ops: [(&str, Option<u16>); 8] = [
            ("ghost", None),
            ("a", Some(1)),
            ("zzz", None),
            ("a", Some(2)),
            ("a-2", None),
            ("b", Some(3)),
            ("nope", None),
            ("b", None),
        ];
        for (id, port) in ops {
            match port {
                Some(port) => {
                    registry.add(make_instance(id, port));
                }
                None => {
                    let _ = registry.switch_active(id);
                }
            }
            assert_active_is_live(&registry);
        }
        assert_eq!(registry.active_id(), Some("b"));
    }

    #[test]
    fn test_list_marks_active_and_sorts_by_port() {
        let mut registry = Registry::new();
        registry.add(make_instance("late.idb", 13346));
        registry.add(make_instance("early.idb", 13337));

        let rows = registry.list();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "early.idb");
        assert!(!rows[0].active);
        assert_eq!(rows[1].id, "late.idb");
        assert!(rows[1].active);
        assert_eq!(rows[1].tool_count, 1);
        assert_eq!(rows[1].metadata["filename"], "late.idb");
    }

    #[test]
    fn test_contains_port() {
        let mut registry = Registry::new();
        registry.add(make_instance("renamed", 13337));
        assert!(registry.contains_port(13337));
        assert!(!registry.contains_port(13338));
    }

    #[test]
    fn test_summary_serializes() {
        let mut registry = Registry::new();
        registry.add(make_instance("a.idb", 13337));
        let json = serde_json::to_value(registry.list()).unwrap();
        assert_eq!(json[0]["id"], "a.idb");
        assert_eq!(json[0]["port"], 13337);
        assert_eq!(json[0]["active"], true);
        assert!(json[0]["discovered_at"].is_string());
    }
}
