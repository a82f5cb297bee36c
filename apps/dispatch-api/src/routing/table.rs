//! Cluster-wide map from delivery node ID to its endpoint client.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::client::DeliveryClient;

/// One reachable delivery node. Immutable; topology changes swap in a new entry.
pub struct RoutingEntry {
    pub node_id: String,
    pub address: String,
    pub client: Arc<dyn DeliveryClient>,
}

impl fmt::Debug for RoutingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingEntry")
            .field("node_id", &self.node_id)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

type Routes = BTreeMap<String, Arc<RoutingEntry>>;

/// Copy-on-write routing table.
///
/// Readers load the current snapshot without locking. Writers serialize on
/// `entries`, apply the change, and publish a fresh snapshot; a reader that
/// already holds the old snapshot (or an old entry) keeps using it.
pub struct RoutingTable {
    // Snapshot used by the dispatch hot path.
    snapshot: ArcSwap<Routes>,
    // Authoritative map, mutated only by discovery.
    entries: Mutex<Routes>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(BTreeMap::new()),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert or replace the entry for `node_id`. Returns the replaced entry.
    pub fn update(
        &self,
        node_id: &str,
        address: &str,
        client: Arc<dyn DeliveryClient>,
    ) -> Option<Arc<RoutingEntry>> {
        let entry = Arc::new(RoutingEntry {
            node_id: node_id.to_string(),
            address: address.to_string(),
            client,
        });
        let mut entries = self.entries.lock();
        let previous = entries.insert(node_id.to_string(), entry);
        self.publish(&entries);
        previous
    }

    /// Drop the entry for `node_id`. Returns the removed entry, if any.
    pub fn remove(&self, node_id: &str) -> Option<Arc<RoutingEntry>> {
        let mut entries = self.entries.lock();
        let removed = entries.remove(node_id);
        if removed.is_some() {
            self.publish(&entries);
        }
        removed
    }

    pub fn resolve(&self, node_id: &str) -> Option<Arc<RoutingEntry>> {
        self.snapshot.load().get(node_id).cloned()
    }

    /// Every known node, ordered by node ID.
    pub fn resolve_all(&self) -> Vec<Arc<RoutingEntry>> {
        self.snapshot.load().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    fn publish(&self, entries: &Routes) {
        self.snapshot.store(Arc::new(entries.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::NullClient;

    fn client() -> Arc<dyn DeliveryClient> {
        Arc::new(NullClient)
    }

    #[test]
    fn resolve_returns_updated_entry() {
        let table = RoutingTable::new();
        assert!(table.update("n1", "http://a", client()).is_none());

        let entry = table.resolve("n1").unwrap();
        assert_eq!(entry.node_id, "n1");
        assert_eq!(entry.address, "http://a");
        assert!(table.resolve("n2").is_none());
    }

    #[test]
    fn update_replaces_wholesale_and_old_handle_survives() {
        let table = RoutingTable::new();
        table.update("n1", "http://old", client());
        let held = table.resolve("n1").unwrap();

        let previous = table.update("n1", "http://new", client()).unwrap();
        assert!(Arc::ptr_eq(&previous, &held));

        // In-flight holders keep the entry they resolved.
        assert_eq!(held.address, "http://old");
        assert_eq!(table.resolve("n1").unwrap().address, "http://new");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_makes_node_unknown() {
        let table = RoutingTable::new();
        table.update("n1", "http://a", client());
        assert!(table.remove("n1").is_some());
        assert!(table.resolve("n1").is_none());
        assert!(table.remove("n1").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn resolve_all_is_ordered_snapshot() {
        let table = RoutingTable::new();
        table.update("n3", "http://c", client());
        table.update("n1", "http://a", client());
        table.update("n2", "http://b", client());

        let snapshot = table.resolve_all();
        table.remove("n2");

        let ids: Vec<_> = snapshot.iter().map(|e| e.node_id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);
        assert_eq!(table.resolve_all().len(), 2);
    }

    #[test]
    fn concurrent_readers_see_whole_entries() {
        let table = Arc::new(RoutingTable::new());
        table.update("n1", "http://v0", client());

        let writer = {
            let table = table.clone();
            std::thread::spawn(move || {
                for i in 1..=500 {
                    table.update("n1", &format!("http://v{i}"), client());
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || {
                    for _ in 0..2000 {
                        let entry = table.resolve("n1").expect("n1 never removed");
                        assert_eq!(entry.node_id, "n1");
                        assert!(entry.address.starts_with("http://v"));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(table.resolve("n1").unwrap().address, "http://v500");
    }
}
