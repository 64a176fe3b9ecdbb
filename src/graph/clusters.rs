//! Undirected connected components over every item in the store.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::Serialize;

use super::{ContextGraph, ContextItem, GraphStore};
use crate::error::Result;

/// A connected component, named after its first-discovered member.
///
/// The name is a label, not an identity: it can change as items are added.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub name: String,
    pub items: Vec<ContextItem>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }
}

impl<'a, S: GraphStore + ?Sized> ContextGraph<'a, S> {
    /// Partition all items into clusters, treating edges as undirected.
    ///
    /// Every item lands in exactly one cluster. Clusters come back in the
    /// order their first member appears in the store.
    pub fn get_clusters(&self) -> Result<Vec<Cluster>> {
        let items = self.store.get_all_items()?;
        let mut visited: HashSet<String> = HashSet::new();
        let mut clusters = Vec::new();

        for seed in items {
            if visited.contains(&seed.id) {
                continue;
            }
            visited.insert(seed.id.clone());

            let name = seed.name.clone();
            let mut members = Vec::new();
            let mut queue = VecDeque::from([seed]);

            while let Some(item) = queue.pop_front() {
                let outgoing = self.store.get_relations_from(&item.id, None)?;
                let incoming = self.store.get_relations_to(&item.id, None)?;
                let neighbours = outgoing
                    .into_iter()
                    .map(|e| e.target_id)
                    .chain(incoming.into_iter().map(|e| e.source_id));

                for id in neighbours {
                    if visited.contains(&id) {
                        continue;
                    }
                    // Dangling ids stay out of every cluster.
                    if let Some(next) = self.store.get_item(&id)? {
                        visited.insert(id);
                        queue.push_back(next);
                    }
                }
                members.push(item);
            }

            clusters.push(Cluster {
                name,
                items: members,
            });
        }

        log::debug!("found {} clusters", clusters.len());
        Ok(clusters)
    }

    /// [`get_clusters`](Self::get_clusters) keyed by cluster name.
    pub fn get_clusters_by_name(&self) -> Result<BTreeMap<String, Vec<ContextItem>>> {
        Ok(clusters_by_name(self.get_clusters()?))
    }
}

/// Key clusters by name. A name already taken by an earlier cluster is
/// suffixed with the first member's id, so no cluster is dropped.
pub fn clusters_by_name(clusters: Vec<Cluster>) -> BTreeMap<String, Vec<ContextItem>> {
    let mut by_name = BTreeMap::new();
    for cluster in clusters {
        let key = if by_name.contains_key(&cluster.name) {
            let first_id = cluster.items.first().map_or("", |i| i.id.as_str());
            format!("{} ({})", cluster.name, first_id)
        } else {
            cluster.name.clone()
        };
        by_name.insert(key, cluster.items);
    }
    by_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::store_with;
    use crate::graph::RelationType::*;
    use crate::graph::{ContextType, MemoryGraphStore, RelationEdge};

    fn sorted_ids(cluster: &Cluster) -> Vec<&str> {
        let mut ids: Vec<_> = cluster.items.iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_two_disjoint_components() {
        let store = store_with(&["a", "b", "c", "d"], &[("a", "b", Uses), ("c", "d", Uses)]);
        let graph = ContextGraph::new(&store);
        let clusters = graph.get_clusters().unwrap();

        assert_eq!(clusters.len(), 2);
        assert_eq!(sorted_ids(&clusters[0]), vec!["a", "b"]);
        assert_eq!(sorted_ids(&clusters[1]), vec!["c", "d"]);
        assert_eq!(clusters[0].name, "A");
        assert_eq!(clusters[1].name, "C");
    }

    #[test]
    fn test_edge_direction_is_ignored() {
        // b only has incoming edges; still joins a and c.
        let store = store_with(&["b", "a", "c"], &[("a", "b", Uses), ("c", "b", Tests)]);
        let graph = ContextGraph::new(&store);
        let clusters = graph.get_clusters().unwrap();

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].name, "B");
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_clusters_partition_all_items() {
        let store = store_with(
            &["a", "b", "c", "d", "e", "f", "lonely"],
            &[
                ("a", "b", Uses),
                ("b", "c", Calls),
                ("c", "a", Imports),
                ("d", "e", Contains),
                ("f", "e", Extends),
                ("a", "ghost", Uses),
            ],
        );
        let graph = ContextGraph::new(&store);
        let clusters = graph.get_clusters().unwrap();

        let mut seen = HashSet::new();
        for cluster in &clusters {
            for item in &cluster.items {
                assert!(seen.insert(item.id.clone()), "{} in two clusters", item.id);
            }
        }
        assert_eq!(seen.len(), 7);
        assert!(!seen.contains("ghost"));
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().any(|c| c.len() == 1 && c.contains("lonely")));
    }

    #[test]
    fn test_clusters_by_name_keeps_shared_names_apart() {
        let mut store = MemoryGraphStore::new();
        store.add_item(ContextItem::new("x1", ContextType::Code, "utils"));
        store.add_item(ContextItem::new("x2", ContextType::Code, "helpers"));
        store.add_item(ContextItem::new("y1", ContextType::Code, "utils"));
        store.add_relation(RelationEdge::new("x1", "x2", Uses));
        let graph = ContextGraph::new(&store);

        let by_name = graph.get_clusters_by_name().unwrap();
        assert_eq!(by_name.len(), 2);
        assert_eq!(by_name["utils"].len(), 2);
        assert_eq!(by_name["utils (y1)"][0].id, "y1");
    }

    #[test]
    fn test_empty_store_has_no_clusters() {
        let store = store_with(&[], &[]);
        let graph = ContextGraph::new(&store);
        assert!(graph.get_clusters().unwrap().is_empty());
    }
}
