//! Named queries built on [`ContextGraph::traverse`].

use serde::{Deserialize, Serialize};

use super::ontology::types_in_category;
use super::traversal::{Direction, TraverseOptions};
use super::{
    ContextGraph, ContextItem, ContextType, GraphQueryResult, GraphStore, RelationCategory,
    RelationEdge, RelationType,
};
use crate::error::Result;

pub const DEPENDENCY_RELATIONS: [RelationType; 3] =
    [RelationType::DependsOn, RelationType::Imports, RelationType::Uses];
pub const HIERARCHY_RELATIONS: [RelationType; 3] =
    [RelationType::Contains, RelationType::Extends, RelationType::Implements];
pub const DOC_RELATIONS: [RelationType; 2] = [RelationType::Documents, RelationType::References];
/// Item types that count as documentation for [`ContextGraph::get_related_docs`].
pub const DOC_ITEM_TYPES: [ContextType; 3] =
    [ContextType::Workflow, ContextType::Agent, ContextType::Command];

pub const DEFAULT_DEPENDENCY_DEPTH: usize = 5;
pub const DEFAULT_DEPENDENTS_DEPTH: usize = 2;
pub const DEFAULT_HIERARCHY_DEPTH: usize = 5;

/// Which way to walk containment/inheritance edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyDirection {
    /// Towards containers and parents.
    Up,
    /// Towards members and children.
    Down,
    #[default]
    Both,
}

impl From<HierarchyDirection> for Direction {
    fn from(direction: HierarchyDirection) -> Self {
        match direction {
            HierarchyDirection::Up => Direction::Incoming,
            HierarchyDirection::Down => Direction::Outgoing,
            HierarchyDirection::Both => Direction::Both,
        }
    }
}

impl std::str::FromStr for HierarchyDirection {
    type Err = crate::error::CtxgraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "both" => Ok(Self::Both),
            other => Err(crate::error::CtxgraphError::InvalidInput(format!(
                "unknown hierarchy direction: {other}"
            ))),
        }
    }
}

/// An item with its immediate edges, without any traversal.
#[derive(Debug, Clone, Serialize)]
pub struct NodeContext {
    pub item: ContextItem,
    pub incoming: Vec<RelationEdge>,
    pub outgoing: Vec<RelationEdge>,
}

impl<'a, S: GraphStore + ?Sized> ContextGraph<'a, S> {
    /// What `item_id` depends on, transitively.
    pub fn get_dependency_chain(&self, item_id: &str, max_depth: usize) -> Result<GraphQueryResult> {
        let options = TraverseOptions::default()
            .with_relation_types(DEPENDENCY_RELATIONS)
            .with_direction(Direction::Outgoing)
            .with_max_depth(max_depth);
        self.traverse(item_id, &options)
    }

    /// What would be affected if `item_id` changed.
    pub fn get_dependents(&self, item_id: &str, max_depth: usize) -> Result<GraphQueryResult> {
        let options = TraverseOptions::default()
            .with_relation_types(DEPENDENCY_RELATIONS)
            .with_direction(Direction::Incoming)
            .with_max_depth(max_depth);
        self.traverse(item_id, &options)
    }

    pub fn get_hierarchy(
        &self,
        item_id: &str,
        direction: HierarchyDirection,
        max_depth: usize,
    ) -> Result<GraphQueryResult> {
        let options = TraverseOptions::default()
            .with_relation_types(HIERARCHY_RELATIONS)
            .with_direction(direction.into())
            .with_max_depth(max_depth);
        self.traverse(item_id, &options)
    }

    /// Workflows, agents and commands within two documents/references hops.
    pub fn get_related_docs(&self, item_id: &str) -> Result<Vec<ContextItem>> {
        let options = TraverseOptions::default()
            .with_relation_types(DOC_RELATIONS)
            .with_direction(Direction::Both)
            .with_max_depth(2);
        let result = self.traverse(item_id, &options)?;
        Ok(result
            .nodes
            .into_iter()
            .filter(|n| n.depth > 0 && DOC_ITEM_TYPES.contains(&n.item.item_type))
            .map(|n| n.item)
            .collect())
    }

    /// Items with a direct `tests` edge pointing at `item_id`.
    pub fn get_related_tests(&self, item_id: &str) -> Result<Vec<ContextItem>> {
        let options = TraverseOptions::default()
            .with_relation_types([RelationType::Tests])
            .with_direction(Direction::Incoming)
            .with_max_depth(1);
        Ok(depth_one_items(self.traverse(item_id, &options)?))
    }

    pub fn get_node_context(&self, item_id: &str) -> Result<Option<NodeContext>> {
        let Some(item) = self.store.get_item(item_id)? else {
            return Ok(None);
        };
        let incoming = self.store.get_relations_to(item_id, None)?;
        let outgoing = self.store.get_relations_from(item_id, None)?;
        Ok(Some(NodeContext {
            item,
            incoming,
            outgoing,
        }))
    }

    /// Direct neighbours of `item_id` over any relation in `category`.
    pub fn get_nodes_by_relation_category(
        &self,
        item_id: &str,
        category: RelationCategory,
        direction: Direction,
    ) -> Result<Vec<ContextItem>> {
        let options = TraverseOptions::default()
            .with_relation_types(types_in_category(category))
            .with_direction(direction)
            .with_max_depth(1);
        Ok(depth_one_items(self.traverse(item_id, &options)?))
    }
}

fn depth_one_items(result: GraphQueryResult) -> Vec<ContextItem> {
    result
        .nodes
        .into_iter()
        .filter(|n| n.depth == 1)
        .map(|n| n.item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{code, item};
    use crate::graph::MemoryGraphStore;
    use crate::graph::RelationType::*;

    fn ids(items: &[ContextItem]) -> Vec<&str> {
        let mut ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        ids
    }

    fn node_ids(result: &GraphQueryResult) -> Vec<&str> {
        let mut ids: Vec<_> = result.items().map(|i| i.id.as_str()).collect();
        ids.sort();
        ids
    }

    /// api -imports-> db -depends_on-> pool -uses-> config
    /// api -calls-> auth, api_test -tests-> api, workflow -documents-> api,
    /// module -contains-> api, api -implements-> handler
    fn project_store() -> MemoryGraphStore {
        let mut store = MemoryGraphStore::new();
        for id in ["api", "db", "pool", "auth", "api_test", "module", "handler"] {
            store.add_item(code(id));
        }
        store.add_item(item("config", ContextType::Config));
        store.add_item(item("deploy", ContextType::Workflow));
        store.add_item(item("reviewer", ContextType::Agent));
        store.add_item(item("readme", ContextType::Doc));

        for (s, t, r) in [
            ("api", "db", Imports),
            ("db", "pool", DependsOn),
            ("pool", "config", Uses),
            ("api", "auth", Calls),
            ("api_test", "api", Tests),
            ("deploy", "api", Documents),
            ("reviewer", "deploy", References),
            ("readme", "api", References),
            ("module", "api", Contains),
            ("api", "handler", Implements),
        ] {
            store.add_relation(RelationEdge::new(s, t, r));
        }
        store
    }

    #[test]
    fn test_dependency_chain() {
        let store = project_store();
        let graph = ContextGraph::new(&store);
        let result = graph.get_dependency_chain("api", DEFAULT_DEPENDENCY_DEPTH).unwrap();

        assert_eq!(node_ids(&result), vec!["api", "config", "db", "pool"]);
        assert_eq!(result.stats.max_depth, 3);
        assert!(result
            .edges
            .iter()
            .all(|e| DEPENDENCY_RELATIONS.contains(&e.relation_type)));
    }

    #[test]
    fn test_dependents() {
        let store = project_store();
        let graph = ContextGraph::new(&store);
        let result = graph.get_dependents("pool", DEFAULT_DEPENDENTS_DEPTH).unwrap();

        assert_eq!(node_ids(&result), vec!["api", "db", "pool"]);
        assert_eq!(result.node("api").unwrap().depth, 2);
    }

    #[test]
    fn test_hierarchy_directions() {
        let store = project_store();
        let graph = ContextGraph::new(&store);

        let up = graph
            .get_hierarchy("api", HierarchyDirection::Up, DEFAULT_HIERARCHY_DEPTH)
            .unwrap();
        assert_eq!(node_ids(&up), vec!["api", "module"]);

        let down = graph
            .get_hierarchy("api", HierarchyDirection::Down, DEFAULT_HIERARCHY_DEPTH)
            .unwrap();
        assert_eq!(node_ids(&down), vec!["api", "handler"]);

        let both = graph
            .get_hierarchy("api", HierarchyDirection::Both, DEFAULT_HIERARCHY_DEPTH)
            .unwrap();
        assert_eq!(node_ids(&both), vec!["api", "handler", "module"]);
    }

    #[test]
    fn test_related_docs_filters_types_and_start() {
        let store = project_store();
        let graph = ContextGraph::new(&store);
        let docs = graph.get_related_docs("api").unwrap();

        // readme is a doc item, not workflow/agent/command; reviewer is two hops out.
        assert_eq!(ids(&docs), vec!["deploy", "reviewer"]);
    }

    #[test]
    fn test_related_docs_excludes_start_even_if_doc_type() {
        let store = project_store();
        let graph = ContextGraph::new(&store);
        let docs = graph.get_related_docs("deploy").unwrap();
        assert_eq!(ids(&docs), vec!["reviewer"]);
    }

    #[test]
    fn test_related_tests() {
        let store = project_store();
        let graph = ContextGraph::new(&store);
        assert_eq!(ids(&graph.get_related_tests("api").unwrap()), vec!["api_test"]);
        assert!(graph.get_related_tests("db").unwrap().is_empty());
    }

    #[test]
    fn test_node_context() {
        let store = project_store();
        let graph = ContextGraph::new(&store);
        let ctx = graph.get_node_context("api").unwrap().unwrap();

        assert_eq!(ctx.item.id, "api");
        assert_eq!(ctx.outgoing.len(), 3);
        assert_eq!(ctx.incoming.len(), 4);
        assert!(graph.get_node_context("ghost").unwrap().is_none());
    }

    #[test]
    fn test_nodes_by_relation_category() {
        let store = project_store();
        let graph = ContextGraph::new(&store);

        let deps = graph
            .get_nodes_by_relation_category("api", RelationCategory::Dependency, Direction::Outgoing)
            .unwrap();
        assert_eq!(ids(&deps), vec!["db"]);

        let actions = graph
            .get_nodes_by_relation_category("api", RelationCategory::Action, Direction::Outgoing)
            .unwrap();
        assert_eq!(ids(&actions), vec!["auth"]);

        let associated = graph
            .get_nodes_by_relation_category("api", RelationCategory::Association, Direction::Incoming)
            .unwrap();
        assert_eq!(ids(&associated), vec!["api_test", "deploy", "readme"]);
    }

    #[test]
    fn test_queries_on_missing_item_are_empty() {
        let store = project_store();
        let graph = ContextGraph::new(&store);
        assert!(graph.get_dependency_chain("ghost", 5).unwrap().is_empty());
        assert!(graph.get_related_docs("ghost").unwrap().is_empty());
        assert!(graph
            .get_nodes_by_relation_category("ghost", RelationCategory::Hierarchy, Direction::Both)
            .unwrap()
            .is_empty());
    }
}
