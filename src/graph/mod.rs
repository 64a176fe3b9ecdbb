//! Knowledge graph module: relation ontology and the traversal, path and
//! cluster engine over an injected [`GraphStore`].
//!
//! The engine is read-only and synchronous. Every query builds its own
//! visited sets and accumulators and drops them on return.

mod clusters;
mod ontology;
mod paths;
mod queries;
mod store;
mod traversal;

pub use clusters::{clusters_by_name, Cluster};
pub use ontology::{
    allowed_pairs, category_of, is_valid_relation, suggest_relations, types_in_category,
    RelationCategory, RelationType, TypePattern,
};
pub use paths::{GraphPath, PathOptions, PathResult, DEFAULT_MAX_PATHS, DEFAULT_PATH_MAX_DEPTH};
pub use queries::{
    HierarchyDirection, NodeContext, DEFAULT_DEPENDENCY_DEPTH, DEFAULT_DEPENDENTS_DEPTH,
    DEFAULT_HIERARCHY_DEPTH, DEPENDENCY_RELATIONS, DOC_ITEM_TYPES, DOC_RELATIONS,
    HIERARCHY_RELATIONS,
};
pub use store::{validate_relation, GraphStore, MemoryGraphStore};
pub use traversal::{Direction, TraverseOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CtxgraphError;

/// Weight used when an edge carries none.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Kind of indexed artifact a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Workflow,
    Agent,
    Command,
    Code,
    Commit,
    Knowledge,
    Config,
    Doc,
    ToolConfig,
}

impl ContextType {
    pub const ALL: [ContextType; 9] = [
        Self::Workflow,
        Self::Agent,
        Self::Command,
        Self::Code,
        Self::Commit,
        Self::Knowledge,
        Self::Config,
        Self::Doc,
        Self::ToolConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Agent => "agent",
            Self::Command => "command",
            Self::Code => "code",
            Self::Commit => "commit",
            Self::Knowledge => "knowledge",
            Self::Config => "config",
            Self::Doc => "doc",
            Self::ToolConfig => "tool_config",
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextType {
    type Err = CtxgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContextType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CtxgraphError::UnknownItemType(s.to_string()))
    }
}

/// A node in the graph. Created by indexers, only read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Stable opaque identifier, unique per store.
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ContextType,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

impl ContextItem {
    pub fn new(id: impl Into<String>, item_type: ContextType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type,
            name: name.into(),
            content: String::new(),
            file_path: None,
            metadata: Value::Null,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }
}

/// Dedup key of an edge: (source id, target id, relation type).
pub type EdgeKey = (String, String, RelationType);

/// A directed, typed edge (source --relation_type--> target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    /// Defaults to [`DEFAULT_WEIGHT`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub metadata: Value,
}

impl RelationEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type,
            weight: None,
            metadata: Value::Null,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn weight(&self) -> f64 {
        self.weight.unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn key(&self) -> EdgeKey {
        (
            self.source_id.clone(),
            self.target_id.clone(),
            self.relation_type,
        )
    }

    /// Whether this edge has the same (source, target, relation type) triple as `other`.
    pub fn same_triple(&self, other: &RelationEdge) -> bool {
        self.source_id == other.source_id
            && self.target_id == other.target_id
            && self.relation_type == other.relation_type
    }
}

/// A visited node in a traversal result.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub item: ContextItem,
    /// Hops from the traversal start along the path actually taken.
    pub depth: usize,
    /// Item ids from the start to this node, start inclusive.
    pub path: Vec<String>,
    pub incoming_relations: Vec<RelationEdge>,
    pub outgoing_relations: Vec<RelationEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub max_depth: usize,
    /// The node cap stopped exploration while reachable nodes remained.
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphQueryResult {
    /// Visited nodes in BFS order, at most one per item id.
    pub nodes: Vec<GraphNode>,
    /// Traversed edges, deduplicated by [`EdgeKey`].
    pub edges: Vec<RelationEdge>,
    pub stats: GraphStats,
}

impl GraphQueryResult {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.item.id == id)
    }

    pub fn items(&self) -> impl Iterator<Item = &ContextItem> {
        self.nodes.iter().map(|n| &n.item)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Read-only query engine over a borrowed store.
///
/// Operations are split across `traversal`, `paths`, `clusters` and `queries`.
pub struct ContextGraph<'a, S: GraphStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> ContextGraph<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn code(id: &str) -> ContextItem {
        ContextItem::new(id, ContextType::Code, id.to_uppercase())
    }

    pub fn item(id: &str, item_type: ContextType) -> ContextItem {
        ContextItem::new(id, item_type, id.to_uppercase())
    }

    /// Store of code items `ids` wired with `edges` as (source, target, type).
    pub fn store_with(ids: &[&str], edges: &[(&str, &str, RelationType)]) -> MemoryGraphStore {
        let mut store = MemoryGraphStore::new();
        for id in ids {
            store.add_item(code(id));
        }
        for (s, t, r) in edges {
            store.add_relation(RelationEdge::new(*s, *t, *r));
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_type_round_trip() {
        for t in ContextType::ALL {
            assert_eq!(t.as_str().parse::<ContextType>().unwrap(), t);
        }
        assert!("module".parse::<ContextType>().is_err());
    }

    #[test]
    fn test_edge_weight_defaults() {
        let edge = RelationEdge::new("a", "b", RelationType::Uses);
        assert_eq!(edge.weight(), DEFAULT_WEIGHT);
        assert_eq!(edge.clone().with_weight(0.25).weight(), 0.25);
    }

    #[test]
    fn test_item_serializes_type_field() {
        let item = ContextItem::new("x", ContextType::ToolConfig, "x");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "tool_config");
        assert!(json.get("file_path").is_none());

        let parsed: ContextItem =
            serde_json::from_str(r#"{"id":"y","type":"agent","name":"Y"}"#).unwrap();
        assert_eq!(parsed.item_type, ContextType::Agent);
        assert_eq!(parsed.content, "");
        assert_eq!(parsed.metadata, Value::Null);
    }
}
