//! Breadth-first traversal with depth, direction, relation-type and node-count bounds.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    ContextGraph, EdgeKey, GraphNode, GraphQueryResult, GraphStats, GraphStore, RelationEdge,
    RelationType,
};
use crate::error::{CtxgraphError, Result};

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_MAX_NODES: usize = 100;

/// Which edges of a node a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

impl Direction {
    pub fn follows_outgoing(&self) -> bool {
        matches!(self, Direction::Outgoing | Direction::Both)
    }

    pub fn follows_incoming(&self) -> bool {
        matches!(self, Direction::Incoming | Direction::Both)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
            Direction::Both => "both",
        })
    }
}

impl FromStr for Direction {
    type Err = CtxgraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "outgoing" | "out" => Ok(Direction::Outgoing),
            "incoming" | "in" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            other => Err(CtxgraphError::InvalidInput(format!("unknown direction: {other}"))),
        }
    }
}

/// Bounds and filters for [`ContextGraph::traverse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraverseOptions {
    pub max_depth: usize,
    /// `None` follows every relation type.
    pub relation_types: Option<Vec<RelationType>>,
    pub direction: Direction,
    /// Hard cap on the number of nodes collected.
    pub max_nodes: usize,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            relation_types: None,
            direction: Direction::Both,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl TraverseOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_relation_types(mut self, relation_types: impl Into<Vec<RelationType>>) -> Self {
        self.relation_types = Some(relation_types.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}

/// Queue entry: (item id, depth, ids from start to here).
type Frontier = (String, usize, Vec<String>);

#[derive(Default)]
struct EdgeAccumulator {
    seen: HashSet<EdgeKey>,
    edges: Vec<RelationEdge>,
}

impl EdgeAccumulator {
    fn record(&mut self, edge: &RelationEdge) {
        if self.seen.insert(edge.key()) {
            self.edges.push(edge.clone());
        }
    }
}

impl<'a, S: GraphStore + ?Sized> ContextGraph<'a, S> {
    /// Explore the graph breadth-first from `start_id`.
    ///
    /// Each node is expanded once, so cycles terminate. Nodes at `max_depth`
    /// are expanded too: their edges are recorded, while the neighbours they
    /// enqueue are dropped as too deep. Ids that do not resolve to an item are
    /// skipped; an unknown `start_id` yields an empty result.
    pub fn traverse(&self, start_id: &str, options: &TraverseOptions) -> Result<GraphQueryResult> {
        let filter = options.relation_types.as_deref();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<Frontier> = VecDeque::new();
        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut edges = EdgeAccumulator::default();

        queue.push_back((start_id.to_string(), 0, vec![start_id.to_string()]));

        while nodes.len() < options.max_nodes {
            let Some((id, depth, path)) = queue.pop_front() else {
                break;
            };
            if depth > options.max_depth || visited.contains(&id) {
                continue;
            }
            visited.insert(id.clone());

            let Some(item) = self.store.get_item(&id)? else {
                if depth > 0 {
                    log::warn!("Skipping dangling relation endpoint: {}", id);
                }
                continue;
            };

            let mut node = GraphNode {
                item,
                depth,
                path,
                incoming_relations: Vec::new(),
                outgoing_relations: Vec::new(),
            };

            if options.direction.follows_outgoing() {
                for edge in self.store.get_relations_from(&id, filter)? {
                    enqueue(&mut queue, &visited, &node, &edge.target_id);
                    edges.record(&edge);
                    node.outgoing_relations.push(edge);
                }
            }
            if options.direction.follows_incoming() {
                for edge in self.store.get_relations_to(&id, filter)? {
                    enqueue(&mut queue, &visited, &node, &edge.source_id);
                    edges.record(&edge);
                    node.incoming_relations.push(edge);
                }
            }

            log::trace!(
                "visited {} at depth {} ({} out, {} in)",
                id,
                depth,
                node.outgoing_relations.len(),
                node.incoming_relations.len()
            );
            nodes.push(node);
        }

        let truncated = nodes.len() >= options.max_nodes
            && self.has_pending_item(&queue, &visited, options.max_depth)?;

        let stats = GraphStats {
            node_count: nodes.len(),
            edge_count: edges.edges.len(),
            max_depth: nodes.iter().map(|n| n.depth).max().unwrap_or(0),
            truncated,
        };

        log::debug!(
            "traverse from {} ({}, depth {}): {} nodes, {} edges{}",
            start_id,
            options.direction,
            options.max_depth,
            stats.node_count,
            stats.edge_count,
            if truncated { ", truncated" } else { "" }
        );

        Ok(GraphQueryResult {
            nodes,
            edges: edges.edges,
            stats,
        })
    }

    /// Whether the frontier still holds an in-bounds, unvisited id that resolves to an item.
    fn has_pending_item(
        &self,
        queue: &VecDeque<Frontier>,
        visited: &HashSet<String>,
        max_depth: usize,
    ) -> Result<bool> {
        for (id, depth, _) in queue {
            if *depth > max_depth || visited.contains(id) {
                continue;
            }
            if self.store.get_item(id)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn enqueue(
    queue: &mut VecDeque<Frontier>,
    visited: &HashSet<String>,
    from: &GraphNode,
    next_id: &str,
) {
    if visited.contains(next_id) {
        return;
    }
    let mut path = from.path.clone();
    path.push(next_id.to_string());
    queue.push_back((next_id.to_string(), from.depth + 1, path));
}
