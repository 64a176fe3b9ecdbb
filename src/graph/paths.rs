//! Simple-path enumeration between two items.

use std::collections::HashSet;

use serde::Serialize;

use super::{ContextGraph, ContextItem, GraphStore, RelationEdge};
use crate::error::Result;

pub const DEFAULT_PATH_MAX_DEPTH: usize = 5;
pub const DEFAULT_MAX_PATHS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOptions {
    /// Maximum path length in edges.
    pub max_depth: usize,
    pub max_paths: usize,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_PATH_MAX_DEPTH,
            max_paths: DEFAULT_MAX_PATHS,
        }
    }
}

/// One simple path: `nodes[i] --edges[i]--> nodes[i + 1]`.
#[derive(Debug, Clone, Serialize)]
pub struct GraphPath {
    pub nodes: Vec<ContextItem>,
    pub edges: Vec<RelationEdge>,
    /// Number of edges.
    pub length: usize,
}

impl GraphPath {
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PathResult {
    pub source: ContextItem,
    pub target: ContextItem,
    /// Sorted by ascending length; equal lengths keep discovery order.
    pub paths: Vec<GraphPath>,
    /// At least one more path within `max_depth` exists beyond the `max_paths` returned.
    pub truncated: bool,
}

struct PathSearch<'q> {
    target_id: &'q str,
    options: PathOptions,
    on_branch: HashSet<String>,
    nodes: Vec<ContextItem>,
    edges: Vec<RelationEdge>,
    paths: Vec<GraphPath>,
    truncated: bool,
}

impl PathSearch<'_> {
    /// Keep the current branch as a path, or note that the cap cut it off.
    fn record_current(&mut self) {
        if self.paths.len() >= self.options.max_paths {
            self.truncated = true;
            return;
        }
        self.paths.push(GraphPath {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            length: self.edges.len(),
        });
    }
}

impl<'a, S: GraphStore + ?Sized> ContextGraph<'a, S> {
    /// Enumerate simple paths from `source_id` to `target_id` along outgoing edges.
    ///
    /// Returns `None` when either id does not resolve. When the two ids are
    /// equal the result holds a single zero-length path.
    pub fn find_paths(
        &self,
        source_id: &str,
        target_id: &str,
        options: &PathOptions,
    ) -> Result<Option<PathResult>> {
        let Some(source) = self.store.get_item(source_id)? else {
            return Ok(None);
        };
        let Some(target) = self.store.get_item(target_id)? else {
            return Ok(None);
        };

        let mut search = PathSearch {
            target_id,
            options: *options,
            on_branch: HashSet::from([source.id.clone()]),
            nodes: vec![source.clone()],
            edges: Vec::new(),
            paths: Vec::new(),
            truncated: false,
        };
        self.extend_paths(&mut search)?;

        let mut paths = search.paths;
        paths.sort_by_key(|p| p.length);

        log::debug!(
            "find_paths {} -> {}: {} paths{}",
            source_id,
            target_id,
            paths.len(),
            if search.truncated { " (truncated)" } else { "" }
        );

        Ok(Some(PathResult {
            source,
            target,
            paths,
            truncated: search.truncated,
        }))
    }

    /// Once `max_paths` are held, the search continues only until one more
    /// path turns up, which marks the result truncated and ends the search.
    fn extend_paths(&self, search: &mut PathSearch<'_>) -> Result<()> {
        if search.truncated {
            return Ok(());
        }
        let Some(current_id) = search.nodes.last().map(|n| n.id.clone()) else {
            return Ok(());
        };
        if current_id == search.target_id {
            search.record_current();
            return Ok(());
        }
        if search.edges.len() >= search.options.max_depth {
            return Ok(());
        }

        for edge in self.store.get_relations_from(&current_id, None)? {
            if search.truncated {
                break;
            }
            if search.on_branch.contains(&edge.target_id) {
                continue;
            }
            let Some(next) = self.store.get_item(&edge.target_id)? else {
                continue;
            };

            search.on_branch.insert(next.id.clone());
            search.nodes.push(next);
            search.edges.push(edge);

            self.extend_paths(search)?;

            search.edges.pop();
            if let Some(left) = search.nodes.pop() {
                search.on_branch.remove(&left.id);
            }
        }
        Ok(())
    }
}
