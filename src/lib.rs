//! # ctxgraph
//!
//! Typed knowledge graph over a project's indexed artifacts (code, docs,
//! commits, agents, commands) and the structural queries that run over it:
//! dependency chains, dependents, hierarchy, related docs and tests, simple
//! paths between two items and connected clusters.
//!
//! ```text
//! GraphStore (trait)  <- SqliteGraphStore / MemoryGraphStore
//!     │
//!     └──> ContextGraph
//!            ├─ traverse        BFS with depth/direction/type/node caps
//!            ├─ find_paths      bounded simple-path DFS
//!            ├─ get_clusters    undirected connected components
//!            └─ named queries   thin traverse presets
//! ```

pub mod config;
pub mod error;
pub mod db;
pub mod graph;

pub use config::Config;
pub use error::{CtxgraphError, Result};
pub use graph::{
    ContextGraph, ContextItem, ContextType, GraphQueryResult, GraphStore, RelationCategory,
    RelationEdge, RelationType,
};
