//! The read interface the engine is parameterised over, plus an in-memory
//! implementation.

use std::collections::HashMap;

use super::ontology::is_valid_relation;
use super::{ContextItem, RelationEdge, RelationType};
use crate::error::{CtxgraphError, Result};

/// Read operations the engine needs from whatever persists the graph.
///
/// Each call is a discrete synchronous read. The engine makes no consistency
/// assumption across calls.
pub trait GraphStore {
    fn get_item(&self, id: &str) -> Result<Option<ContextItem>>;

    fn get_all_items(&self) -> Result<Vec<ContextItem>>;

    /// Edges with `source_id == id`, restricted to `relation_types` when given.
    fn get_relations_from(
        &self,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationEdge>>;

    /// Edges with `target_id == id`, restricted to `relation_types` when given.
    fn get_relations_to(
        &self,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationEdge>>;
}

/// Check `edge` against the ontology using the endpoint types found in `store`.
///
/// Writers call this before persisting an edge.
pub fn validate_relation<S: GraphStore + ?Sized>(store: &S, edge: &RelationEdge) -> Result<()> {
    let source = store
        .get_item(&edge.source_id)?
        .ok_or_else(|| CtxgraphError::ItemNotFound(edge.source_id.clone()))?;
    let target = store
        .get_item(&edge.target_id)?
        .ok_or_else(|| CtxgraphError::ItemNotFound(edge.target_id.clone()))?;

    if is_valid_relation(source.item_type, target.item_type, edge.relation_type) {
        Ok(())
    } else {
        Err(CtxgraphError::InvalidRelation {
            source_type: source.item_type.to_string(),
            target_type: target.item_type.to_string(),
            relation_type: edge.relation_type.to_string(),
        })
    }
}

fn type_allowed(relation_types: Option<&[RelationType]>, relation_type: RelationType) -> bool {
    relation_types.map_or(true, |types| types.contains(&relation_type))
}

/// Insertion-ordered in-memory store.
///
/// Referential integrity is not enforced, so an edge may name an id with no item.
#[derive(Debug, Default, Clone)]
pub struct MemoryGraphStore {
    items: Vec<ContextItem>,
    index: HashMap<String, usize>,
    edges: Vec<RelationEdge>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item by id.
    pub fn add_item(&mut self, item: ContextItem) {
        match self.index.get(&item.id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    /// Insert or replace an edge by its (source, target, relation type) triple.
    pub fn add_relation(&mut self, edge: RelationEdge) {
        match self.edges.iter_mut().find(|e| e.same_triple(&edge)) {
            Some(existing) => *existing = edge,
            None => self.edges.push(edge),
        }
    }

    /// [`add_relation`](Self::add_relation) gated by [`validate_relation`].
    pub fn add_validated_relation(&mut self, edge: RelationEdge) -> Result<()> {
        validate_relation(&*self, &edge)?;
        self.add_relation(edge);
        Ok(())
    }

    /// Remove the edge with this triple. Returns whether one existed.
    pub fn remove_relation(
        &mut self,
        source_id: &str,
        target_id: &str,
        relation_type: RelationType,
    ) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| {
            !(e.source_id == source_id && e.target_id == target_id && e.relation_type == relation_type)
        });
        self.edges.len() != before
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn relation_count(&self) -> usize {
        self.edges.len()
    }
}

impl GraphStore for MemoryGraphStore {
    fn get_item(&self, id: &str) -> Result<Option<ContextItem>> {
        Ok(self.index.get(id).map(|&pos| self.items[pos].clone()))
    }

    fn get_all_items(&self) -> Result<Vec<ContextItem>> {
        Ok(self.items.clone())
    }

    fn get_relations_from(
        &self,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationEdge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.source_id == id && type_allowed(relation_types, e.relation_type))
            .cloned()
            .collect())
    }

    fn get_relations_to(
        &self,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationEdge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.target_id == id && type_allowed(relation_types, e.relation_type))
            .cloned()
            .collect())
    }
}
