//! SQLite-backed [`GraphStore`].

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{Db, SCHEMA_SQL};
use crate::error::{CtxgraphError, Result};
use crate::graph::{validate_relation, ContextItem, GraphStore, RelationEdge, RelationType};

const ITEM_COLUMNS: &str = "id, item_type, name, content, file_path, metadata_json";
const RELATION_COLUMNS: &str = "source_id, target_id, relation_type, weight, metadata_json";

type ItemRow = (String, String, String, String, Option<String>, Option<String>);
type RelationRow = (String, String, String, Option<f64>, Option<String>);

/// Graph store over the `context_items` / `item_relations` tables.
///
/// Holds one connection behind a mutex; each trait call is one query.
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Open (creating if needed) the database managed by `db`.
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(db.open_with_schema()?),
        })
    }

    /// Wrap an existing connection, creating the graph tables if missing.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CtxgraphError::Store("connection lock poisoned".to_string()))
    }

    /// Insert or update an item by id.
    pub fn upsert_item(&self, item: &ContextItem) -> Result<()> {
        let metadata = encode_metadata(&item.metadata)?;
        self.conn()?.execute(
            "INSERT INTO context_items (id, item_type, name, content, file_path, metadata_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET \
                item_type = excluded.item_type, \
                name = excluded.name, \
                content = excluded.content, \
                file_path = excluded.file_path, \
                metadata_json = excluded.metadata_json, \
                updated_at = CURRENT_TIMESTAMP",
            params![
                item.id,
                item.item_type.as_str(),
                item.name,
                item.content,
                item.file_path,
                metadata
            ],
        )?;
        Ok(())
    }

    /// Insert or update an edge by its (source, target, relation type) triple.
    ///
    /// Does not consult the ontology; see [`add_validated_relation`](Self::add_validated_relation).
    pub fn add_relation(&self, edge: &RelationEdge) -> Result<()> {
        let metadata = encode_metadata(&edge.metadata)?;
        self.conn()?.execute(
            "INSERT INTO item_relations (source_id, target_id, relation_type, weight, metadata_json) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(source_id, target_id, relation_type) DO UPDATE SET \
                weight = excluded.weight, \
                metadata_json = excluded.metadata_json",
            params![
                edge.source_id,
                edge.target_id,
                edge.relation_type.as_str(),
                edge.weight,
                metadata
            ],
        )?;
        Ok(())
    }

    pub fn add_validated_relation(&self, edge: &RelationEdge) -> Result<()> {
        validate_relation(self, edge)?;
        self.add_relation(edge)
    }

    /// Returns whether a relation was removed.
    pub fn remove_relation(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: RelationType,
    ) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM item_relations \
             WHERE source_id = ?1 AND target_id = ?2 AND relation_type = ?3",
            params![source_id, target_id, relation_type.as_str()],
        )?;
        Ok(removed > 0)
    }

    pub fn item_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM context_items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn relation_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM item_relations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_relations(
        &self,
        column: &str,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationEdge>> {
        let mut sql = format!("SELECT {RELATION_COLUMNS} FROM item_relations WHERE {column} = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(id.to_string())];

        if let Some(types) = relation_types {
            if types.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = types.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            sql.push_str(&format!(" AND relation_type IN ({placeholders})"));
            for t in types {
                params.push(Box::new(t.as_str()));
            }
        }
        sql.push_str(" ORDER BY rowid");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<RelationRow>, rusqlite::Error>>()?;

        rows.into_iter().map(relation_from_row).collect()
    }
}

impl GraphStore for SqliteGraphStore {
    fn get_item(&self, id: &str) -> Result<Option<ContextItem>> {
        let row: Option<ItemRow> = self
            .conn()?
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM context_items WHERE id = ?1"),
                [id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?;
        row.map(item_from_row).transpose()
    }

    fn get_all_items(&self) -> Result<Vec<ContextItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM context_items ORDER BY rowid"
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<ItemRow>, rusqlite::Error>>()?;

        rows.into_iter().map(item_from_row).collect()
    }

    fn get_relations_from(
        &self,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationEdge>> {
        self.query_relations("source_id", id, relation_types)
    }

    fn get_relations_to(
        &self,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationEdge>> {
        self.query_relations("target_id", id, relation_types)
    }
}

fn encode_metadata(metadata: &Value) -> Result<Option<String>> {
    if metadata.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(metadata)?))
}

fn decode_metadata(raw: Option<String>) -> Result<Value> {
    match raw {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Value::Null),
    }
}

fn item_from_row(row: ItemRow) -> Result<ContextItem> {
    let (id, item_type, name, content, file_path, metadata) = row;
    Ok(ContextItem {
        id,
        item_type: item_type.parse()?,
        name,
        content,
        file_path,
        metadata: decode_metadata(metadata)?,
    })
}

fn relation_from_row(row: RelationRow) -> Result<RelationEdge> {
    let (source_id, target_id, relation_type, weight, metadata) = row;
    Ok(RelationEdge {
        source_id,
        target_id,
        relation_type: relation_type.parse()?,
        weight,
        metadata: decode_metadata(metadata)?,
    })
}
