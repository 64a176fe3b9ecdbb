use rusqlite::Connection;
use std::path::{Path, PathBuf};
use crate::error::{Result, CtxgraphError};

mod store;

pub use store::SqliteGraphStore;

/// Schema for the graph tables. Idempotent.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS context_items (
    id TEXT PRIMARY KEY,
    item_type TEXT NOT NULL,
    name TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    file_path TEXT,
    metadata_json TEXT,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS item_relations (
    source_id TEXT NOT NULL REFERENCES context_items(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES context_items(id) ON DELETE CASCADE,
    relation_type TEXT NOT NULL,
    weight REAL,
    metadata_json TEXT,
    PRIMARY KEY (source_id, target_id, relation_type)
);

CREATE INDEX IF NOT EXISTS idx_item_relations_target ON item_relations(target_id);
CREATE INDEX IF NOT EXISTS idx_item_relations_type ON item_relations(relation_type);
CREATE INDEX IF NOT EXISTS idx_context_items_type ON context_items(item_type);
";

/// Database connection manager
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new database connection with optimized pragmas
    pub fn open_connection(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&self.path)
            .map_err(CtxgraphError::Database)?;

        // WAL for concurrent readers, NORMAL sync, foreign keys for integrity
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA temp_store = MEMORY; \
             PRAGMA cache_size = -65536;"
        )?;

        Ok(conn)
    }

    /// Open a connection and make sure the graph tables exist.
    pub fn open_with_schema(&self) -> Result<Connection> {
        let conn = self.open_connection()?;
        conn.execute_batch(SCHEMA_SQL)?;
        log::debug!("Graph schema ready at {}", self.path.display());
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_db_connection_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("graph.db");
        let db = Db::new(&db_path);

        db.open_connection().unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_pragmas_set() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));
        let conn = db.open_connection().unwrap();

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_uppercase(), "WAL");

        let foreign_keys: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));
        db.open_with_schema().unwrap();
        let conn = db.open_with_schema().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap();
        assert!(tables.contains(&"context_items".to_string()));
        assert!(tables.contains(&"item_relations".to_string()));
    }
}
