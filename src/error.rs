use thiserror::Error;

/// Main error type for ctxgraph
#[derive(Error, Debug)]
pub enum CtxgraphError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store access failures not covered by the database variant
    #[error("Store error: {0}")]
    Store(String),

    /// Relation type name not in the ontology
    #[error("Unknown relation type: {0}")]
    UnknownRelationType(String),

    /// Item type name not in the ontology
    #[error("Unknown item type: {0}")]
    UnknownItemType(String),

    /// Relation rejected by the ontology's allowed-pair table
    #[error("Invalid relation: {source_type} -[{relation_type}]-> {target_type}")]
    InvalidRelation {
        source_type: String,
        target_type: String,
        relation_type: String,
    },

    /// Item not found
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using CtxgraphError
pub type Result<T> = std::result::Result<T, CtxgraphError>;
