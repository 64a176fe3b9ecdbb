use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ctxgraph::db::{Db, SqliteGraphStore};
use ctxgraph::graph::{
    allowed_pairs, category_of, is_valid_relation, suggest_relations, ContextGraph, ContextItem,
    ContextType, Direction, HierarchyDirection, PathOptions, RelationCategory, RelationEdge,
    RelationType, DEFAULT_DEPENDENCY_DEPTH, DEFAULT_DEPENDENTS_DEPTH, DEFAULT_HIERARCHY_DEPTH,
};
use ctxgraph::{Config, CtxgraphError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "ctxgraph")]
#[command(version, about = "Query the project knowledge graph (JSON on stdout)")]
struct Cli {
    /// Database path (overrides ctxgraph.db_path from config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Breadth-first traversal from an item
    Traverse {
        id: String,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long, default_value = "both")]
        direction: Direction,
        /// Relation types to follow (comma separated, default all)
        #[arg(long = "type", value_delimiter = ',')]
        types: Vec<RelationType>,
        #[arg(long)]
        max_nodes: Option<usize>,
    },
    /// All simple paths between two items
    Paths {
        source: String,
        target: String,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long)]
        max_paths: Option<usize>,
    },
    /// Connected clusters of the whole graph
    Clusters {
        /// Emit an object keyed by cluster name instead of a list
        #[arg(long)]
        by_name: bool,
    },
    /// What an item depends on
    Deps {
        id: String,
        #[arg(long, default_value_t = DEFAULT_DEPENDENCY_DEPTH)]
        depth: usize,
    },
    /// What depends on an item
    Dependents {
        id: String,
        #[arg(long, default_value_t = DEFAULT_DEPENDENTS_DEPTH)]
        depth: usize,
    },
    /// Containment and inheritance around an item
    Hierarchy {
        id: String,
        /// up, down or both
        #[arg(long, default_value = "both")]
        direction: HierarchyDirection,
        #[arg(long, default_value_t = DEFAULT_HIERARCHY_DEPTH)]
        depth: usize,
    },
    /// Workflows, agents and commands documenting an item
    Docs { id: String },
    /// Tests covering an item
    Tests { id: String },
    /// An item with its direct edges
    Context { id: String },
    /// Direct neighbours over one relation category
    Category {
        id: String,
        category: RelationCategory,
        #[arg(long, default_value = "outgoing")]
        direction: Direction,
    },
    /// Check a relation against the ontology
    Validate {
        source_type: ContextType,
        target_type: ContextType,
        relation: RelationType,
    },
    /// Suggest relations from a source file's content
    Suggest {
        source_file: PathBuf,
        target_name: String,
        #[arg(long, default_value = "code")]
        source_type: ContextType,
        #[arg(long, default_value = "code")]
        target_type: ContextType,
    },
    /// Import items and relations from a JSON file
    Load { file: PathBuf },
}

/// Input format for `load`.
#[derive(Debug, Deserialize)]
struct GraphImport {
    #[serde(default)]
    items: Vec<ContextItem>,
    #[serde(default)]
    relations: Vec<RelationEdge>,
}

#[derive(Debug, Serialize)]
struct LoadSummary {
    items: usize,
    relations: usize,
    rejected: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // Logs go to stderr; stdout is reserved for JSON output
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.ctxgraph.log_level.as_str()),
    )
    .init();

    if let Some(result) = run_ontology_command(&cli.command) {
        return result;
    }

    let db_path = cli.db.unwrap_or_else(|| config.db_path().to_path_buf());
    log::debug!("Database path: {}", db_path.display());
    let store = SqliteGraphStore::open(&Db::new(&db_path))
        .with_context(|| format!("Failed to open graph database {}", db_path.display()))?;
    let graph = ContextGraph::new(&store);

    match cli.command {
        Command::Traverse {
            id,
            depth,
            direction,
            types,
            max_nodes,
        } => {
            let mut options = config.traverse_options().with_direction(direction);
            if let Some(depth) = depth {
                options = options.with_max_depth(depth);
            }
            if let Some(max_nodes) = max_nodes {
                options = options.with_max_nodes(max_nodes);
            }
            if !types.is_empty() {
                options = options.with_relation_types(types);
            }
            print_json(&graph.traverse(&id, &options)?)
        }
        Command::Paths {
            source,
            target,
            depth,
            max_paths,
        } => {
            let defaults = config.path_options();
            let options = PathOptions {
                max_depth: depth.unwrap_or(defaults.max_depth),
                max_paths: max_paths.unwrap_or(defaults.max_paths),
            };
            match graph.find_paths(&source, &target, &options)? {
                Some(result) => print_json(&result),
                None => anyhow::bail!("Item not found: {} or {}", source, target),
            }
        }
        Command::Clusters { by_name: true } => print_json(&graph.get_clusters_by_name()?),
        Command::Clusters { by_name: false } => print_json(&graph.get_clusters()?),
        Command::Deps { id, depth } => print_json(&graph.get_dependency_chain(&id, depth)?),
        Command::Dependents { id, depth } => print_json(&graph.get_dependents(&id, depth)?),
        Command::Hierarchy {
            id,
            direction,
            depth,
        } => print_json(&graph.get_hierarchy(&id, direction, depth)?),
        Command::Docs { id } => print_json(&graph.get_related_docs(&id)?),
        Command::Tests { id } => print_json(&graph.get_related_tests(&id)?),
        Command::Context { id } => match graph.get_node_context(&id)? {
            Some(context) => print_json(&context),
            None => anyhow::bail!("Item not found: {}", id),
        },
        Command::Category {
            id,
            category,
            direction,
        } => print_json(&graph.get_nodes_by_relation_category(&id, category, direction)?),
        Command::Load { file } => print_json(&load_graph(&store, &file)?),
        Command::Validate { .. } | Command::Suggest { .. } => Ok(()),
    }
}

/// Commands answered by the ontology alone, without opening the database.
fn run_ontology_command(command: &Command) -> Option<Result<()>> {
    match command {
        Command::Validate {
            source_type,
            target_type,
            relation,
        } => Some(print_json(&serde_json::json!({
            "valid": is_valid_relation(*source_type, *target_type, *relation),
            "category": category_of(*relation),
            "inverse": relation.inverse_label(),
            "allowed_pairs": allowed_pairs(*relation),
        }))),
        Command::Suggest {
            source_file,
            target_name,
            source_type,
            target_type,
        } => Some(
            std::fs::read_to_string(source_file)
                .with_context(|| format!("Failed to read {}", source_file.display()))
                .and_then(|content| {
                    print_json(&suggest_relations(
                        &content,
                        target_name,
                        *source_type,
                        *target_type,
                    ))
                }),
        ),
        _ => None,
    }
}

fn load_graph(store: &SqliteGraphStore, file: &Path) -> Result<LoadSummary> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let import: GraphImport = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    log::info!(
        "Loading {} items and {} relations from {}",
        import.items.len(),
        import.relations.len(),
        file.display()
    );

    for item in &import.items {
        store.upsert_item(item)?;
    }

    let mut summary = LoadSummary {
        items: import.items.len(),
        relations: 0,
        rejected: 0,
    };
    for edge in &import.relations {
        match store.add_validated_relation(edge) {
            Ok(()) => summary.relations += 1,
            Err(e @ (CtxgraphError::InvalidRelation { .. } | CtxgraphError::ItemNotFound(_))) => {
                log::warn!(
                    "Rejected relation {} -[{}]-> {}: {}",
                    edge.source_id,
                    edge.relation_type,
                    edge.target_id,
                    e
                );
                summary.rejected += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to store relation {} -[{}]-> {}",
                        edge.source_id, edge.relation_type, edge.target_id
                    )
                })
            }
        }
    }

    log::info!(
        "Loaded {} items, {} relations ({} rejected)",
        summary.items,
        summary.relations,
        summary.rejected
    );
    Ok(summary)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
