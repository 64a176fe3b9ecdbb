use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::graph::{PathOptions, TraverseOptions};

const DEFAULT_CONFIG_FILE: &str = "ctxgraph.toml";
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ctxgraph: CtxgraphConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
}

/// Storage and logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct CtxgraphConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CtxgraphConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
        }
    }
}

/// Default bounds for graph queries
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    #[serde(default = "default_path_max_depth")]
    pub path_max_depth: usize,
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
            path_max_depth: default_path_max_depth(),
            max_paths: default_max_paths(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".ctxgraph/graph.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_depth() -> usize {
    TraverseOptions::default().max_depth
}

fn default_max_nodes() -> usize {
    TraverseOptions::default().max_nodes
}

fn default_path_max_depth() -> usize {
    PathOptions::default().max_depth
}

fn default_max_paths() -> usize {
    PathOptions::default().max_paths
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env (if present) first, then:
    /// 1. Path in the CTXGRAPH_CONFIG environment variable (must exist)
    /// 2. ./ctxgraph.toml if present
    /// 3. Built-in defaults
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match std::env::var("CTXGRAPH_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.traversal.max_nodes == 0 {
            anyhow::bail!("traversal.max_nodes must be greater than 0");
        }

        if self.traversal.max_paths == 0 {
            anyhow::bail!("traversal.max_paths must be greater than 0");
        }

        let level = self.ctxgraph.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "ctxgraph.log_level must be one of {}, got {}",
                LOG_LEVELS.join("/"),
                self.ctxgraph.log_level
            );
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.ctxgraph.db_path
    }

    /// Traversal options seeded with the configured bounds
    pub fn traverse_options(&self) -> TraverseOptions {
        TraverseOptions::default()
            .with_max_depth(self.traversal.max_depth)
            .with_max_nodes(self.traversal.max_nodes)
    }

    pub fn path_options(&self) -> PathOptions {
        PathOptions {
            max_depth: self.traversal.path_max_depth,
            max_paths: self.traversal.max_paths,
        }
    }
}
