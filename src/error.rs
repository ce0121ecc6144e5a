//! Error types.
//!
//! Nothing in the tick loop is fatal: [`SearchError`] values are produced by
//! the search engines and always recovered by the controller. The remaining
//! types only surface at the outer layer (configuration loading, training
//! files, the CLI).

use crate::grid::Tile;
use thiserror::Error;

/// Failure of a single search invocation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// No path or move toward the goal exists
    #[error("no path from {from} to {to}")]
    NoPath { from: Tile, to: Tile },

    /// A coordinate handed to a search lies outside the grid or inside a wall
    #[error("position {0} is outside the grid or inside a wall")]
    InvalidPosition(Tile),

    /// Unexpected fault inside a strategy's evaluation
    #[error("strategy fault: {0}")]
    StrategyFault(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Trained-sequence file errors
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid trained sequence: {0}")]
    Invalid(String),
}
