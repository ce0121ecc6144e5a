//! Configuration system for the pursuit simulation.
//!
//! Supports YAML configuration files with sensible defaults.

use crate::error::ConfigError;
use crate::grid::Tile;
use crate::search::genetic::{DEFAULT_GENE_LENGTH, DEFAULT_MUTATION_RATE, DEFAULT_POPULATION_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest maze that still fits the cage, its surrounding corridor and a
/// border
pub const MIN_GRID_SIZE: usize = 11;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    pub search: SearchConfig,
    pub genetic: GeneticConfig,
    pub agents: AgentConfig,
    pub gate: GateConfig,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Maze dimensions and generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Passes of dead-end removal after carving
    pub dead_end_passes: u32,
}

/// Search engine limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Plies explored by minimax
    pub minimax_depth: u32,
    /// Wall-clock budget of one minimax decision, in milliseconds
    pub time_budget_ms: u64,
    /// Entries after which the minimax caches are cleared
    pub cache_bound: usize,
    /// Strategy attempts per decision before the random fallback
    pub max_retries: u32,
}

/// Live genetic search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub gene_length: usize,
    pub mutation_rate: f64,
    /// Agent that receives the trained sequence
    pub trained_agent_id: u32,
    /// Optional trained-sequence file read at agent construction
    #[serde(default)]
    pub trained_sequence: Option<PathBuf>,
}

/// Agent movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tiles moved per step (1.0 moves a whole tile)
    pub step: f32,
    /// Ticks to wait between steps
    pub move_delay: u32,
    /// Tiles projected ahead by lead targeting
    pub lead_ahead: i32,
}

/// Breakable cage gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Hits needed to break the gate
    pub hit_threshold: u32,
}

/// Pair of tiles linked for instant travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teleporter {
    pub a: Tile,
    pub b: Tile,
}

/// Headless simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Ticks between maze regenerations (0 disables)
    pub regen_interval: u64,
    /// Starting tiles of the targets, snapped to the nearest walkable tile
    pub targets: Vec<Tile>,
    /// Ticks a target waits between moves
    pub target_move_delay: u32,
    pub teleporters: Vec<Teleporter>,
}

/// Offline trainer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub population_size: usize,
    pub gene_length: usize,
    pub generations: u32,
    /// Probability that a child receives a mutation
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    /// Share of the population copied unchanged into the next generation
    pub elite_fraction: f64,
    pub tournament_size: usize,
    /// Consecutive stalled generations before stopping early
    pub patience: u32,
    /// Recent generations excluded from the stall comparison
    pub history_window: usize,
    pub start: Tile,
    pub target: Tile,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Ticks between stats logging
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 21,
            height: 21,
            dead_end_passes: 50,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            minimax_depth: 4,
            time_budget_ms: 50,
            cache_bound: 1000,
            max_retries: 3,
        }
    }
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION_SIZE,
            gene_length: DEFAULT_GENE_LENGTH,
            mutation_rate: DEFAULT_MUTATION_RATE,
            trained_agent_id: 4,
            trained_sequence: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            step: 1.0,
            move_delay: 0,
            lead_ahead: 4,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { hit_threshold: 2 }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            regen_interval: 300,
            targets: vec![Tile::new(3, 3), Tile::new(17, 17)],
            target_move_delay: 1,
            teleporters: vec![
                Teleporter {
                    a: Tile::new(2, 2),
                    b: Tile::new(18, 18),
                },
                Teleporter {
                    a: Tile::new(18, 2),
                    b: Tile::new(2, 18),
                },
            ],
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            gene_length: 20,
            generations: 100,
            mutation_rate: 0.2,
            crossover_rate: 0.8,
            elite_fraction: 0.1,
            tournament_size: 5,
            patience: 20,
            history_window: 10,
            start: Tile::new(10, 10),
            target: Tile::new(15, 15),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 100,
            log_level: "info".to_string(),
        }
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!("{} must be between 0 and 1", name)));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width < MIN_GRID_SIZE || self.grid.height < MIN_GRID_SIZE {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least {}x{}",
                MIN_GRID_SIZE, MIN_GRID_SIZE
            )));
        }
        if self.search.minimax_depth == 0 {
            return Err(ConfigError::Invalid("minimax_depth must be > 0".to_string()));
        }
        if self.genetic.population_size < 2 || self.genetic.gene_length == 0 {
            return Err(ConfigError::Invalid(
                "genetic population_size must be >= 2 and gene_length > 0".to_string(),
            ));
        }
        check_rate("genetic.mutation_rate", self.genetic.mutation_rate)?;
        if !(self.agents.step > 0.0 && self.agents.step <= 1.0) {
            return Err(ConfigError::Invalid("agents.step must be in (0, 1]".to_string()));
        }
        if self.gate.hit_threshold == 0 {
            return Err(ConfigError::Invalid("gate.hit_threshold must be > 0".to_string()));
        }
        if self.simulation.targets.is_empty() {
            return Err(ConfigError::Invalid("at least one target is required".to_string()));
        }
        if self.training.population_size < 2 || self.training.gene_length == 0 {
            return Err(ConfigError::Invalid(
                "training population_size must be >= 2 and gene_length > 0".to_string(),
            ));
        }
        if self.training.tournament_size == 0 {
            return Err(ConfigError::Invalid("tournament_size must be > 0".to_string()));
        }
        check_rate("training.mutation_rate", self.training.mutation_rate)?;
        check_rate("training.crossover_rate", self.training.crossover_rate)?;
        check_rate("training.elite_fraction", self.training.elite_fraction)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.grid.width, loaded.grid.width);
        assert_eq!(config.simulation.teleporters, loaded.simulation.teleporters);
        assert_eq!(loaded.genetic.trained_sequence, None);
    }

    #[test]
    fn test_rejects_small_grid() {
        let mut config = Config::default();
        config.grid.width = 7;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_rate() {
        let mut config = Config::default();
        config.training.crossover_rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.search.minimax_depth = 6;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.search.minimax_depth, 6);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Config::from_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
