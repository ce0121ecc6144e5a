//! # PURSUIT
//!
//! Real-time pursuit agents for mutable grid mazes.
//!
//! ## Features
//!
//! - **Four strategies**: breadth-first search, A*, time-boxed minimax with
//!   alpha-beta pruning, and an evolutionary move-sequence search
//! - **Never stalls**: failed searches are retried, then replaced by a biased
//!   random step
//! - **Mutable mazes**: regeneration, a breakable cage gate and teleporters
//! - **Trainable**: offline genetic training writes sequences agents can load
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pursuit::{Config, Simulation};
//!
//! let config = Config::default();
//! let mut sim = Simulation::new(config);
//!
//! sim.run(1000);
//!
//! println!("Captures: {}", sim.stats.captures);
//! println!("{}", sim.stats.summary());
//! ```
//!
//! ## Searching a grid directly
//!
//! ```rust
//! use pursuit::grid::{Grid, Tile};
//! use pursuit::search::{astar, bfs};
//!
//! let grid = Grid::open(21, 21);
//! let path = astar(Tile::new(1, 1), Tile::new(19, 19), &grid);
//! assert_eq!(path.len(), 36);
//! assert_eq!(bfs(Tile::new(1, 1), Tile::new(19, 19), &grid).len(), 36);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use pursuit::Config;
//!
//! let mut config = Config::default();
//! config.search.minimax_depth = 6;
//! config.gate.hit_threshold = 3;
//! ```

pub mod agent;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod grid;
pub mod maze;
pub mod movement;
pub mod search;
pub mod simulation;
pub mod stats;
pub mod targeting;
pub mod training;

// Re-export main types
pub use config::Config;
pub use controller::Controller;
pub use error::{ConfigError, SearchError, TrainingError};
pub use grid::{Grid, Tile};
pub use search::Strategy;
pub use simulation::Simulation;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(steps: u64, grid_size: usize) -> BenchmarkResult {
    use std::time::Instant;

    let mut config = Config::default();
    config.grid.width = grid_size;
    config.grid.height = grid_size;

    let mut sim = Simulation::new(config);

    let start = Instant::now();
    sim.run(steps);
    let elapsed = start.elapsed();

    BenchmarkResult {
        steps: sim.time,
        grid_size,
        captures: sim.stats.captures,
        regenerations: sim.stats.regenerations,
        fallbacks: sim.stats.total_fallbacks(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: sim.time as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub grid_size: usize,
    pub captures: u32,
    pub regenerations: u32,
    pub fallbacks: u64,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Grid: {}x{}", self.grid_size, self.grid_size)?;
        writeln!(f, "Captures: {}", self.captures)?;
        writeln!(f, "Regenerations: {}", self.regenerations)?;
        writeln!(f, "Fallback steps: {}", self.fallbacks)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        Ok(())
    }
}
