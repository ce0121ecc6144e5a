//! Search engines.
//!
//! Four independent paradigms share the [`Grid`](crate::grid::Grid) model:
//! breadth-first and A* path searches return whole paths, while minimax and
//! the genetic search propose a single next tile.

pub mod astar;
pub mod bfs;
pub mod genetic;
pub mod minimax;

pub use astar::{astar, astar_instrumented, AStarStats};
pub use bfs::bfs;
pub use genetic::{pursuit_fitness, Candidate, GeneSequence, GeneticSearch};
pub use minimax::{evaluate, MinimaxSearch, MinimaxStats};

use crate::grid::Tile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tiles from (exclusive) start to (inclusive) goal; empty means no path
pub type Path = Vec<Tile>;

/// Decision strategy an agent is bound to at construction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    Bfs,
    AStar,
    Minimax,
    Genetic,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [Strategy::Bfs, Strategy::AStar, Strategy::Minimax, Strategy::Genetic];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Bfs => "bfs",
            Strategy::AStar => "astar",
            Strategy::Minimax => "minimax",
            Strategy::Genetic => "genetic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
