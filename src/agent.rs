//! Pursuer agents and their lifecycle state.

use crate::gate::Gate;
use crate::grid::Tile;
use crate::search::{GeneSequence, GeneticSearch, Strategy};
use crate::targeting::TargetingRule;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Lifecycle: Caged → Escaping → Pursuing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    Caged,
    Escaping,
    Pursuing,
}

/// Sub-tile position in tile units
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn from_tile(tile: Tile) -> Self {
        Self {
            x: tile.x as f32,
            y: tile.y as f32,
        }
    }

    /// Tile the position rounds to
    pub fn tile(&self) -> Tile {
        Tile::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// Static description of an agent: identity, strategy and targeting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: u32,
    pub strategy: Strategy,
    pub targeting: TargetingRule,
}

/// The four standard pursuers, one per strategy
pub fn default_roster(lead_ahead: i32) -> Vec<AgentSpec> {
    vec![
        AgentSpec {
            id: 1,
            strategy: Strategy::Bfs,
            targeting: TargetingRule::Lead {
                index: 0,
                ahead: lead_ahead,
            },
        },
        AgentSpec {
            id: 2,
            strategy: Strategy::AStar,
            targeting: TargetingRule::Numbered(1),
        },
        AgentSpec {
            id: 3,
            strategy: Strategy::Minimax,
            targeting: TargetingRule::Farthest,
        },
        AgentSpec {
            id: 4,
            strategy: Strategy::Genetic,
            targeting: TargetingRule::Nearest,
        },
    ]
}

/// A pursuer agent
#[derive(Clone, Debug)]
pub struct Agent {
    pub id: u32,
    pub strategy: Strategy,
    pub targeting: TargetingRule,
    pub state: AgentState,
    pub position: Position,
    pub spawn: Tile,
    /// Cached path; head is the next tile to step onto
    pub path: VecDeque<Tile>,
    /// Ticks until the next step is allowed
    pub cooldown: u32,
    pub alive: bool,
    pub escaped: bool,
    /// Last tile the agent stood on that was passable
    pub last_valid: Tile,
    /// Index and tile of the target observed on the previous decision (lead
    /// targeting)
    pub last_target_seen: Option<(usize, Tile)>,
    /// Previous tile for minimax anti-oscillation
    pub last_minimax_position: Option<Tile>,
    /// Live genetic search state, created lazily
    pub genetic: Option<GeneticSearch>,
    /// Trained sequence used to seed the genetic population
    pub trained_seed: Option<GeneSequence>,
}

impl Agent {
    pub fn new(spec: AgentSpec, spawn: Tile) -> Self {
        Self {
            id: spec.id,
            strategy: spec.strategy,
            targeting: spec.targeting,
            state: AgentState::Caged,
            position: Position::from_tile(spawn),
            spawn,
            path: VecDeque::new(),
            cooldown: 0,
            alive: true,
            escaped: false,
            last_valid: spawn,
            last_target_seen: None,
            last_minimax_position: None,
            genetic: None,
            trained_seed: None,
        }
    }

    pub fn with_trained_seed(mut self, genes: Option<GeneSequence>) -> Self {
        self.trained_seed = genes.filter(|g| !g.is_empty());
        self
    }

    #[inline]
    pub fn tile(&self) -> Tile {
        self.position.tile()
    }

    /// Put the agent exactly on a tile, dropping any planned path
    pub fn place_at(&mut self, tile: Tile) {
        self.position = Position::from_tile(tile);
        self.last_valid = tile;
        self.path.clear();
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Back to the spawn tile, caged, with search state dropped
    pub fn reset(&mut self) {
        self.place_at(self.spawn);
        self.state = AgentState::Caged;
        self.cooldown = 0;
        self.alive = true;
        self.escaped = false;
        self.last_target_seen = None;
        self.last_minimax_position = None;
        self.genetic = None;
    }

    /// Finish the escape when standing on the broken gate.
    ///
    /// Returns true only on the call that performs the transition.
    pub fn complete_escape(&mut self, gate: &mut Gate) -> bool {
        if self.escaped || self.state != AgentState::Escaping {
            return false;
        }
        if !gate.is_broken() || self.tile() != gate.tile() {
            return false;
        }

        self.state = AgentState::Pursuing;
        self.escaped = true;
        self.path.clear();
        gate.record_escape();
        log::info!("Agent {} ({}) escaped through {}", self.id, self.strategy, gate.tile());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn spec() -> AgentSpec {
        default_roster(4)[0]
    }

    #[test]
    fn test_position_rounding() {
        let p = Position { x: 3.4, y: 6.6 };
        assert_eq!(p.tile(), Tile::new(3, 7));
    }

    #[test]
    fn test_roster_covers_all_strategies() {
        let roster = default_roster(4);
        let strategies: Vec<Strategy> = roster.iter().map(|s| s.strategy).collect();
        assert_eq!(strategies, Strategy::ALL.to_vec());
    }

    #[test]
    fn test_escape_exactly_once() {
        let mut grid = Grid::from_rows(&["#####", "#...#", "##G##", "#...#", "#####"]);
        let gate_tile = Tile::new(2, 2);
        let mut gate = Gate::new(gate_tile, 1);
        let mut agent = Agent::new(spec(), gate_tile);
        agent.state = AgentState::Escaping;

        assert!(!agent.complete_escape(&mut gate));
        gate.hit(&mut grid);
        assert!(agent.complete_escape(&mut gate));
        assert!(!agent.complete_escape(&mut gate));
        assert_eq!(agent.state, AgentState::Pursuing);
        assert_eq!(gate.escaped_count(), 1);
    }

    #[test]
    fn test_reset_returns_to_cage() {
        let mut agent = Agent::new(spec(), Tile::new(5, 5));
        agent.state = AgentState::Pursuing;
        agent.escaped = true;
        agent.place_at(Tile::new(1, 1));
        agent.path.push_back(Tile::new(1, 2));
        agent.reset();
        assert_eq!(agent.tile(), Tile::new(5, 5));
        assert_eq!(agent.state, AgentState::Caged);
        assert!(agent.path.is_empty());
        assert!(!agent.escaped);
    }

    #[test]
    fn test_empty_seed_ignored() {
        let agent = Agent::new(spec(), Tile::new(1, 1)).with_trained_seed(Some(Vec::new()));
        assert!(agent.trained_seed.is_none());
    }
}
