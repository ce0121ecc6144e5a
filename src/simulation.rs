//! Headless pursuit simulation - main loop.
//!
//! Stands in for the real-time game: it owns the maze, moves the targets with
//! a simple evasive policy, feeds the controller once per tick, applies
//! teleporters and captures, and regenerates the maze on a fixed interval.

use crate::config::{Config, Teleporter};
use crate::controller::Controller;
use crate::grid::{Grid, Tile};
use crate::maze::MazeGenerator;
use crate::stats::{Stats, StatsHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// The simulated arena
pub struct Simulation {
    // Environment
    pub grid: Grid,
    pub targets: Vec<Tile>,
    generator: MazeGenerator,

    // Agents
    pub controller: Controller,

    // State
    pub time: u64,
    target_cooldowns: Vec<u32>,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl Simulation {
    /// Create a new simulation with a random seed
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new simulation with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let generator = MazeGenerator::from_config(&config.grid);
        let layout = generator.generate(&mut rng);

        let targets: Vec<Tile> = config
            .simulation
            .targets
            .iter()
            .map(|t| placement(&layout.grid, *t, &layout.cage))
            .collect();

        let controller = Controller::from_config(&config, &layout.cage_spawns, layout.gate, rng.gen());

        log::info!(
            "Simulation ready: {}x{} maze, {} targets, seed {}",
            layout.grid.width(),
            layout.grid.height(),
            targets.len(),
            seed
        );

        Self {
            grid: layout.grid,
            target_cooldowns: vec![0; targets.len()],
            targets,
            generator,
            controller,
            time: 0,
            stats: Stats::new(),
            stats_history: StatsHistory::new(config.logging.stats_interval),
            config,
            rng,
            seed,
        }
    }

    /// Execute one simulation tick
    pub fn step(&mut self) {
        // Phase 1: Targets move
        self.move_targets();

        // Phase 2: Agents decide and move
        let report = self.controller.tick(&mut self.grid, &self.targets);
        if report.gate_broken {
            self.stats.gate_broken_at = Some(self.time);
        }
        self.stats.escaped_agents += report.escapes;

        // Phase 3: Teleporters for agents that just reached a tile
        for (id, tile) in report.arrivals {
            if let Some(exit) = self.teleport_exit(tile) {
                self.controller.relocate(id, exit);
                self.stats.teleports += 1;
            }
        }

        // Phase 4: Captures
        self.resolve_captures();

        self.time += 1;

        // Phase 5: Maze regeneration
        let interval = self.config.simulation.regen_interval;
        if interval > 0 && self.time % interval == 0 {
            self.regenerate_maze();
        }

        // Phase 6: Update statistics
        self.update_stats();
    }

    fn move_targets(&mut self) {
        let agents: Vec<Tile> = self
            .controller
            .agents()
            .iter()
            .filter(|a| a.alive)
            .map(|a| a.tile())
            .collect();

        for i in 0..self.targets.len() {
            let current = self.targets[i];
            if current.is_removed() {
                continue;
            }
            if self.target_cooldowns[i] > 0 {
                self.target_cooldowns[i] -= 1;
                continue;
            }
            self.target_cooldowns[i] = self.config.simulation.target_move_delay;

            let Some(next) = evasive_step(current, &agents, &self.grid, &mut self.rng) else {
                continue;
            };
            let landed = match self.teleport_exit(next) {
                Some(exit) => {
                    self.stats.teleports += 1;
                    exit
                }
                None => next,
            };
            self.targets[i] = landed;
        }
    }

    /// Other end of the teleporter at `tile`, if both ends are open
    fn teleport_exit(&self, tile: Tile) -> Option<Tile> {
        teleport_exit(&self.config.simulation.teleporters, tile, &self.grid)
    }

    fn resolve_captures(&mut self) {
        for target in &mut self.targets {
            if target.is_removed() {
                continue;
            }
            let caught_by = self
                .controller
                .agents()
                .iter()
                .find(|a| a.alive && a.tile() == *target)
                .map(|a| a.id);

            if let Some(id) = caught_by {
                log::info!("Target at {} captured by agent {} at tick {}", target, id, self.time);
                *target = Tile::REMOVED;
                self.stats.captures += 1;
            }
        }
    }

    /// Replace the maze with a fresh one, keeping the gate open if it was
    /// already broken
    pub fn regenerate_maze(&mut self) {
        let mut layout = self.generator.generate(&mut self.rng);
        if self.controller.gate().is_broken() {
            layout.grid.open_cell(layout.gate);
        }
        self.grid = layout.grid;
        self.controller.on_grid_regenerated(&self.grid);

        for target in &mut self.targets {
            if !target.is_removed() && !self.grid.is_walkable_tile(*target) {
                *target = placement(&self.grid, *target, &layout.cage);
            }
        }

        self.stats.regenerations += 1;
        log::info!("Maze regenerated at tick {}", self.time);
    }

    fn update_stats(&mut self) {
        self.stats.time = self.time;
        self.stats.targets_remaining = self.live_targets();
        self.stats.strategies = self.controller.counters().clone();

        // Record history
        let interval = self.config.logging.stats_interval;
        if interval > 0 && self.time % interval == 0 {
            self.stats_history.record(self.stats.clone());
            log::info!("{}", self.stats.summary());
        }
    }

    /// Run for `steps` ticks or until every target is captured
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            if self.is_finished() {
                break;
            }
            self.step();
        }
    }

    /// Run with a callback after each tick
    pub fn run_with_callback<F>(&mut self, steps: u64, mut callback: F)
    where
        F: FnMut(&Simulation, u64),
    {
        for i in 0..steps {
            if self.is_finished() {
                break;
            }
            self.step();
            callback(self, i);
        }
    }

    /// Targets not yet captured
    pub fn live_targets(&self) -> usize {
        self.targets.iter().filter(|t| !t.is_removed()).count()
    }

    /// True once every target is captured
    pub fn is_finished(&self) -> bool {
        self.live_targets() == 0
    }

    /// Get the random seed
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Nearest walkable tile to `wanted` that is not inside the cage
fn placement(grid: &Grid, wanted: Tile, cage: &[Tile]) -> Tile {
    match grid.nearest_walkable(wanted) {
        Some(tile) if !cage.contains(&tile) => tile,
        _ => grid
            .walkable_tiles()
            .into_iter()
            .find(|t| !cage.contains(t))
            .unwrap_or(wanted),
    }
}

/// Neighbour that maximizes the distance to the nearest agent, ties broken
/// at random. `None` when the target cannot move.
pub fn evasive_step(from: Tile, agents: &[Tile], grid: &Grid, rng: &mut impl Rng) -> Option<Tile> {
    let danger = |tile: Tile| agents.iter().map(|a| a.manhattan(tile)).min().unwrap_or(0);

    let options: Vec<Tile> = grid.neighbors(from).collect();
    let best = options.iter().map(|t| danger(*t)).max()?;
    let safest: Vec<Tile> = options.into_iter().filter(|t| danger(*t) == best).collect();
    safest.choose(rng).copied()
}

/// Destination of a teleporter pair entered at `tile`
pub fn teleport_exit(teleporters: &[Teleporter], tile: Tile, grid: &Grid) -> Option<Tile> {
    teleporters
        .iter()
        .find_map(|t| {
            if t.a == tile {
                Some(t.b)
            } else if t.b == tile {
                Some(t.a)
            } else {
                None
            }
        })
        .filter(|exit| grid.is_walkable_tile(tile) && grid.is_walkable_tile(*exit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentState;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.simulation.regen_interval = 0;
        config.search.time_budget_ms = 5;
        config.search.minimax_depth = 2;
        config
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::new(test_config());
        assert_eq!(sim.time, 0);
        assert_eq!(sim.live_targets(), 2);
        assert_eq!(sim.controller.agents().len(), 4);
        for target in &sim.targets {
            assert!(sim.grid.is_walkable_tile(*target));
        }
    }

    #[test]
    fn test_simulation_run() {
        let mut sim = Simulation::new_with_seed(test_config(), 7);
        sim.run(40);
        assert!(sim.time <= 40);
        assert!(sim.stats.strategies.values().any(|c| c.invocations > 0) || sim.is_finished());
        for agent in sim.controller.agents() {
            assert!(sim.grid.is_passable_tile(agent.tile()));
        }
    }

    #[test]
    fn test_agents_leave_cage() {
        let mut sim = Simulation::new_with_seed(test_config(), 8);
        sim.run(30);
        assert!(sim.controller.gate().is_broken());
        assert!(sim
            .controller
            .agents()
            .iter()
            .any(|a| a.state == AgentState::Pursuing));
        assert_eq!(sim.controller.gate().escaped_count(), sim.stats.escaped_agents);
    }

    #[test]
    fn test_regeneration_interval() {
        let mut config = test_config();
        config.simulation.regen_interval = 5;
        let mut sim = Simulation::new_with_seed(config, 9);
        for _ in 0..15 {
            sim.step();
        }
        assert_eq!(sim.stats.regenerations, 3);
        for agent in sim.controller.agents() {
            assert!(sim.grid.is_passable_tile(agent.tile()));
        }
    }

    #[test]
    fn test_same_seed_same_maze() {
        let a = Simulation::new_with_seed(test_config(), 42);
        let b = Simulation::new_with_seed(test_config(), 42);
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.targets, b.targets);
    }

    #[test]
    fn test_evasive_step_moves_away() {
        let grid = Grid::open(9, 9);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let agent = Tile::new(2, 4);
        for _ in 0..10 {
            let next = evasive_step(Tile::new(4, 4), &[agent], &grid, &mut rng).unwrap();
            assert_ne!(next, Tile::new(3, 4));
            assert_eq!(next.manhattan(agent), 3);
        }
    }

    #[test]
    fn test_teleport_exit_both_ways() {
        let grid = Grid::open(21, 21);
        let pads = [Teleporter {
            a: Tile::new(2, 2),
            b: Tile::new(18, 18),
        }];
        assert_eq!(teleport_exit(&pads, Tile::new(2, 2), &grid), Some(Tile::new(18, 18)));
        assert_eq!(teleport_exit(&pads, Tile::new(18, 18), &grid), Some(Tile::new(2, 2)));
        assert_eq!(teleport_exit(&pads, Tile::new(5, 5), &grid), None);
    }
}
