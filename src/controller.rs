//! Agent decision controller.
//!
//! Once per tick the controller walks the agents in fixed order. Caged
//! agents start escaping, escaping agents batter and then pass the gate, and
//! pursuing agents pick a target, consult their bound search strategy when
//! they have no cached path, and step along the result. Search failures are
//! retried a bounded number of times and then replaced by a biased random
//! step, so a tick always completes.

use crate::agent::{default_roster, Agent, AgentSpec, AgentState};
use crate::config::Config;
use crate::error::SearchError;
use crate::gate::{Gate, GateHit};
use crate::grid::{Grid, Tile};
use crate::movement::{biased_random_step, direct_step, Mover, StepOutcome};
use crate::search::{astar, bfs, pursuit_fitness, GeneticSearch, MinimaxSearch, Path, Strategy};
use crate::stats::StrategyCounters;
use crate::training::TrainedSequence;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;

/// Decision parameters shared by all agents
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    pub minimax_depth: u32,
    pub max_retries: u32,
    pub population_size: usize,
    pub gene_length: usize,
    pub mutation_rate: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            minimax_depth: 4,
            max_retries: 3,
            population_size: 20,
            gene_length: 10,
            mutation_rate: 0.1,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            minimax_depth: config.search.minimax_depth,
            max_retries: config.search.max_retries.max(1),
            population_size: config.genetic.population_size,
            gene_length: config.genetic.gene_length,
            mutation_rate: config.genetic.mutation_rate,
        }
    }
}

/// What happened during one tick
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub gate_hits: u32,
    pub gate_broken: bool,
    pub escapes: u32,
    pub fallbacks: u32,
    /// Agents that reached the head of their path: (agent id, tile)
    pub arrivals: Vec<(u32, Tile)>,
}

/// Owns the agents, the gate and the shared search state
pub struct Controller {
    agents: Vec<Agent>,
    gate: Gate,
    minimax: MinimaxSearch,
    mover: Mover,
    settings: ControllerSettings,
    rng: ChaCha8Rng,
    counters: BTreeMap<Strategy, StrategyCounters>,
}

impl Controller {
    pub fn new(
        agents: Vec<Agent>,
        gate: Gate,
        minimax: MinimaxSearch,
        mover: Mover,
        settings: ControllerSettings,
        seed: u64,
    ) -> Self {
        Self {
            agents,
            gate,
            minimax,
            mover,
            settings,
            rng: ChaCha8Rng::seed_from_u64(seed),
            counters: BTreeMap::new(),
        }
    }

    /// Standard roster spawned on `spawns` (cycled), with the trained
    /// sequence attached to the configured agent when its file loads
    pub fn from_config(config: &Config, spawns: &[Tile], gate_tile: Tile, seed: u64) -> Self {
        let trained = config
            .genetic
            .trained_sequence
            .as_ref()
            .and_then(TrainedSequence::load_optional)
            .map(|s| s.genes);

        let agents = default_roster(config.agents.lead_ahead)
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let spawn = spawns.get(i % spawns.len().max(1)).copied().unwrap_or(gate_tile);
                let genes = if spec.id == config.genetic.trained_agent_id {
                    trained.clone()
                } else {
                    None
                };
                Agent::new(spec, spawn).with_trained_seed(genes)
            })
            .collect();

        let minimax = MinimaxSearch::new(
            Duration::from_millis(config.search.time_budget_ms),
            config.search.cache_bound,
        );

        Self::new(
            agents,
            Gate::new(gate_tile, config.gate.hit_threshold),
            minimax,
            Mover::new(config.agents.step, config.agents.move_delay),
            ControllerSettings::from_config(config),
            seed,
        )
    }

    /// Agents with the given specs, all spawned at the matching tiles
    pub fn with_agents(specs: &[(AgentSpec, Tile)], gate: Gate, seed: u64) -> Self {
        let agents = specs.iter().map(|(spec, tile)| Agent::new(*spec, *tile)).collect();
        Self::new(
            agents,
            gate,
            MinimaxSearch::default(),
            Mover::default(),
            ControllerSettings::default(),
            seed,
        )
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn minimax(&self) -> &MinimaxSearch {
        &self.minimax
    }

    pub fn counters(&self) -> &BTreeMap<Strategy, StrategyCounters> {
        &self.counters
    }

    /// Advance every live agent by one decision and at most one step
    pub fn tick(&mut self, grid: &mut Grid, targets: &[Tile]) -> TickReport {
        let mut report = TickReport::default();

        for i in 0..self.agents.len() {
            if !self.agents[i].alive {
                continue;
            }

            match self.agents[i].state {
                AgentState::Caged => {
                    self.agents[i].state = AgentState::Escaping;
                    log::debug!("Agent {} leaving the cage", self.agents[i].id);
                }
                AgentState::Escaping => self.escape_step(i, grid, &mut report),
                AgentState::Pursuing => self.pursue_step(i, grid, targets, &mut report),
            }
        }

        report
    }

    fn escape_step(&mut self, i: usize, grid: &mut Grid, report: &mut TickReport) {
        if self.agents[i].complete_escape(&mut self.gate) {
            report.escapes += 1;
            return;
        }

        let gate_tile = self.gate.tile();
        let tile = self.agents[i].tile();

        if !self.gate.is_broken() && tile.manhattan(gate_tile) <= 1 {
            report.gate_hits += 1;
            if self.gate.hit(grid) == GateHit::Broken {
                report.gate_broken = true;
                self.minimax.invalidate();
                for agent in &mut self.agents {
                    agent.clear_path();
                }
            }
            return;
        }

        let agent = &mut self.agents[i];
        if agent.path.is_empty() {
            let path = astar(tile, gate_tile, grid);
            if path.is_empty() {
                if let Some(next) = direct_step(tile, gate_tile, grid) {
                    agent.path.push_back(next);
                }
            } else {
                agent.path.extend(path);
            }
        }

        if let StepOutcome::Arrived = self.mover.advance(agent, grid) {
            report.arrivals.push((agent.id, agent.tile()));
        }

        if self.agents[i].complete_escape(&mut self.gate) {
            report.escapes += 1;
        }
    }

    fn pursue_step(&mut self, i: usize, grid: &Grid, targets: &[Tile], report: &mut TickReport) {
        let tile = self.agents[i].tile();
        if !grid.is_passable_tile(tile) {
            self.snap_to_walkable(i, grid);
        }
        let tile = self.agents[i].tile();

        let goal = match self.agents[i].targeting.select(tile, targets) {
            Some(index) => {
                let target = targets[index];
                let agent = &mut self.agents[i];
                // A movement vector only makes sense between sightings of the same target
                let last_seen = agent
                    .last_target_seen
                    .filter(|(seen, _)| *seen == index)
                    .map(|(_, tile)| tile);
                let goal = agent.targeting.goal(target, last_seen, grid);
                agent.last_target_seen = Some((index, target));
                goal
            }
            None => {
                self.agents[i].last_target_seen = None;
                match grid.walkable_tiles().choose(&mut self.rng) {
                    Some(tile) => *tile,
                    None => return,
                }
            }
        };

        if self.agents[i].path.is_empty() && !self.decide(i, goal, grid) {
            report.fallbacks += 1;
        }

        let agent = &mut self.agents[i];
        if let StepOutcome::Arrived = self.mover.advance(agent, grid) {
            report.arrivals.push((agent.id, agent.tile()));
        }
    }

    /// Fill the agent's path from its strategy, retrying on failure.
    ///
    /// Returns false when every attempt failed and the random fallback was
    /// used instead.
    fn decide(&mut self, i: usize, mut goal: Tile, grid: &Grid) -> bool {
        let strategy = self.agents[i].strategy;

        for attempt in 1..=self.settings.max_retries {
            let counters = self.counters.entry(strategy).or_default();
            counters.invocations += 1;

            let result = compute_move(
                &mut self.agents[i],
                goal,
                grid,
                &mut self.minimax,
                &self.settings,
                &mut self.rng,
            );

            match result {
                Ok(path) => {
                    self.agents[i].path.extend(path);
                    return true;
                }
                Err(SearchError::NoPath { from, to }) => {
                    counters.failures += 1;
                    log::debug!(
                        "Agent {} ({}) found no path {} -> {} (attempt {})",
                        self.agents[i].id,
                        strategy,
                        from,
                        to,
                        attempt
                    );
                }
                Err(SearchError::InvalidPosition(tile)) => {
                    counters.faults += 1;
                    log::warn!("Agent {} ({}) invalid position {}", self.agents[i].id, strategy, tile);
                    if tile == self.agents[i].tile() {
                        self.snap_to_walkable(i, grid);
                    } else if let Some(nearest) = grid.nearest_walkable(goal) {
                        goal = nearest;
                    }
                }
                Err(SearchError::StrategyFault(reason)) => {
                    counters.faults += 1;
                    log::warn!("Agent {} ({}) strategy fault: {}", self.agents[i].id, strategy, reason);
                }
            }
        }

        self.counters.entry(strategy).or_default().fallbacks += 1;
        let agent = &mut self.agents[i];
        log::warn!("Agent {} ({}) falling back to a random step", agent.id, strategy);
        if let Some(next) = biased_random_step(agent.tile(), goal, grid, &mut self.rng) {
            agent.path.push_back(next);
        }
        false
    }

    fn snap_to_walkable(&mut self, i: usize, grid: &Grid) {
        let agent = &mut self.agents[i];
        let tile = agent.tile();
        if let Some(nearest) = grid.nearest_walkable(tile) {
            log::warn!("Agent {} snapped from {} to {}", agent.id, tile, nearest);
            agent.place_at(nearest);
        }
    }

    /// Adopt a freshly generated grid: drop plans, clear caches and move
    /// agents off tiles that are no longer passable
    pub fn on_grid_regenerated(&mut self, grid: &Grid) {
        self.minimax.invalidate();

        if let Some(gate_tile) = grid.gate() {
            if gate_tile != self.gate.tile() {
                self.gate.rebuild(gate_tile);
            }
        }

        for agent in &mut self.agents {
            agent.clear_path();
            agent.last_minimax_position = None;

            let tile = agent.tile();
            if !grid.is_passable_tile(tile) {
                if let Some(nearest) = grid.nearest_walkable(tile) {
                    log::debug!("Agent {} relocated from {} to {}", agent.id, tile, nearest);
                    agent.place_at(nearest);
                }
            }
        }
    }

    /// Every agent back in the cage
    pub fn reset(&mut self) {
        for agent in &mut self.agents {
            agent.reset();
        }
        self.minimax.invalidate();
    }

    /// Eliminate an agent; it is skipped until the next reset
    pub fn mark_dead(&mut self, id: u32) -> bool {
        match self.agents.iter_mut().find(|a| a.id == id) {
            Some(agent) => {
                agent.alive = false;
                agent.clear_path();
                true
            }
            None => false,
        }
    }

    /// Move an agent instantly, dropping its path
    pub fn relocate(&mut self, id: u32, tile: Tile) -> bool {
        match self.agents.iter_mut().find(|a| a.id == id) {
            Some(agent) => {
                agent.place_at(tile);
                true
            }
            None => false,
        }
    }
}

/// Run one attempt of the agent's bound strategy from its current tile.
///
/// Path searches return the whole path; minimax and genetic search return a
/// single tile. A single-tile answer equal to the current tile, or one that
/// is not walkable, is a failure. An agent off every passable tile, or a goal
/// that is not walkable, is rejected before any search runs.
pub fn compute_move(
    agent: &mut Agent,
    goal: Tile,
    grid: &Grid,
    minimax: &mut MinimaxSearch,
    settings: &ControllerSettings,
    rng: &mut ChaCha8Rng,
) -> Result<Path, SearchError> {
    let from = agent.tile();
    if !grid.is_passable_tile(from) {
        return Err(SearchError::InvalidPosition(from));
    }
    if !grid.is_walkable_tile(goal) {
        return Err(SearchError::InvalidPosition(goal));
    }
    let no_path = SearchError::NoPath { from, to: goal };

    match agent.strategy {
        Strategy::Bfs | Strategy::AStar => {
            let path = if agent.strategy == Strategy::Bfs {
                bfs(from, goal, grid)
            } else {
                astar(from, goal, grid)
            };
            if path.is_empty() {
                Err(no_path)
            } else {
                Ok(path)
            }
        }
        Strategy::Minimax => {
            let next = minimax.choose_move(
                from,
                goal,
                grid,
                settings.minimax_depth,
                &mut agent.last_minimax_position,
            )?;
            if next == from {
                Err(no_path)
            } else {
                Ok(vec![next])
            }
        }
        Strategy::Genetic => {
            let seed = agent.trained_seed.as_deref();
            let search = agent.genetic.get_or_insert_with(|| {
                GeneticSearch::with_seed(settings.population_size, settings.gene_length, seed, rng)
            });

            search.evaluate(|genes| pursuit_fitness(genes, from, goal, grid));
            let best_fitness = search.best().map(|c| c.fitness).unwrap_or(0.0);
            let proposal = search.propose_move();
            search.evolve(settings.mutation_rate, rng);

            if !best_fitness.is_finite() {
                return Err(SearchError::StrategyFault(format!(
                    "non-finite fitness {}",
                    best_fitness
                )));
            }

            let next = proposal
                .map(|d| from.step(d))
                .ok_or_else(|| SearchError::StrategyFault("empty population".to_string()))?;
            if grid.is_walkable_tile(next) {
                Ok(vec![next])
            } else {
                Err(no_path)
            }
        }
    }
}
