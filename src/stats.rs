//! Statistics tracking for the simulation.

use crate::search::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-strategy decision counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyCounters {
    /// Search attempts
    pub invocations: u64,
    /// Attempts that produced no usable move
    pub failures: u64,
    /// Attempts that raised a strategy fault or invalid position
    pub faults: u64,
    /// Decisions that ended in the random fallback step
    pub fallbacks: u64,
}

impl StrategyCounters {
    /// Share of attempts that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.invocations == 0 {
            return 0.0;
        }
        1.0 - (self.failures + self.faults) as f64 / self.invocations as f64
    }

    pub fn merge(&mut self, other: &StrategyCounters) {
        self.invocations += other.invocations;
        self.failures += other.failures;
        self.faults += other.faults;
        self.fallbacks += other.fallbacks;
    }
}

/// Statistics snapshot for a simulation step
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation tick
    pub time: u64,
    /// Targets captured so far
    pub captures: u32,
    /// Targets still in play
    pub targets_remaining: usize,
    /// Agents that made it out of the cage
    pub escaped_agents: u32,
    /// Tick at which the gate broke
    pub gate_broken_at: Option<u64>,
    /// Maze regenerations so far
    pub regenerations: u32,
    /// Teleports applied to agents and targets
    pub teleports: u64,
    /// Decision counters per strategy
    pub strategies: BTreeMap<Strategy, StrategyCounters>,
    /// Ticks per second (performance)
    pub ticks_per_second: f32,
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_fallbacks(&self) -> u64 {
        self.strategies.values().map(|c| c.fallbacks).sum()
    }

    /// Save stats to JSON file
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load stats from JSON file
    pub fn load_json(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        let strategies: Vec<String> = self
            .strategies
            .iter()
            .map(|(s, c)| format!("{}:{}/{}", s, c.invocations.saturating_sub(c.failures + c.faults), c.invocations))
            .collect();

        format!(
            "T:{:6} | Caught:{:2} | Left:{:2} | Out:{} | Regen:{:3} | Fallbacks:{:4} | {}",
            self.time,
            self.captures,
            self.targets_remaining,
            self.escaped_agents,
            self.regenerations,
            self.total_fallbacks(),
            strategies.join(" ")
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval
    pub interval: u64,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval,
        }
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Captures over time
    pub fn capture_series(&self) -> Vec<(u64, u32)> {
        self.snapshots.iter().map(|s| (s.time, s.captures)).collect()
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }
}
