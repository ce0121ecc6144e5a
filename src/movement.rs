//! Path execution: stepping agents along their cached paths.

use crate::agent::{Agent, Position};
use crate::grid::{Grid, Tile};
use rand::seq::SliceRandom;
use rand::Rng;

/// What a call to [`Mover::advance`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// No path to follow
    Idle,
    /// Waiting for the move cooldown
    CoolingDown,
    /// Moved toward the head tile without reaching it
    Moved,
    /// Reached the head tile and popped it
    Arrived,
    /// Landed on an impassable tile; moved back and dropped the path
    Reverted,
}

/// Movement parameters shared by all agents
#[derive(Clone, Copy, Debug)]
pub struct Mover {
    /// Tiles per step
    pub step: f32,
    /// Ticks between steps
    pub move_delay: u32,
}

impl Default for Mover {
    fn default() -> Self {
        Self {
            step: 1.0,
            move_delay: 0,
        }
    }
}

impl Mover {
    pub fn new(step: f32, move_delay: u32) -> Self {
        Self { step, move_delay }
    }

    /// Advance one step toward the head of the agent's path.
    ///
    /// The step runs along the axis with the larger remaining offset. When
    /// both offsets are within `step` the agent snaps onto the head tile.
    pub fn advance(&self, agent: &mut Agent, grid: &Grid) -> StepOutcome {
        if agent.cooldown > 0 {
            agent.cooldown -= 1;
            return StepOutcome::CoolingDown;
        }

        let Some(&head) = agent.path.front() else {
            return StepOutcome::Idle;
        };

        let dx = head.x as f32 - agent.position.x;
        let dy = head.y as f32 - agent.position.y;

        let arrived = if dx.abs() <= self.step && dy.abs() <= self.step {
            agent.position = Position::from_tile(head);
            agent.path.pop_front();
            true
        } else {
            if dx.abs() >= dy.abs() {
                agent.position.x += self.step * dx.signum();
            } else {
                agent.position.y += self.step * dy.signum();
            }
            false
        };
        agent.cooldown = self.move_delay;

        let landed = agent.tile();
        if !grid.is_passable_tile(landed) {
            log::debug!("Agent {} landed on blocked {}, reverting", agent.id, landed);
            agent.position = Position::from_tile(agent.last_valid);
            agent.path.clear();
            return StepOutcome::Reverted;
        }
        agent.last_valid = landed;

        if arrived {
            StepOutcome::Arrived
        } else {
            StepOutcome::Moved
        }
    }
}

/// Random single step biased toward `goal`.
///
/// Passable neighbours that reduce the Manhattan distance get weight 4, the
/// others weight 1. Returns `None` when the agent is boxed in.
pub fn biased_random_step(from: Tile, goal: Tile, grid: &Grid, rng: &mut impl Rng) -> Option<Tile> {
    let current = from.manhattan(goal);
    let options: Vec<(Tile, u32)> = from
        .neighbors()
        .into_iter()
        .filter(|t| grid.is_passable_tile(*t))
        .map(|t| (t, if t.manhattan(goal) < current { 4 } else { 1 }))
        .collect();

    options
        .choose_weighted(rng, |(_, weight)| *weight)
        .ok()
        .map(|(tile, _)| *tile)
}

/// One step along the axis with the larger offset, falling back to the other
/// axis when blocked. Only passable tiles (the gate included) are returned.
pub fn direct_step(from: Tile, goal: Tile, grid: &Grid) -> Option<Tile> {
    let dx = (goal.x - from.x).signum();
    let dy = (goal.y - from.y).signum();

    let horizontal = from.offset(dx, 0);
    let vertical = from.offset(0, dy);
    let ordered = if (goal.x - from.x).abs() >= (goal.y - from.y).abs() {
        [horizontal, vertical]
    } else {
        [vertical, horizontal]
    };

    ordered
        .into_iter()
        .find(|t| *t != from && grid.is_passable_tile(*t))
}
