//! Per-agent target selection rules.

use crate::grid::{Grid, Tile};
use serde::{Deserialize, Serialize};

/// How an agent picks which target to chase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetingRule {
    /// Closest live target by Manhattan distance
    Nearest,
    /// A fixed target index
    Numbered(usize),
    /// Farthest live target by Manhattan distance
    Farthest,
    /// Aim `ahead` tiles in front of target `index` along its last movement
    Lead { index: usize, ahead: i32 },
}

impl TargetingRule {
    /// Index of the target this rule chases, or `None` when every target is
    /// removed.
    ///
    /// A numbered rule whose target is removed (or out of range) falls back to
    /// the nearest remaining target. Distance ties go to the lower index.
    pub fn select(&self, agent: Tile, targets: &[Tile]) -> Option<usize> {
        let live = || {
            targets
                .iter()
                .enumerate()
                .filter(|(_, t)| !t.is_removed())
        };

        match *self {
            TargetingRule::Numbered(index) | TargetingRule::Lead { index, .. } => {
                match targets.get(index) {
                    Some(t) if !t.is_removed() => Some(index),
                    _ => TargetingRule::Nearest.select(agent, targets),
                }
            }
            TargetingRule::Nearest => live()
                .min_by_key(|(i, t)| (agent.manhattan(**t), *i))
                .map(|(i, _)| i),
            TargetingRule::Farthest => live()
                .max_by_key(|(i, t)| (agent.manhattan(**t), std::cmp::Reverse(*i)))
                .map(|(i, _)| i),
        }
    }

    /// Goal tile for the selected target.
    ///
    /// For [`TargetingRule::Lead`] this projects ahead of the target using
    /// the movement since `last_seen`; other rules return the target tile.
    pub fn goal(&self, target: Tile, last_seen: Option<Tile>, grid: &Grid) -> Tile {
        match *self {
            TargetingRule::Lead { ahead, .. } => lead_tile(target, last_seen, ahead, grid),
            _ => target,
        }
    }
}

/// Project `ahead` tiles along the target's last movement vector.
///
/// If the projected tile is not passable, its two neighbours perpendicular to
/// the movement are tried; when none works, or the target did not move, the
/// target tile itself is returned.
pub fn lead_tile(target: Tile, last_seen: Option<Tile>, ahead: i32, grid: &Grid) -> Tile {
    let Some(previous) = last_seen else {
        return target;
    };

    let dx = (target.x - previous.x).signum();
    let dy = (target.y - previous.y).signum();
    if dx == 0 && dy == 0 {
        return target;
    }

    let projected = target.offset(dx * ahead, dy * ahead);
    let candidates = [projected, projected.offset(dy, dx), projected.offset(-dy, -dx)];

    candidates
        .into_iter()
        .find(|t| grid.is_passable_tile(*t))
        .unwrap_or(target)
}
