//! A* search with a Manhattan heuristic.
//!
//! The heuristic is consistent on a 4-connected unit-cost grid, so the first
//! time a tile is popped its cost is optimal and it is never re-expanded.
//! Equal f values are ordered by lower h, then by insertion sequence, which
//! makes the returned path deterministic.

use super::Path;
use crate::grid::{Grid, Tile, NEIGHBOR_OFFSETS};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Expansion record of one A* call
#[derive(Clone, Debug, Default)]
pub struct AStarStats {
    /// Number of nodes popped and expanded
    pub expanded: usize,
    /// f value of every expanded node, in expansion order
    pub expanded_f: Vec<u32>,
}

impl AStarStats {
    /// Largest f among expanded nodes
    pub fn max_expanded_f(&self) -> Option<u32> {
        self.expanded_f.iter().copied().max()
    }
}

/// Arena node; `parent` indexes into the same arena
struct SearchNode {
    tile: Tile,
    g: u32,
    parent: Option<usize>,
}

#[derive(PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    h: u32,
    seq: u64,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse everything for min-first order
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn heuristic(a: Tile, b: Tile) -> u32 {
    a.manhattan(b) as u32
}

/// Optimal path from `start` (exclusive) to `goal` (inclusive); empty when
/// unreachable or when `start == goal`.
pub fn astar(start: Tile, goal: Tile, grid: &Grid) -> Path {
    astar_instrumented(start, goal, grid).0
}

/// [`astar`] plus a record of every expansion
pub fn astar_instrumented(start: Tile, goal: Tile, grid: &Grid) -> (Path, AStarStats) {
    let mut stats = AStarStats::default();
    if start == goal {
        return (Vec::new(), stats);
    }

    let mut nodes: Vec<SearchNode> = Vec::new();
    let mut open = BinaryHeap::new();
    let mut closed: HashSet<Tile> = HashSet::new();
    let mut best_g: HashMap<Tile, u32> = HashMap::new();
    let mut seq = 0u64;

    let h = heuristic(start, goal);
    nodes.push(SearchNode { tile: start, g: 0, parent: None });
    best_g.insert(start, 0);
    open.push(OpenEntry { f: h, h, seq, node: 0 });

    while let Some(entry) = open.pop() {
        let current = nodes[entry.node].tile;
        if !closed.insert(current) {
            continue;
        }

        stats.expanded += 1;
        stats.expanded_f.push(entry.f);

        if current == goal {
            return (reconstruct(&nodes, entry.node), stats);
        }

        let g = nodes[entry.node].g + 1;
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let next = current.offset(dx, dy);
            if !grid.is_walkable_tile(next) || closed.contains(&next) {
                continue;
            }
            if best_g.get(&next).is_some_and(|&known| known <= g) {
                continue;
            }

            best_g.insert(next, g);
            nodes.push(SearchNode { tile: next, g, parent: Some(entry.node) });
            seq += 1;
            let h = heuristic(next, goal);
            open.push(OpenEntry { f: g + h, h, seq, node: nodes.len() - 1 });
        }
    }

    (Vec::new(), stats)
}

/// Walk the parent chain back to the root and reverse into start→goal order,
/// dropping the start tile itself
fn reconstruct(nodes: &[SearchNode], mut index: usize) -> Path {
    let mut path = Vec::new();
    while let Some(parent) = nodes[index].parent {
        path.push(nodes[index].tile);
        index = parent;
    }
    path.reverse();
    path
}
