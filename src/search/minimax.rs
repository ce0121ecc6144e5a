//! Adversarial pursuit search: minimax with alpha-beta pruning.
//!
//! The searching agent maximizes [`evaluate`], the target minimizes it, and
//! plies alternate down to a fixed depth. A wall-clock deadline is checked on
//! every recursive entry; past it a node returns its static evaluation, so a
//! call never runs much beyond its budget.

use crate::error::SearchError;
use crate::grid::{Grid, Tile};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_millis(50);
pub const DEFAULT_CACHE_BOUND: usize = 1000;

/// Static evaluation of a pursuit position, higher is better for the agent.
///
/// Combines distance (weight 2), escape routes of the target that the agent
/// is closer to, both sides' mobility, and the agent's distance to the
/// nearest grid corner.
pub fn evaluate(agent: Tile, target: Tile, grid: &Grid) -> i32 {
    let distance = agent.manhattan(target);

    let agent_moves = grid.move_count(agent) as i32;
    let target_moves = grid.move_count(target) as i32;

    let corner_distance = grid
        .corners()
        .iter()
        .map(|c| agent.manhattan(*c))
        .min()
        .unwrap_or(0);

    let routes_cut = target
        .neighbors()
        .iter()
        .filter(|route| grid.is_walkable_tile(**route) && agent.manhattan(**route) < distance)
        .count() as i32;

    let mut score = -distance * 2;
    score += (4 - routes_cut) * 30;
    score += agent_moves * 5;
    score -= target_moves * 5;
    score -= corner_distance * 3;
    score
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    agent: Tile,
    target: Tile,
    depth: u32,
    maximizing: bool,
}

/// Counters for one search engine instance
#[derive(Clone, Debug, Default)]
pub struct MinimaxStats {
    pub nodes: u64,
    pub cache_hits: u64,
    pub deadline_cutoffs: u64,
    pub cache_clears: u64,
}

/// Minimax engine with its transposition and move caches.
///
/// Caches are keyed by tile coordinates only, so they must be cleared with
/// [`MinimaxSearch::invalidate`] whenever the wall layout changes.
#[derive(Debug)]
pub struct MinimaxSearch {
    time_budget: Duration,
    cache_bound: usize,
    transpositions: HashMap<CacheKey, i32>,
    moves: HashMap<Tile, Vec<Tile>>,
    stats: MinimaxStats,
}

impl Default for MinimaxSearch {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_BUDGET, DEFAULT_CACHE_BOUND)
    }
}

impl MinimaxSearch {
    pub fn new(time_budget: Duration, cache_bound: usize) -> Self {
        Self {
            time_budget,
            cache_bound,
            transpositions: HashMap::new(),
            moves: HashMap::new(),
            stats: MinimaxStats::default(),
        }
    }

    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }

    pub fn stats(&self) -> &MinimaxStats {
        &self.stats
    }

    pub fn cache_len(&self) -> usize {
        self.transpositions.len()
    }

    /// Drop all cached evaluations and move lists
    pub fn invalidate(&mut self) {
        self.transpositions.clear();
        self.moves.clear();
    }

    /// Walkable neighbours of a tile, cached
    fn moves_from(&mut self, tile: Tile, grid: &Grid) -> Vec<Tile> {
        self.moves
            .entry(tile)
            .or_insert_with(|| grid.neighbors(tile).collect())
            .clone()
    }

    /// Minimax value of a position with a fresh deadline.
    ///
    /// With `depth == 0` this is exactly [`evaluate`].
    pub fn score(&mut self, agent: Tile, target: Tile, grid: &Grid, depth: u32, maximizing: bool) -> i32 {
        let deadline = Instant::now() + self.time_budget;
        self.search(agent, target, grid, depth, i32::MIN, i32::MAX, maximizing, deadline)
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &mut self,
        agent: Tile,
        target: Tile,
        grid: &Grid,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
        deadline: Instant,
    ) -> i32 {
        self.stats.nodes += 1;

        if Instant::now() >= deadline {
            self.stats.deadline_cutoffs += 1;
            return evaluate(agent, target, grid);
        }
        if depth == 0 {
            return evaluate(agent, target, grid);
        }

        let key = CacheKey { agent, target, depth, maximizing };
        if let Some(&cached) = self.transpositions.get(&key) {
            self.stats.cache_hits += 1;
            return cached;
        }

        // Exact only with the full window and no deadline cutoff below
        let full_window = alpha == i32::MIN && beta == i32::MAX;
        let cutoffs_before = self.stats.deadline_cutoffs;

        let value = if maximizing {
            let mut moves = self.moves_from(agent, grid);
            if moves.is_empty() {
                return evaluate(agent, target, grid);
            }
            moves.sort_by_cached_key(|m| std::cmp::Reverse(evaluate(*m, target, grid)));

            let mut best = i32::MIN;
            for next in moves {
                let eval = self.search(next, target, grid, depth - 1, alpha, beta, false, deadline);
                best = best.max(eval);
                alpha = alpha.max(eval);
                if beta <= alpha {
                    break;
                }
            }
            best
        } else {
            let mut moves = self.moves_from(target, grid);
            if moves.is_empty() {
                return evaluate(agent, target, grid);
            }
            moves.sort_by_cached_key(|m| evaluate(agent, *m, grid));

            let mut best = i32::MAX;
            for next in moves {
                let eval = self.search(agent, next, grid, depth - 1, alpha, beta, true, deadline);
                best = best.min(eval);
                beta = beta.min(eval);
                if beta <= alpha {
                    break;
                }
            }
            best
        };

        if full_window && self.stats.deadline_cutoffs == cutoffs_before {
            self.transpositions.insert(key, value);
        }
        value
    }

    /// Pick the agent's next tile.
    ///
    /// The move back onto `last_position` is excluded. When no walkable,
    /// non-reversing move exists the current tile is returned unchanged.
    /// `last_position` is updated to `agent` on every successful call.
    pub fn choose_move(
        &mut self,
        agent: Tile,
        target: Tile,
        grid: &Grid,
        depth: u32,
        last_position: &mut Option<Tile>,
    ) -> Result<Tile, SearchError> {
        if !grid.is_passable_tile(agent) {
            return Err(SearchError::InvalidPosition(agent));
        }
        if !grid.is_walkable_tile(target) {
            return Err(SearchError::InvalidPosition(target));
        }

        let deadline = Instant::now() + self.time_budget;
        let previous = last_position.unwrap_or(agent);

        let mut candidates: Vec<Tile> = self
            .moves_from(agent, grid)
            .into_iter()
            .filter(|m| *m != previous)
            .collect();

        *last_position = Some(agent);

        if candidates.is_empty() {
            return Ok(agent);
        }

        candidates.sort_by_cached_key(|m| std::cmp::Reverse(evaluate(*m, target, grid)));

        let mut best_score = i32::MIN;
        let mut best_move = agent;
        for candidate in candidates {
            let score = self.search(
                candidate,
                target,
                grid,
                depth.saturating_sub(1),
                i32::MIN,
                i32::MAX,
                false,
                deadline,
            );
            if score > best_score {
                best_score = score;
                best_move = candidate;
            }
        }

        if self.transpositions.len() > self.cache_bound || self.moves.len() > self.cache_bound {
            log::debug!(
                "minimax cache over bound ({} entries), clearing",
                self.transpositions.len()
            );
            self.invalidate();
            self.stats.cache_clears += 1;
        }

        Ok(best_move)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_zero_is_static_evaluation() {
        let grid = Grid::open(11, 11);
        let mut search = MinimaxSearch::default();
        for (a, t) in [((1, 1), (9, 9)), ((5, 5), (5, 6)), ((3, 7), (8, 2))] {
            let (a, t) = (Tile::from(a), Tile::from(t));
            assert_eq!(search.score(a, t, &grid, 0, true), evaluate(a, t, &grid));
            assert_eq!(search.score(a, t, &grid, 0, false), evaluate(a, t, &grid));
        }
    }

    #[test]
    fn test_evaluation_prefers_closer() {
        let grid = Grid::open(11, 11);
        let target = Tile::new(5, 5);
        assert!(evaluate(Tile::new(5, 3), target, &grid) > evaluate(Tile::new(5, 1), target, &grid));
    }

    #[test]
    fn test_evaluation_terms() {
        // Agent at (1,1): corner distance 2, 2 moves. Target at (3,1): 3 moves,
        // distance 2; only route (2,1) is strictly closer to the agent.
        let grid = Grid::open(7, 7);
        let score = evaluate(Tile::new(1, 1), Tile::new(3, 1), &grid);
        assert_eq!(score, -4 + 3 * 30 + 2 * 5 - 3 * 5 - 2 * 3);
    }

    #[test]
    fn test_moves_toward_target_in_corridor() {
        let grid = Grid::from_rows(&["#########", "#.......#", "#########"]);
        let mut search = MinimaxSearch::default();
        let mut last = None;
        let next = search
            .choose_move(Tile::new(2, 1), Tile::new(7, 1), &grid, 3, &mut last)
            .unwrap();
        assert_eq!(next, Tile::new(3, 1));
        assert_eq!(last, Some(Tile::new(2, 1)));
    }

    #[test]
    fn test_never_reverses() {
        let grid = Grid::open(9, 9);
        let mut search = MinimaxSearch::default();
        let mut last = Some(Tile::new(4, 3));
        let next = search
            .choose_move(Tile::new(4, 4), Tile::new(4, 1), &grid, 3, &mut last)
            .unwrap();
        assert_ne!(next, Tile::new(4, 3));
        assert!(grid.is_walkable_tile(next));
        assert_eq!(next.manhattan(Tile::new(4, 4)), 1);
    }

    #[test]
    fn test_dead_end_returns_current() {
        let grid = Grid::from_rows(&["#####", "#..##", "#####"]);
        let mut search = MinimaxSearch::default();
        let mut last = Some(Tile::new(1, 1));
        let next = search
            .choose_move(Tile::new(2, 1), Tile::new(1, 1), &grid, 2, &mut last)
            .unwrap();
        assert_eq!(next, Tile::new(2, 1));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let grid = Grid::open(5, 5);
        let mut search = MinimaxSearch::default();
        let mut last = None;
        let err = search
            .choose_move(Tile::new(1, 1), Tile::REMOVED, &grid, 2, &mut last)
            .unwrap_err();
        assert_eq!(err, SearchError::InvalidPosition(Tile::REMOVED));
    }

    #[test]
    fn test_wall_positions_rejected() {
        let grid = Grid::from_rows(&["#######", "#.....#", "#.#...#", "#.....#", "#######"]);
        let mut search = MinimaxSearch::default();
        let mut last = None;

        let err = search
            .choose_move(Tile::new(1, 1), Tile::new(2, 2), &grid, 2, &mut last)
            .unwrap_err();
        assert_eq!(err, SearchError::InvalidPosition(Tile::new(2, 2)));

        let err = search
            .choose_move(Tile::new(2, 2), Tile::new(5, 3), &grid, 2, &mut last)
            .unwrap_err();
        assert_eq!(err, SearchError::InvalidPosition(Tile::new(2, 2)));
        assert_eq!(last, None);
    }

    #[test]
    fn test_cached_values_match_fresh_search() {
        let grid = Grid::open(11, 11);
        let mut warm = MinimaxSearch::new(Duration::from_secs(5), 100_000);
        let mut last = None;
        warm.choose_move(Tile::new(2, 2), Tile::new(8, 7), &grid, 4, &mut last)
            .unwrap();

        for (a, t) in [((3, 2), (8, 7)), ((2, 3), (8, 7)), ((4, 4), (7, 7))] {
            let (a, t) = (Tile::new(a.0, a.1), Tile::new(t.0, t.1));
            let mut fresh = MinimaxSearch::new(Duration::from_secs(5), 100_000);
            assert_eq!(warm.score(a, t, &grid, 3, false), fresh.score(a, t, &grid, 3, false));
        }
    }

    #[test]
    fn test_zero_budget_terminates() {
        let grid = Grid::open(21, 21);
        let mut search = MinimaxSearch::new(Duration::ZERO, DEFAULT_CACHE_BOUND);
        let mut last = None;
        let next = search
            .choose_move(Tile::new(10, 10), Tile::new(1, 1), &grid, 12, &mut last)
            .unwrap();
        assert!(grid.is_walkable_tile(next));
        assert!(search.stats().deadline_cutoffs > 0);
    }

    #[test]
    fn test_cache_cleared_over_bound() {
        let grid = Grid::open(15, 15);
        let mut search = MinimaxSearch::new(Duration::from_secs(5), 10);
        let mut last = None;
        search
            .choose_move(Tile::new(7, 7), Tile::new(2, 2), &grid, 4, &mut last)
            .unwrap();
        assert!(search.cache_len() <= 10);
        assert!(search.stats().cache_clears >= 1);
    }
}
