//! Maze generation.
//!
//! Mazes are carved with a randomized depth-first backtracker over the odd
//! coordinates, loosened by dead-end removal, and given a central cage. The
//! cage is a walled 4x2 room whose only exit is the gate tile in its bottom
//! wall; a one-tile corridor ring around the cage keeps every open tile
//! reachable whichever passages the cage walls cut.

use crate::config::{GridConfig, MIN_GRID_SIZE};
use crate::grid::{Cell, Grid, Tile};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

/// A generated maze with its cage geometry
#[derive(Clone, Debug)]
pub struct MazeLayout {
    pub grid: Grid,
    pub gate: Tile,
    /// Open tiles inside the cage
    pub cage: Vec<Tile>,
    /// Starting tiles for the agents, inside the cage
    pub cage_spawns: Vec<Tile>,
}

/// Seeded maze generator
#[derive(Clone, Debug)]
pub struct MazeGenerator {
    width: usize,
    height: usize,
    dead_end_passes: u32,
}

impl MazeGenerator {
    /// Dimensions below the minimum are raised to it
    pub fn new(width: usize, height: usize, dead_end_passes: u32) -> Self {
        Self {
            width: width.max(MIN_GRID_SIZE),
            height: height.max(MIN_GRID_SIZE),
            dead_end_passes,
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.width, config.height, config.dead_end_passes)
    }

    pub fn generate(&self, rng: &mut impl Rng) -> MazeLayout {
        let mut grid = Grid::new(self.width, self.height);

        self.carve(&mut grid, rng);
        self.reserve_cage(&mut grid);
        for _ in 0..self.dead_end_passes {
            self.remove_dead_ends(&mut grid, rng);
        }
        let (gate, cage) = self.build_cage(&mut grid);

        let cage_spawns = cage.iter().take(4).copied().collect();
        log::debug!(
            "Generated {}x{} maze with {} open tiles",
            self.width,
            self.height,
            grid.walkable_count()
        );

        MazeLayout {
            grid,
            gate,
            cage,
            cage_spawns,
        }
    }

    fn center(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Carve passages from (1, 1) in steps of two
    fn carve(&self, grid: &mut Grid, rng: &mut impl Rng) {
        let max_x = self.width as i32 - 2;
        let max_y = self.height as i32 - 2;
        let start = Tile::new(1, 1);
        grid.open_cell(start);

        let mut stack = vec![start];
        while let Some(&current) = stack.last() {
            let options: Vec<(i32, i32)> = [(0, 2), (0, -2), (2, 0), (-2, 0)]
                .into_iter()
                .filter(|(dx, dy)| {
                    let next = current.offset(*dx, *dy);
                    (1..=max_x).contains(&next.x)
                        && (1..=max_y).contains(&next.y)
                        && !grid.is_walkable_tile(next)
                })
                .collect();

            match options.choose(rng) {
                Some(&(dx, dy)) => {
                    grid.open_cell(current.offset(dx / 2, dy / 2));
                    let next = current.offset(dx, dy);
                    grid.open_cell(next);
                    stack.push(next);
                }
                None => {
                    stack.pop();
                }
            }
        }
    }

    /// Open the cage block and the corridor ring around it
    fn reserve_cage(&self, grid: &mut Grid) {
        let (cx, cy) = self.center();
        for y in cy - 2..=cy + 3 {
            for x in cx - 3..=cx + 4 {
                grid.open_cell(Tile::new(x, y));
            }
        }
    }

    /// One pass: every open tile with exactly three wall neighbours gets a
    /// random non-border wall neighbour opened
    fn remove_dead_ends(&self, grid: &mut Grid, rng: &mut impl Rng) {
        let w = self.width as i32;
        let h = self.height as i32;
        let inner = |t: &Tile| t.x > 0 && t.y > 0 && t.x < w - 1 && t.y < h - 1;

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let tile = Tile::new(x, y);
                if !grid.is_walkable_tile(tile) {
                    continue;
                }

                let mut walls: Vec<Tile> = tile
                    .neighbors()
                    .into_iter()
                    .filter(|n| !grid.is_walkable_tile(*n))
                    .collect();
                if walls.len() != 3 {
                    continue;
                }

                walls.shuffle(rng);
                if let Some(opening) = walls.into_iter().find(|t| inner(t)) {
                    grid.open_cell(opening);
                }
            }
        }
    }

    /// Wall in the cage and mark its gate; returns the gate and the cage
    /// interior
    fn build_cage(&self, grid: &mut Grid) -> (Tile, Vec<Tile>) {
        let (cx, cy) = self.center();
        let (left, right) = (cx - 2, cx + 3);
        let (top, bottom) = (cy - 1, cy + 2);

        for y in top..=bottom {
            grid.set_cell(Tile::new(left, y), Cell::Wall);
            grid.set_cell(Tile::new(right, y), Cell::Wall);
        }
        for x in left..=right {
            grid.set_cell(Tile::new(x, top), Cell::Wall);
            grid.set_cell(Tile::new(x, bottom), Cell::Wall);
        }

        let mut cage = Vec::new();
        for y in top + 1..bottom {
            for x in left + 1..right {
                let tile = Tile::new(x, y);
                grid.open_cell(tile);
                cage.push(tile);
            }
        }

        let gate = Tile::new(cx, bottom);
        grid.set_gate(Some(gate));
        (gate, cage)
    }
}

/// True when every open tile (gate included) is reachable from every other
pub fn is_connected(grid: &Grid) -> bool {
    let mut open = grid.walkable_tiles();
    if let Some(gate) = grid.gate() {
        if !grid.is_walkable_tile(gate) {
            open.push(gate);
        }
    }
    let Some(&start) = open.first() else {
        return true;
    };

    let mut seen = std::collections::HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(tile) = queue.pop_front() {
        for next in tile.neighbors() {
            if grid.is_passable_tile(next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    seen.len() == open.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_maze_connected_for_many_seeds() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let layout = MazeGenerator::new(21, 21, 50).generate(&mut rng);
            assert!(is_connected(&layout.grid), "seed {} disconnected", seed);
        }
    }

    #[test]
    fn test_border_stays_closed() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let layout = MazeGenerator::new(21, 21, 50).generate(&mut rng);
        let grid = &layout.grid;
        for i in 0..21 {
            assert!(!grid.is_walkable(i, 0));
            assert!(!grid.is_walkable(i, 20));
            assert!(!grid.is_walkable(0, i));
            assert!(!grid.is_walkable(20, i));
        }
    }

    #[test]
    fn test_cage_sealed_by_gate() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let layout = MazeGenerator::new(21, 21, 50).generate(&mut rng);
        let grid = &layout.grid;

        assert_eq!(layout.gate, Tile::new(10, 12));
        assert!(!grid.is_walkable_tile(layout.gate));
        assert!(grid.is_passable_tile(layout.gate));
        assert_eq!(layout.cage.len(), 8);
        assert_eq!(layout.cage_spawns.len(), 4);

        // Without the gate the cage is a closed room
        let mut sealed = grid.clone();
        sealed.set_gate(None);
        for tile in &layout.cage {
            for n in tile.neighbors() {
                assert!(layout.cage.contains(&n) || !sealed.is_passable_tile(n));
            }
        }
    }

    #[test]
    fn test_small_grid_clamped() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let layout = MazeGenerator::new(5, 5, 10).generate(&mut rng);
        assert_eq!(layout.grid.width(), MIN_GRID_SIZE);
        assert!(is_connected(&layout.grid));
    }

    #[test]
    fn test_same_seed_same_maze() {
        let generator = MazeGenerator::new(21, 21, 50);
        let a = generator.generate(&mut ChaCha8Rng::seed_from_u64(9));
        let b = generator.generate(&mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a.grid, b.grid);
    }
}
