//! Breadth-first search.

use super::Path;
use crate::grid::{Grid, Tile, NEIGHBOR_OFFSETS};
use std::collections::{HashSet, VecDeque};

/// Shortest path by hop count, or an empty path when `goal` is unreachable
/// or equal to `start`.
///
/// Each frontier entry carries the path accumulated so far instead of a
/// parent pointer.
pub fn bfs(start: Tile, goal: Tile, grid: &Grid) -> Path {
    if start == goal {
        return Vec::new();
    }

    let mut queue: VecDeque<(Tile, Path)> = VecDeque::new();
    let mut visited: HashSet<Tile> = HashSet::new();
    queue.push_back((start, Vec::new()));
    visited.insert(start);

    while let Some((tile, path)) = queue.pop_front() {
        if tile == goal {
            return path;
        }

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let next = tile.offset(dx, dy);
            if grid.is_walkable_tile(next) && visited.insert(next) {
                let mut extended = Vec::with_capacity(path.len() + 1);
                extended.extend_from_slice(&path);
                extended.push(next);
                queue.push_back((next, extended));
            }
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_corridor() {
        let grid = Grid::from_rows(&["######", "#....#", "######"]);
        let path = bfs(Tile::new(1, 1), Tile::new(4, 1), &grid);
        assert_eq!(path, vec![Tile::new(2, 1), Tile::new(3, 1), Tile::new(4, 1)]);
    }

    #[test]
    fn test_start_equals_goal() {
        let grid = Grid::open(5, 5);
        assert!(bfs(Tile::new(2, 2), Tile::new(2, 2), &grid).is_empty());
    }

    #[test]
    fn test_goal_in_wall() {
        let grid = Grid::open(5, 5);
        assert!(bfs(Tile::new(1, 1), Tile::new(0, 0), &grid).is_empty());
    }

    #[test]
    fn test_detour_around_wall() {
        let grid = Grid::from_rows(&[
            "#######",
            "#.#...#",
            "#.#.#.#",
            "#...#.#",
            "#######",
        ]);
        let path = bfs(Tile::new(1, 1), Tile::new(5, 3), &grid);
        assert_eq!(path.len(), 10);
        assert_eq!(path.last(), Some(&Tile::new(5, 3)));
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1);
            assert!(grid.is_walkable_tile(pair[1]));
        }
    }

    #[test]
    fn test_path_is_contiguous_from_start() {
        let grid = Grid::open(8, 8);
        let start = Tile::new(1, 1);
        let path = bfs(start, Tile::new(6, 5), &grid);
        assert_eq!(path.len(), 9);
        assert_eq!(path[0].manhattan(start), 1);
    }
}
