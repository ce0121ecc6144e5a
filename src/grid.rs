//! Grid model: tiles, directions and the walkability map.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Neighbour expansion order shared by the path searches
pub const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// One grid cell address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    /// Sentinel reported by the position feed for an eliminated target
    pub const REMOVED: Tile = Tile { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance
    #[inline]
    pub fn manhattan(self, other: Tile) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Tile {
        Tile::new(self.x + dx, self.y + dy)
    }

    /// Neighbouring tile one step in `direction`
    #[inline]
    pub fn step(self, direction: Direction) -> Tile {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    #[inline]
    pub fn is_removed(self) -> bool {
        self == Tile::REMOVED
    }

    /// The four orthogonal neighbours in [`NEIGHBOR_OFFSETS`] order
    pub fn neighbors(self) -> [Tile; 4] {
        NEIGHBOR_OFFSETS.map(|(dx, dy)| self.offset(dx, dy))
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Tile {
    fn from((x, y): (i32, i32)) -> Self {
        Tile::new(x, y)
    }
}

/// Move direction; also the gene alphabet of the genetic search
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit offset; y grows downward
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Uniformly random direction
    pub fn random(rng: &mut impl Rng) -> Direction {
        Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
    }

    /// Direction of a unit step between two adjacent tiles
    pub fn between(from: Tile, to: Tile) -> Option<Direction> {
        match (to.x - from.x, to.y - from.y) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Cell state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Open,
    Wall,
}

/// Rectangular walkability map.
///
/// A grid is never mutated while a tick's searches run; a regenerated maze
/// arrives as a new instance. The only in-place change is [`Grid::open_cell`],
/// used when the gate breaks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    /// cells[y * width + x]
    cells: Vec<Cell>,
    /// Tile that pursuer agents may always pass through
    gate: Option<Tile>,
}

impl Grid {
    /// Grid of the given size filled with walls
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Wall; width * height],
            gate: None,
        }
    }

    /// Open field surrounded by a one-tile wall border
    pub fn open(width: usize, height: usize) -> Self {
        let mut grid = Self::new(width, height);
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                grid.set_cell(Tile::new(x as i32, y as i32), Cell::Open);
            }
        }
        grid
    }

    /// Parse text rows: `#` wall, `G` gate (a wall pursuers may cross),
    /// anything else open. Short rows are padded with walls.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new(width, height);

        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = Tile::new(x as i32, y as i32);
                match ch {
                    '#' => {}
                    'G' => grid.gate = Some(tile),
                    _ => grid.set_cell(tile, Cell::Open),
                }
            }
        }

        grid
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    /// Cell at a coordinate; `None` when out of bounds
    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Set a cell; out-of-bounds writes are ignored
    pub fn set_cell(&mut self, tile: Tile, cell: Cell) {
        if let Some(i) = self.index(tile.x, tile.y) {
            self.cells[i] = cell;
        }
    }

    /// Make a cell permanently walkable
    pub fn open_cell(&mut self, tile: Tile) {
        self.set_cell(tile, Cell::Open);
    }

    /// False for out-of-bounds and wall cells
    #[inline]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        matches!(self.cell(x, y), Some(Cell::Open))
    }

    #[inline]
    pub fn is_walkable_tile(&self, tile: Tile) -> bool {
        self.is_walkable(tile.x, tile.y)
    }

    /// Walkability as seen by pursuer agents: the gate tile is always passable
    #[inline]
    pub fn is_passable_for_agent(&self, x: i32, y: i32) -> bool {
        if self.gate == Some(Tile::new(x, y)) && self.in_bounds(x, y) {
            return true;
        }
        self.is_walkable(x, y)
    }

    #[inline]
    pub fn is_passable_tile(&self, tile: Tile) -> bool {
        self.is_passable_for_agent(tile.x, tile.y)
    }

    pub fn gate(&self) -> Option<Tile> {
        self.gate
    }

    pub fn set_gate(&mut self, gate: Option<Tile>) {
        self.gate = gate;
    }

    /// Walkable 4-connected neighbours in [`NEIGHBOR_OFFSETS`] order
    pub fn neighbors(&self, tile: Tile) -> impl Iterator<Item = Tile> + '_ {
        tile.neighbors().into_iter().filter(|n| self.is_walkable_tile(*n))
    }

    /// Number of walkable neighbours (available moves)
    pub fn move_count(&self, tile: Tile) -> usize {
        self.neighbors(tile).count()
    }

    /// The four corner tiles
    pub fn corners(&self) -> [Tile; 4] {
        let w = self.width as i32 - 1;
        let h = self.height as i32 - 1;
        [Tile::new(0, 0), Tile::new(0, h), Tile::new(w, 0), Tile::new(w, h)]
    }

    /// All walkable tiles in row-major order
    pub fn walkable_tiles(&self) -> Vec<Tile> {
        (0..self.height as i32)
            .flat_map(|y| (0..self.width as i32).map(move |x| Tile::new(x, y)))
            .filter(|t| self.is_walkable_tile(*t))
            .collect()
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Open).count()
    }

    /// Nearest walkable tile by breadth-first scan from `from`.
    ///
    /// The scan crosses walls, so it works from inside a wall block. An
    /// out-of-bounds origin is clamped onto the grid first. Returns `None`
    /// only when the grid has no walkable cell.
    pub fn nearest_walkable(&self, from: Tile) -> Option<Tile> {
        if self.width == 0 || self.height == 0 {
            return None;
        }

        let start = Tile::new(
            from.x.clamp(0, self.width as i32 - 1),
            from.y.clamp(0, self.height as i32 - 1),
        );

        let mut visited = vec![false; self.cells.len()];
        let mut queue = VecDeque::new();
        if let Some(i) = self.index(start.x, start.y) {
            visited[i] = true;
        }
        queue.push_back(start);

        while let Some(tile) = queue.pop_front() {
            if self.is_walkable_tile(tile) {
                return Some(tile);
            }
            for next in tile.neighbors() {
                if let Some(i) = self.index(next.x, next.y) {
                    if !visited[i] {
                        visited[i] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        None
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let ch = if self.gate == Some(Tile::new(x, y)) && !self.is_walkable(x, y) {
                    'G'
                } else if self.is_walkable(x, y) {
                    '.'
                } else {
                    '#'
                };
                write!(f, "{}", ch)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_grid_border() {
        let grid = Grid::open(5, 4);
        assert!(!grid.is_walkable(0, 0));
        assert!(!grid.is_walkable(4, 3));
        assert!(grid.is_walkable(1, 1));
        assert!(grid.is_walkable(3, 2));
        assert_eq!(grid.walkable_count(), 3 * 2);
    }

    #[test]
    fn test_out_of_bounds_not_walkable() {
        let grid = Grid::open(5, 5);
        assert!(!grid.is_walkable(-1, 2));
        assert!(!grid.is_walkable(2, 5));
        assert_eq!(grid.cell(7, 7), None);
    }

    #[test]
    fn test_gate_passable_for_agents_only() {
        let grid = Grid::from_rows(&["#####", "#.G.#", "#####"]);
        assert_eq!(grid.gate(), Some(Tile::new(2, 1)));
        assert!(!grid.is_walkable(2, 1));
        assert!(grid.is_passable_for_agent(2, 1));
        assert!(grid.is_passable_for_agent(1, 1));
        assert!(!grid.is_passable_for_agent(0, 1));
    }

    #[test]
    fn test_open_cell() {
        let mut grid = Grid::from_rows(&["###", "#G#", "###"]);
        grid.open_cell(Tile::new(1, 1));
        assert!(grid.is_walkable(1, 1));
    }

    #[test]
    fn test_neighbors_skip_walls() {
        let grid = Grid::from_rows(&["#####", "#..##", "#.#.#", "#####"]);
        let n: Vec<_> = grid.neighbors(Tile::new(1, 1)).collect();
        assert_eq!(n, vec![Tile::new(1, 2), Tile::new(2, 1)]);
        assert_eq!(grid.move_count(Tile::new(3, 2)), 0);
    }

    #[test]
    fn test_nearest_walkable_from_wall() {
        let grid = Grid::from_rows(&["#####", "###.#", "#####"]);
        assert_eq!(grid.nearest_walkable(Tile::new(1, 1)), Some(Tile::new(3, 1)));
        assert_eq!(grid.nearest_walkable(Tile::new(3, 1)), Some(Tile::new(3, 1)));
    }

    #[test]
    fn test_nearest_walkable_out_of_bounds() {
        let grid = Grid::open(6, 6);
        let found = grid.nearest_walkable(Tile::new(-4, 20)).unwrap();
        assert!(grid.is_walkable_tile(found));
        assert_eq!(found, Tile::new(1, 4));
    }

    #[test]
    fn test_nearest_walkable_none() {
        let grid = Grid::new(4, 4);
        assert_eq!(grid.nearest_walkable(Tile::new(1, 1)), None);
    }

    #[test]
    fn test_display_roundtrip() {
        let rows = ["#####", "#.G.#", "#####"];
        let grid = Grid::from_rows(&rows);
        assert_eq!(grid.to_string(), "#####\n#.G.#\n#####\n");
    }

    #[test]
    fn test_direction_between() {
        let a = Tile::new(3, 3);
        for dir in Direction::ALL {
            assert_eq!(Direction::between(a, a.step(dir)), Some(dir));
            assert_eq!(a.step(dir).step(dir.opposite()), a);
        }
        assert_eq!(Direction::between(a, Tile::new(5, 3)), None);
    }
}
