//! Breakable cage gate.

use crate::grid::{Grid, Tile};

/// Result of one hit on the gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateHit {
    /// Counted, gate still standing
    Absorbed,
    /// This hit reached the threshold; the gate cell is now open
    Broken,
    /// The gate was already broken, nothing changed
    AlreadyBroken,
}

/// Gate state: a hit counter, the broken flag and the number of agents that
/// have passed through it
#[derive(Clone, Debug)]
pub struct Gate {
    tile: Tile,
    hits: u32,
    threshold: u32,
    broken: bool,
    escaped: u32,
}

impl Gate {
    pub fn new(tile: Tile, threshold: u32) -> Self {
        Self {
            tile,
            hits: 0,
            threshold: threshold.max(1),
            broken: false,
            escaped: 0,
        }
    }

    pub fn tile(&self) -> Tile {
        self.tile
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn escaped_count(&self) -> u32 {
        self.escaped
    }

    /// Register a hit. Reaching the threshold breaks the gate and opens its
    /// cell in `grid`.
    pub fn hit(&mut self, grid: &mut Grid) -> GateHit {
        if self.broken {
            return GateHit::AlreadyBroken;
        }

        self.hits += 1;
        if self.hits < self.threshold {
            log::debug!("Gate at {} hit ({}/{})", self.tile, self.hits, self.threshold);
            return GateHit::Absorbed;
        }

        self.broken = true;
        grid.open_cell(self.tile);
        log::info!("Gate at {} broken after {} hits", self.tile, self.hits);
        GateHit::Broken
    }

    pub fn record_escape(&mut self) {
        self.escaped += 1;
    }

    /// Restore the gate on a fresh maze: new tile, counters cleared
    pub fn rebuild(&mut self, tile: Tile) {
        self.tile = tile;
        self.hits = 0;
        self.broken = false;
        self.escaped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caged_grid() -> Grid {
        Grid::from_rows(&["#####", "#...#", "##G##", "#...#", "#####"])
    }

    #[test]
    fn test_two_hits_break() {
        let mut grid = caged_grid();
        let tile = Tile::new(2, 2);
        let mut gate = Gate::new(tile, 2);

        assert!(!grid.is_walkable_tile(tile));
        assert_eq!(gate.hit(&mut grid), GateHit::Absorbed);
        assert!(!gate.is_broken());
        assert_eq!(gate.hit(&mut grid), GateHit::Broken);
        assert!(gate.is_broken());
        assert!(grid.is_walkable_tile(tile));
    }

    #[test]
    fn test_hits_after_break_ignored() {
        let mut grid = caged_grid();
        let mut gate = Gate::new(Tile::new(2, 2), 1);
        assert_eq!(gate.hit(&mut grid), GateHit::Broken);
        assert_eq!(gate.hit(&mut grid), GateHit::AlreadyBroken);
        assert_eq!(gate.hits(), 1);
    }

    #[test]
    fn test_rebuild_resets() {
        let mut grid = caged_grid();
        let mut gate = Gate::new(Tile::new(2, 2), 1);
        gate.hit(&mut grid);
        gate.record_escape();
        gate.rebuild(Tile::new(3, 3));
        assert!(!gate.is_broken());
        assert_eq!(gate.escaped_count(), 0);
        assert_eq!(gate.tile(), Tile::new(3, 3));
    }
}
