//! Grid model: cells, headings, bounds and trail occupancy
//!
//! The arena is a fixed `width x height` block of cells. Anything outside it
//! is wall. Inside, a cell is either free or owned by exactly one rider's trail.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::consts::{CPU_SPAWN_X, HUMAN_SPAWN_X};
use crate::error::{GameError, Result};

/// A grid coordinate (x grows right, y grows down)
pub type Cell = IVec2;

/// Compass heading of a rider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Enumeration order used by the search
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step for this heading
    #[inline]
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }

    #[inline]
    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    #[inline]
    pub fn is_reverse_of(self, other: Direction) -> bool {
        self.reverse() == other
    }

    /// Cell one step from `cell` along this heading
    #[inline]
    pub fn step(self, cell: Cell) -> Cell {
        cell + self.delta()
    }
}

/// Which rider a trail cell or crash belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Human,
    Cpu,
}

/// Arena bounds in whole cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
}

impl Grid {
    /// Create a grid, rejecting sizes where the two spawn points would coincide
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width < 2 || height < 1 {
            return Err(GameError::InvalidGrid { width, height });
        }
        Ok(Self { width, height })
    }

    /// Measure a pixel surface, snapping down to whole cells
    pub fn from_surface(pixel_width: u32, pixel_height: u32, cell_size: u32) -> Result<Self> {
        let cell_size = cell_size.max(1);
        let width = i32::try_from(pixel_width / cell_size).unwrap_or(i32::MAX);
        let height = i32::try_from(pixel_height / cell_size).unwrap_or(i32::MAX);
        Self::new(width, height)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of cells in the arena
    #[inline]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    /// Row-major index of an in-bounds cell
    #[inline]
    pub fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.y as usize * self.width as usize + cell.x as usize)
        } else {
            None
        }
    }

    /// Spawn cell and heading for a rider (riders start facing each other)
    pub fn spawn(&self, side: Side) -> (Cell, Direction) {
        let y = self.height / 2;
        match side {
            Side::Human => (
                IVec2::new((self.width as f32 * HUMAN_SPAWN_X) as i32, y),
                Direction::Right,
            ),
            Side::Cpu => (
                IVec2::new((self.width as f32 * CPU_SPAWN_X) as i32, y),
                Direction::Left,
            ),
        }
    }
}

/// Occupancy of every arena cell by rider trails
///
/// Heads are not stored here; only cells a rider has already left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailMap {
    grid: Grid,
    cells: Vec<Option<Side>>,
    len: usize,
}

impl TrailMap {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            cells: vec![None; grid.area()],
            len: 0,
        }
    }

    /// Build from two trails, human first
    pub fn from_trails(grid: Grid, human: &[Cell], cpu: &[Cell]) -> Self {
        let mut map = Self::new(grid);
        for &cell in human {
            map.mark(cell, Side::Human);
        }
        for &cell in cpu {
            map.mark(cell, Side::Cpu);
        }
        map
    }

    #[inline]
    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Number of occupied cells
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Trail owner of a cell; `None` for free or out-of-bounds cells
    #[inline]
    pub fn owner(&self, cell: Cell) -> Option<Side> {
        self.grid.index(cell).and_then(|i| self.cells[i])
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        self.owner(cell).is_some()
    }

    /// True for walls and trail cells
    #[inline]
    pub fn is_blocked(&self, cell: Cell) -> bool {
        match self.grid.index(cell) {
            Some(i) => self.cells[i].is_some(),
            None => true,
        }
    }

    /// Claim a free cell for `side`. Returns false if the cell was already
    /// taken or lies outside the arena; the map is unchanged in that case.
    pub fn mark(&mut self, cell: Cell, side: Side) -> bool {
        match self.grid.index(cell) {
            Some(i) if self.cells[i].is_none() => {
                self.cells[i] = Some(side);
                self.len += 1;
                true
            }
            _ => false,
        }
    }

    /// Release a cell. Only the search uses this, to undo its own marks.
    pub(crate) fn unmark(&mut self, cell: Cell) {
        if let Some(i) = self.grid.index(cell) {
            if self.cells[i].take().is_some() {
                self.len -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_pairs() {
        for dir in Direction::ALL {
            assert_eq!(dir.reverse().reverse(), dir);
            assert!(dir.is_reverse_of(dir.reverse()));
            assert!(!dir.is_reverse_of(dir));
            assert_eq!(dir.delta() + dir.reverse().delta(), IVec2::ZERO);
        }
    }

    #[test]
    fn test_degenerate_grids_rejected() {
        assert!(Grid::new(0, 10).is_err());
        assert!(Grid::new(10, 0).is_err());
        assert!(Grid::new(1, 10).is_err());
        assert!(Grid::new(2, 1).is_ok());
        // 9px surface with 10px cells snaps to zero columns
        assert!(matches!(
            Grid::from_surface(9, 600, 10),
            Err(GameError::InvalidGrid { width: 0, height: 60 })
        ));
    }

    #[test]
    fn test_from_surface_snaps_down() {
        let grid = Grid::from_surface(1005, 607, 10).unwrap();
        assert_eq!((grid.width(), grid.height()), (100, 60));
    }

    #[test]
    fn test_in_bounds_edges() {
        let grid = Grid::new(4, 3).unwrap();
        assert!(grid.in_bounds(IVec2::new(0, 0)));
        assert!(grid.in_bounds(IVec2::new(3, 2)));
        assert!(!grid.in_bounds(IVec2::new(4, 2)));
        assert!(!grid.in_bounds(IVec2::new(3, 3)));
        assert!(!grid.in_bounds(IVec2::new(-1, 0)));
        assert!(!grid.in_bounds(IVec2::new(0, -1)));
    }

    #[test]
    fn test_spawn_points_face_each_other() {
        let grid = Grid::new(100, 60).unwrap();
        let (human, human_dir) = grid.spawn(Side::Human);
        let (cpu, cpu_dir) = grid.spawn(Side::Cpu);
        assert_eq!(human, IVec2::new(20, 30));
        assert_eq!(cpu, IVec2::new(80, 30));
        assert_eq!(human_dir, Direction::Right);
        assert_eq!(cpu_dir, Direction::Left);

        let tiny = Grid::new(2, 1).unwrap();
        assert_ne!(tiny.spawn(Side::Human).0, tiny.spawn(Side::Cpu).0);
    }

    #[test]
    fn test_trail_map_mark_is_exclusive() {
        let grid = Grid::new(5, 5).unwrap();
        let mut map = TrailMap::new(grid);
        let cell = IVec2::new(2, 2);

        assert!(map.mark(cell, Side::Human));
        assert!(!map.mark(cell, Side::Cpu));
        assert_eq!(map.owner(cell), Some(Side::Human));
        assert_eq!(map.len(), 1);

        // Out of bounds is blocked but never stored
        assert!(!map.mark(IVec2::new(-1, 0), Side::Cpu));
        assert!(map.is_blocked(IVec2::new(-1, 0)));
        assert!(!map.contains(IVec2::new(-1, 0)));

        map.unmark(cell);
        assert!(map.is_empty());
        assert!(!map.is_blocked(cell));
    }
}
