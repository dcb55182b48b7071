//! Reachable-space heuristic
//!
//! Bounded breadth-first flood fill from a cell. The budget caps the work per
//! call, so in open areas the count underestimates the true free space. The
//! search only compares two counts against each other, which tolerates that.

use std::collections::VecDeque;

use super::grid::{Cell, Direction, TrailMap};

/// Reusable buffers for repeated flood fills over the same grid
///
/// `seen` holds a generation stamp per cell so it never needs clearing
/// between calls.
#[derive(Debug, Default, Clone)]
pub struct FloodScratch {
    queue: VecDeque<Cell>,
    seen: Vec<u32>,
    generation: u32,
}

impl FloodScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count cells reachable from `start`, stopping once `max_depth` cells
    /// have been counted. `start` itself is always counted first.
    pub fn count_reachable(&mut self, start: Cell, obstacles: &TrailMap, max_depth: usize) -> usize {
        if max_depth == 0 {
            return 0;
        }

        let grid = obstacles.grid();
        if self.seen.len() != grid.area() {
            self.seen = vec![0; grid.area()];
            self.generation = 0;
        }
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.seen.fill(0);
            self.generation = 1;
        }
        let generation = self.generation;

        self.queue.clear();
        self.queue.push_back(start);
        if let Some(i) = grid.index(start) {
            self.seen[i] = generation;
        }

        let mut count = 0;
        while count < max_depth {
            let Some(current) = self.queue.pop_front() else {
                break;
            };
            count += 1;

            for dir in [Direction::Right, Direction::Left, Direction::Down, Direction::Up] {
                let next = dir.step(current);
                if obstacles.is_blocked(next) {
                    continue;
                }
                // is_blocked covers out-of-bounds, so the index exists
                let Some(i) = grid.index(next) else {
                    continue;
                };
                if self.seen[i] != generation {
                    self.seen[i] = generation;
                    self.queue.push_back(next);
                }
            }
        }
        count
    }
}

/// One-shot flood fill; allocates its own scratch buffers
pub fn count_reachable(start: Cell, obstacles: &TrailMap, max_depth: usize) -> usize {
    FloodScratch::new().count_reachable(start, obstacles, max_depth)
}
