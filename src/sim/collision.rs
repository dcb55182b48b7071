//! Crash detection for a single tick
//!
//! Both riders are judged against the same trail map, after both pre-move
//! cells have been added to it, so neither rider gets to move "first".

use serde::{Deserialize, Serialize};

use super::grid::{Cell, Grid, Side, TrailMap};

/// Why a rider crashed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrashCause {
    /// Left the arena
    Wall,
    /// Ran into its own trail
    OwnTrail,
    /// Ran into the opponent's trail
    OpponentTrail,
    /// Both heads entered the same cell
    HeadOn,
}

/// Result of a collision check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrashReport {
    pub human: Option<CrashCause>,
    pub cpu: Option<CrashCause>,
}

impl CrashReport {
    #[inline]
    pub fn human_crashed(&self) -> bool {
        self.human.is_some()
    }

    #[inline]
    pub fn cpu_crashed(&self) -> bool {
        self.cpu.is_some()
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.human_crashed() || self.cpu_crashed()
    }

    pub fn get(&self, side: Side) -> Option<CrashCause> {
        match side {
            Side::Human => self.human,
            Side::Cpu => self.cpu,
        }
    }
}

/// Check one rider's next cell against walls and trails
pub fn rider_crash(grid: &Grid, trails: &TrailMap, side: Side, next: Cell) -> Option<CrashCause> {
    if !grid.in_bounds(next) {
        return Some(CrashCause::Wall);
    }
    match trails.owner(next) {
        Some(owner) if owner == side => Some(CrashCause::OwnTrail),
        Some(_) => Some(CrashCause::OpponentTrail),
        None => None,
    }
}

/// Evaluate both riders' next cells
///
/// `trails` must already contain both riders' pre-move cells. A shared next
/// cell crashes both riders regardless of any other cause.
pub fn evaluate(grid: &Grid, trails: &TrailMap, human_next: Cell, cpu_next: Cell) -> CrashReport {
    if human_next == cpu_next {
        return CrashReport {
            human: Some(CrashCause::HeadOn),
            cpu: Some(CrashCause::HeadOn),
        };
    }

    CrashReport {
        human: rider_crash(grid, trails, Side::Human, human_next),
        cpu: rider_crash(grid, trails, Side::Cpu, cpu_next),
    }
}
