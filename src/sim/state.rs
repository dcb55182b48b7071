//! Round state and core simulation types
//!
//! Everything a round needs lives in `RoundState`; the tick function is the
//! only thing that mutates it.

use serde::{Deserialize, Serialize};

use super::grid::{Cell, Direction, Grid, Side, TrailMap};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for an explicit start
    #[default]
    Menu,
    /// Active round
    Playing,
    /// Round ended by a crash
    GameOver,
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    HumanWin,
    CpuWin,
    Draw,
}

impl Outcome {
    /// Decide the winner from the two crash flags; `None` if nobody crashed
    pub fn from_crashes(human_crashed: bool, cpu_crashed: bool) -> Option<Self> {
        match (human_crashed, cpu_crashed) {
            (true, true) => Some(Outcome::Draw),
            (true, false) => Some(Outcome::CpuWin),
            (false, true) => Some(Outcome::HumanWin),
            (false, false) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::HumanWin => "VICTORY",
            Outcome::CpuWin => "DEREZZED",
            Outcome::Draw => "DRAW",
        }
    }
}

/// A light cycle: head position, heading and the trail left behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub side: Side,
    pub position: Cell,
    pub heading: Direction,
    /// Heading latched from input, committed at the next tick boundary
    pub pending_heading: Direction,
    /// Every cell the head has left, oldest first
    pub trail: Vec<Cell>,
}

impl Cycle {
    pub fn new(side: Side, position: Cell, heading: Direction) -> Self {
        Self {
            side,
            position,
            heading,
            pending_heading: heading,
            trail: Vec::new(),
        }
    }

    /// Spawn at the grid's starting cell for `side`
    pub fn spawn(grid: &Grid, side: Side) -> Self {
        let (position, heading) = grid.spawn(side);
        Self::new(side, position, heading)
    }

    /// Latch a requested heading. Reversals of the current heading are
    /// dropped; returns whether the request was accepted.
    pub fn latch_heading(&mut self, dir: Direction) -> bool {
        if dir.is_reverse_of(self.heading) {
            return false;
        }
        self.pending_heading = dir;
        true
    }

    /// Apply the latched heading
    pub fn commit_heading(&mut self) {
        if !self.pending_heading.is_reverse_of(self.heading) {
            self.heading = self.pending_heading;
        }
    }

    /// Cell the head would enter this tick
    #[inline]
    pub fn next_position(&self) -> Cell {
        self.heading.step(self.position)
    }

    /// Leave the current cell behind and step forward
    pub fn advance(&mut self) {
        self.trail.push(self.position);
        self.position = self.next_position();
    }
}

/// One round: spawn to first crash
#[derive(Debug, Clone)]
pub struct RoundState {
    pub grid: Grid,
    pub human: Cycle,
    pub cpu: Cycle,
    /// Union of both trails, tagged by owner
    pub trails: TrailMap,
    /// Ticks simulated so far
    pub ticks: u64,
    /// Ticks per second for this round
    pub speed: u32,
}

impl RoundState {
    /// Fresh round with both riders at their spawn points and empty trails
    pub fn new(grid: Grid, speed: u32) -> Self {
        Self {
            grid,
            human: Cycle::spawn(&grid, Side::Human),
            cpu: Cycle::spawn(&grid, Side::Cpu),
            trails: TrailMap::new(grid),
            ticks: 0,
            speed,
        }
    }

    pub fn cycle(&self, side: Side) -> &Cycle {
        match side {
            Side::Human => &self.human,
            Side::Cpu => &self.cpu,
        }
    }
}
