//! Render contract between the session and a host surface
//!
//! The core never draws pixels itself. Hosts implement [`Surface`] for
//! whatever they paint on (a terminal, a 2D canvas) and call [`paint`] with
//! the session's current [`FrameView`]. Colors and glow are the host's call.

use crate::session::Score;
use crate::sim::{Cell, GamePhase, Grid, Outcome, RoundState, Side};

/// What occupies a painted cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    HumanTrail,
    CpuTrail,
    HumanHead,
    CpuHead,
}

impl CellKind {
    pub fn trail(side: Side) -> Self {
        match side {
            Side::Human => CellKind::HumanTrail,
            Side::Cpu => CellKind::CpuTrail,
        }
    }

    pub fn head(side: Side) -> Self {
        match side {
            Side::Human => CellKind::HumanHead,
            Side::Cpu => CellKind::CpuHead,
        }
    }
}

/// Read-only snapshot of everything a host needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub phase: GamePhase,
    pub score: Score,
    pub level: u32,
    /// Ticks per second of the current (or next) round
    pub speed: u32,
    /// Result of the round that just ended, while in `GameOver`
    pub outcome: Option<Outcome>,
    /// Board of the current or just-finished round
    pub round: Option<&'a RoundState>,
}

impl FrameView<'_> {
    pub fn grid(&self) -> Option<Grid> {
        self.round.map(|r| r.grid)
    }

    /// Head position of a rider, if it is inside the arena
    pub fn head(&self, side: Side) -> Option<Cell> {
        let round = self.round?;
        let pos = round.cycle(side).position;
        round.grid.in_bounds(pos).then_some(pos)
    }

    pub fn trail(&self, side: Side) -> &[Cell] {
        match self.round {
            Some(round) => &round.cycle(side).trail,
            None => &[],
        }
    }
}

/// A paintable target measured in whole cells
pub trait Surface {
    type Error;

    /// Wipe the board area before a frame
    fn clear(&mut self, grid: Grid) -> Result<(), Self::Error>;

    /// Paint a single cell
    fn fill_cell(&mut self, cell: Cell, kind: CellKind) -> Result<(), Self::Error>;

    /// Draw score, level and phase overlays
    fn hud(&mut self, _frame: &FrameView<'_>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Flush the finished frame
    fn present(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Paint a frame: trails first, then heads on top, then the HUD
pub fn paint<S: Surface + ?Sized>(frame: &FrameView<'_>, surface: &mut S) -> Result<(), S::Error> {
    if let Some(grid) = frame.grid() {
        surface.clear(grid)?;
        for side in [Side::Human, Side::Cpu] {
            for &cell in frame.trail(side) {
                surface.fill_cell(cell, CellKind::trail(side))?;
            }
        }
        // Heads that crashed into the wall sit outside the arena
        for side in [Side::Human, Side::Cpu] {
            if let Some(cell) = frame.head(side) {
                surface.fill_cell(cell, CellKind::head(side))?;
            }
        }
    }
    surface.hud(frame)?;
    surface.present()
}
