//! Fixed timestep simulation tick
//!
//! One call advances a round by exactly one cell per rider.

use rand::Rng;

use super::collision::{self, CrashReport};
use super::grid::Side;
use super::search::DecisionEngine;
use super::state::{Outcome, RoundState};

/// What a tick produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Both riders survived; keep ticking
    Running,
    /// At least one rider crashed; the round is over
    RoundOver { outcome: Outcome, report: CrashReport },
}

/// Advance the round by one tick
///
/// Order is fixed: commit the human's latched heading, let the CPU decide,
/// lay both pre-move cells into the trails, move both heads, then judge
/// crashes against the updated trails.
pub fn tick<R: Rng + ?Sized>(
    round: &mut RoundState,
    engine: &mut DecisionEngine,
    rng: &mut R,
) -> TickOutcome {
    round.human.commit_heading();

    match engine.choose_heading(
        round.cpu.position,
        round.cpu.heading,
        round.human.position,
        &round.trails,
        rng,
    ) {
        Some(heading) => round.cpu.heading = heading,
        None => log::debug!("cpu trapped at {:?}, holding {:?}", round.cpu.position, round.cpu.heading),
    }

    debug_assert!(
        round.grid.in_bounds(round.human.position) && round.grid.in_bounds(round.cpu.position),
        "rider head outside the arena at tick {}",
        round.ticks
    );

    round.trails.mark(round.human.position, Side::Human);
    round.trails.mark(round.cpu.position, Side::Cpu);
    round.human.advance();
    round.cpu.advance();
    round.ticks += 1;

    let report = collision::evaluate(
        &round.grid,
        &round.trails,
        round.human.position,
        round.cpu.position,
    );

    match Outcome::from_crashes(report.human_crashed(), report.cpu_crashed()) {
        Some(outcome) => {
            log::debug!(
                "round over after {} ticks: {:?} (human {:?}, cpu {:?})",
                round.ticks,
                outcome,
                report.human,
                report.cpu
            );
            TickOutcome::RoundOver { outcome, report }
        }
        None => TickOutcome::Running,
    }
}
