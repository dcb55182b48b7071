//! Simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Randomness injected by the caller
//! - No rendering or platform dependencies

pub mod collision;
pub mod grid;
pub mod reach;
pub mod search;
pub mod state;
pub mod tick;

pub use collision::{CrashCause, CrashReport, evaluate};
pub use grid::{Cell, Direction, Grid, Side, TrailMap};
pub use reach::{FloodScratch, count_reachable};
pub use search::{BranchEval, DecisionEngine, SearchConfig, SearchStats};
pub use state::{Cycle, GamePhase, Outcome, RoundState};
pub use tick::{TickOutcome, tick};
