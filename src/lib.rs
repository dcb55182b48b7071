//! Light Cycles - A two-rider grid arena with a look-ahead CPU opponent
//!
//! Core modules:
//! - `sim`: Simulation core (grid, riders, collisions, CPU search, tick)
//! - `session`: Round lifecycle, score and level progression, frame pacing
//! - `render`: Surface contract the hosts paint through
//! - `settings`: Tunable constants with JSON loading

pub mod error;
pub mod render;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::{GameError, Result};
pub use session::{Score, Session};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Pixel size of one grid cell on the render surface
    pub const CELL_SIZE: u32 = 10;

    /// Starting speed in ticks per second
    pub const BASE_SPEED: u32 = 20;
    /// Speed gained per completed level
    pub const SPEED_INCREMENT: u32 = 5;

    /// Largest elapsed-time contribution of a single frame (ms)
    pub const MAX_FRAME_MS: f64 = 100.0;

    /// Minimax plies searched per CPU decision
    pub const SEARCH_DEPTH: u32 = 5;
    /// Cell budget of the reachable-space flood fill at search leaves
    pub const HEURISTIC_DEPTH: usize = 30;
    /// Bonus for keeping the current heading (suppresses zig-zagging)
    pub const CONTINUITY_BONUS: f64 = 0.5;
    /// Score of a branch where one rider has no legal move
    pub const TRAPPED_SCORE: i32 = 1000;

    /// Spawn offsets as fractions of grid width
    pub const HUMAN_SPAWN_X: f32 = 0.2;
    pub const CPU_SPAWN_X: f32 = 0.8;
}

/// Milliseconds per tick at the given speed (ticks per second)
#[inline]
pub fn tick_interval_ms(speed: u32) -> f64 {
    1000.0 / speed.max(1) as f64
}

/// Speed for a level given base speed and per-level increment
#[inline]
pub fn speed_for_level(level: u32, base: u32, increment: u32) -> u32 {
    base + increment * level.saturating_sub(1)
}
