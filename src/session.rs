//! Session controller: round lifecycle, score and level progression
//!
//! A session strings rounds together. It measures the host surface, starts
//! rounds at the right level and speed, feeds frame time into a fixed-step
//! accumulator, and books the result when a round ends. Hosts talk to the
//! game only through this type.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::render::FrameView;
use crate::settings::Settings;
use crate::sim::{
    DecisionEngine, Direction, GamePhase, Grid, Outcome, RoundState, SearchStats, TickOutcome, tick,
};
use crate::tick_interval_ms;

/// Rounds won by each side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub human: u32,
    pub cpu: u32,
}

impl Score {
    /// Book a finished round; draws change nothing
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::HumanWin => self.human += 1,
            Outcome::CpuWin => self.cpu += 1,
            Outcome::Draw => {}
        }
    }
}

/// One player's game: a sequence of rounds against the CPU
pub struct Session {
    settings: Settings,
    phase: GamePhase,
    score: Score,
    level: u32,
    speed: u32,
    /// Last measured surface size in pixels
    surface: (u32, u32),
    /// Resize received mid-round, applied when the round ends
    pending_surface: Option<(u32, u32)>,
    round: Option<RoundState>,
    last_outcome: Option<Outcome>,
    /// Frame time not yet consumed by ticks (ms)
    accumulator: f64,
    engine: DecisionEngine,
    rng: Pcg32,
    exited: bool,
}

impl Session {
    /// Create a session in the menu. `seed` only drives the CPU's tie-break
    /// shuffle; hosts pass something non-reproducible.
    ///
    /// Settings built in code skip `from_json`, so they are validated here too.
    pub fn new(settings: Settings, seed: u64) -> Result<Self> {
        settings.validate()?;
        let engine = DecisionEngine::with_config(settings.search_config());
        let speed = settings.base_speed;
        Ok(Self {
            settings,
            phase: GamePhase::Menu,
            score: Score::default(),
            level: 1,
            speed,
            surface: (0, 0),
            pending_surface: None,
            round: None,
            last_outcome: None,
            accumulator: 0.0,
            engine,
            rng: Pcg32::seed_from_u64(seed),
            exited: false,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Ticks per second of the current round
    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Counters from the CPU's most recent decision
    pub fn search_stats(&self) -> SearchStats {
        self.engine.stats()
    }

    /// Surface size the next round will be measured from, snapped down to
    /// whole cells
    ///
    /// Lags behind [`Session::resize`] while a round is running, so hosts can
    /// size their canvas from this once the round ends.
    pub fn surface_pixels(&self) -> (u32, u32) {
        let cell = self.settings.cell_size;
        let (w, h) = self.surface;
        (w / cell * cell, h / cell * cell)
    }

    /// True once the host has torn the session down with [`Session::on_exit`]
    pub fn is_exited(&self) -> bool {
        self.exited
    }

    /// Record the host surface size in pixels
    ///
    /// Takes effect at the next round start. During a round the size is held
    /// back until the round ends, so the arena never changes under the riders.
    /// Returns an error if the surface is too small for a grid, in which case
    /// the next start will refuse to run.
    pub fn resize(&mut self, pixel_width: u32, pixel_height: u32) -> Result<Grid> {
        let measured = Grid::from_surface(pixel_width, pixel_height, self.settings.cell_size);
        if self.phase == GamePhase::Playing {
            log::debug!("resize to {}x{} deferred until round ends", pixel_width, pixel_height);
            self.pending_surface = Some((pixel_width, pixel_height));
        } else {
            self.surface = (pixel_width, pixel_height);
        }
        measured
    }

    /// Begin a round
    ///
    /// `level_reset = true` returns to level 1 with a clean score.
    /// `level_reset = false` keeps the score and moves up a level if the
    /// human won the last round; after a loss or draw it replays the same level.
    pub fn start(&mut self, level_reset: bool) -> Result<()> {
        if self.phase == GamePhase::Playing {
            return Err(GameError::RoundInProgress);
        }
        let grid = self.measure()?;

        if level_reset {
            self.score = Score::default();
            self.level = 1;
        } else if self.last_outcome == Some(Outcome::HumanWin) {
            self.level += 1;
        }
        self.begin_round(grid);
        Ok(())
    }

    /// Replay the current level, keeping the score
    pub fn retry(&mut self) -> Result<()> {
        if self.phase == GamePhase::Playing {
            return Err(GameError::RoundInProgress);
        }
        let grid = self.measure()?;
        self.begin_round(grid);
        Ok(())
    }

    /// Latch a heading for the human rider; reversals and input outside a
    /// round are ignored
    pub fn on_direction_input(&mut self, dir: Direction) {
        if self.phase != GamePhase::Playing {
            return;
        }
        if let Some(round) = self.round.as_mut() {
            if !round.human.latch_heading(dir) {
                log::trace!("ignored reverse input {:?}", dir);
            }
        }
    }

    /// Tear the session down; nothing from the current round survives
    pub fn on_exit(&mut self) {
        log::info!(
            "session exit at level {} (score {}-{})",
            self.level,
            self.score.human,
            self.score.cpu
        );
        self.round = None;
        self.phase = GamePhase::Menu;
        self.score = Score::default();
        self.level = 1;
        self.speed = self.settings.base_speed;
        self.last_outcome = None;
        self.accumulator = 0.0;
        if let Some(surface) = self.pending_surface.take() {
            self.surface = surface;
        }
        self.exited = true;
    }

    /// Feed elapsed frame time and run however many ticks it pays for
    ///
    /// Each call credits at most `max_frame_ms`, so a long stall does not
    /// turn into a burst of catch-up ticks. Returns the outcome if a round
    /// ended during this frame; no tick runs after the crash.
    pub fn advance(&mut self, elapsed_ms: f64) -> Option<Outcome> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let round = self.round.as_mut()?;

        // f64::max drops NaN, so a bad timestamp credits nothing
        let elapsed = elapsed_ms.max(0.0).min(self.settings.max_frame_ms);
        self.accumulator += elapsed;

        let step = tick_interval_ms(round.speed);
        let mut finished = None;
        while self.accumulator >= step {
            self.accumulator -= step;
            if let TickOutcome::RoundOver { outcome, .. } = tick(round, &mut self.engine, &mut self.rng) {
                finished = Some(outcome);
                break;
            }
        }

        let outcome = finished?;
        self.finish_round(outcome);
        Some(outcome)
    }

    /// Milliseconds per tick at the current speed
    pub fn tick_interval_ms(&self) -> f64 {
        tick_interval_ms(self.speed)
    }

    /// Snapshot for the host to paint
    pub fn frame(&self) -> FrameView<'_> {
        FrameView {
            phase: self.phase,
            score: self.score,
            level: self.level,
            speed: self.speed,
            outcome: self.last_outcome,
            round: self.round.as_ref(),
        }
    }

    fn measure(&self) -> Result<Grid> {
        let (w, h) = self.surface;
        Grid::from_surface(w, h, self.settings.cell_size)
    }

    fn begin_round(&mut self, grid: Grid) {
        self.speed = self.settings.speed_for_level(self.level);
        self.round = Some(RoundState::new(grid, self.speed));
        self.phase = GamePhase::Playing;
        self.last_outcome = None;
        self.accumulator = 0.0;
        self.exited = false;
        log::info!(
            "round start: level {}, speed {}, grid {}x{}",
            self.level,
            self.speed,
            grid.width(),
            grid.height()
        );
    }

    fn finish_round(&mut self, outcome: Outcome) {
        self.phase = GamePhase::GameOver;
        self.last_outcome = Some(outcome);
        self.score.record(outcome);
        self.accumulator = 0.0;
        if let Some(surface) = self.pending_surface.take() {
            self.surface = surface;
        }
        log::info!(
            "round over: {:?} at level {} (score {}-{})",
            outcome,
            self.level,
            self.score.human,
            self.score.cpu
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Cycle, Side};
    use glam::IVec2;

    const STEP_MS: f64 = 50.0; // 1000 / base speed 20

    fn playing_session() -> Session {
        let mut session = Session::new(Settings::default(), 42).unwrap();
        session.resize(1000, 600).unwrap();
        session.start(true).unwrap();
        session
    }

    fn round_mut(session: &mut Session) -> &mut RoundState {
        session.round.as_mut().unwrap()
    }

    /// Box the CPU into the top-left corner so its next move crashes
    fn trap_cpu(session: &mut Session) {
        let round = round_mut(session);
        round.cpu = Cycle::new(Side::Cpu, IVec2::new(0, 0), Direction::Right);
        round.trails.mark(IVec2::new(1, 0), Side::Human);
        round.trails.mark(IVec2::new(0, 1), Side::Human);
    }

    /// Point the human straight at the right wall
    fn crash_human(session: &mut Session) {
        let round = round_mut(session);
        let width = round.grid.width();
        round.human = Cycle::new(Side::Human, IVec2::new(width - 1, 3), Direction::Right);
    }

    #[test]
    fn test_start_requires_surface() {
        let mut session = Session::new(Settings::default(), 1).unwrap();
        assert!(matches!(session.start(true), Err(GameError::InvalidGrid { .. })));
        assert_eq!(session.phase(), GamePhase::Menu);
        assert!(session.round().is_none());

        assert!(session.resize(5, 600).is_err());
        assert!(session.start(true).is_err());
        assert_eq!(session.phase(), GamePhase::Menu);
    }

    #[test]
    fn test_start_spawns_clean_round() {
        let session = playing_session();
        assert_eq!(session.phase(), GamePhase::Playing);
        let round = session.round().unwrap();
        assert_eq!((round.grid.width(), round.grid.height()), (100, 60));
        assert_eq!(round.human.position, IVec2::new(20, 30));
        assert_eq!(round.cpu.position, IVec2::new(80, 30));
        assert!(round.trails.is_empty());
        assert_eq!(session.speed(), 20);
        assert_eq!(session.level(), 1);
    }

    #[test]
    fn test_start_while_playing_rejected() {
        let mut session = playing_session();
        assert!(matches!(session.start(false), Err(GameError::RoundInProgress)));
        assert!(matches!(session.retry(), Err(GameError::RoundInProgress)));
    }

    #[test]
    fn test_accumulator_runs_fixed_ticks() {
        let mut session = playing_session();

        assert_eq!(session.advance(STEP_MS - 1.0), None);
        assert_eq!(session.round().unwrap().ticks, 0);

        assert_eq!(session.advance(1.0), None);
        assert_eq!(session.round().unwrap().ticks, 1);

        // One and a half steps: one tick, half a step carried over
        session.advance(STEP_MS * 1.5);
        assert_eq!(session.round().unwrap().ticks, 2);
        session.advance(STEP_MS * 0.5);
        assert_eq!(session.round().unwrap().ticks, 3);
    }

    #[test]
    fn test_frame_cap_drops_excess_time() {
        let mut session = playing_session();
        // 125ms is credited as 100ms: two ticks, nothing carried over
        session.advance(STEP_MS * 2.5);
        assert_eq!(session.round().unwrap().ticks, 2);
        session.advance(STEP_MS * 0.5);
        assert_eq!(session.round().unwrap().ticks, 2);
        session.advance(STEP_MS * 0.5);
        assert_eq!(session.round().unwrap().ticks, 3);
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        for max_frame_ms in [0.0, -1.0, f64::NAN] {
            let settings = Settings {
                max_frame_ms,
                ..Settings::default()
            };
            assert!(matches!(
                Session::new(settings, 7),
                Err(GameError::InvalidSettings(_))
            ));
        }
        let settings = Settings {
            cell_size: 0,
            ..Settings::default()
        };
        assert!(Session::new(settings, 7).is_err());
    }

    #[test]
    fn test_frame_time_capped_after_stall() {
        let mut session = playing_session();
        // A 10 second stall only credits max_frame_ms (100ms = 2 ticks)
        session.advance(10_000.0);
        assert_eq!(session.round().unwrap().ticks, 2);

        session.advance(-500.0);
        session.advance(f64::NAN);
        assert_eq!(session.round().unwrap().ticks, 2);
    }

    #[test]
    fn test_search_stats_follow_cpu_decisions() {
        let mut session = playing_session();
        assert_eq!(session.search_stats(), SearchStats::default());
        session.advance(STEP_MS);
        let stats = session.search_stats();
        assert!(stats.nodes > 0);
        assert!(stats.leaves > 0);
    }

    #[test]
    fn test_input_latched_until_tick() {
        let mut session = playing_session();
        session.on_direction_input(Direction::Up);
        assert_eq!(session.round().unwrap().human.heading, Direction::Right);

        session.advance(STEP_MS);
        let round = session.round().unwrap();
        assert_eq!(round.human.heading, Direction::Up);
        assert_eq!(round.human.position, IVec2::new(20, 29));
    }

    #[test]
    fn test_reverse_input_ignored() {
        let mut session = playing_session();
        session.on_direction_input(Direction::Left);
        session.advance(STEP_MS);
        let round = session.round().unwrap();
        assert_eq!(round.human.heading, Direction::Right);
        assert_eq!(round.human.position, IVec2::new(21, 30));
    }

    #[test]
    fn test_wall_crash_scores_for_cpu() {
        let mut session = playing_session();
        crash_human(&mut session);

        assert_eq!(session.advance(STEP_MS), Some(Outcome::CpuWin));
        assert_eq!(session.phase(), GamePhase::GameOver);
        assert_eq!(session.score(), Score { human: 0, cpu: 1 });

        // No more ticks once the round is over
        let ticks = session.round().unwrap().ticks;
        assert_eq!(session.advance(STEP_MS * 2.0), None);
        assert_eq!(session.round().unwrap().ticks, ticks);

        // Retrying after a loss stays on the same level and speed
        session.start(false).unwrap();
        assert_eq!(session.level(), 1);
        assert_eq!(session.speed(), 20);
        assert_eq!(session.score().cpu, 1);
    }

    #[test]
    fn test_level_progression_after_win() {
        let mut session = playing_session();
        trap_cpu(&mut session);

        assert_eq!(session.advance(STEP_MS), Some(Outcome::HumanWin));
        assert_eq!(session.score(), Score { human: 1, cpu: 0 });
        assert_eq!(session.level(), 1);
        assert_eq!(session.speed(), 20);

        session.start(false).unwrap();
        assert_eq!(session.level(), 2);
        assert_eq!(session.speed(), 25);
        assert_eq!(session.score().human, 1);
        assert!(session.round().unwrap().trails.is_empty());

        // Faster round means shorter ticks
        assert_eq!(session.tick_interval_ms(), 40.0);
    }

    #[test]
    fn test_head_to_head_draw_keeps_score() {
        let mut session = playing_session();
        {
            let round = round_mut(&mut session);
            round.human = Cycle::new(Side::Human, IVec2::new(4, 5), Direction::Right);
            round.cpu = Cycle::new(Side::Cpu, IVec2::new(6, 5), Direction::Left);
            round.trails.mark(IVec2::new(6, 4), Side::Cpu);
            round.trails.mark(IVec2::new(6, 6), Side::Cpu);
        }

        assert_eq!(session.advance(STEP_MS), Some(Outcome::Draw));
        assert_eq!(session.score(), Score::default());

        session.start(false).unwrap();
        assert_eq!(session.level(), 1);
    }

    #[test]
    fn test_level_reset_clears_progress() {
        let mut session = playing_session();
        trap_cpu(&mut session);
        session.advance(STEP_MS);
        session.start(false).unwrap();
        assert_eq!(session.level(), 2);

        crash_human(&mut session);
        session.advance(STEP_MS);
        session.start(true).unwrap();
        assert_eq!(session.level(), 1);
        assert_eq!(session.speed(), 20);
        assert_eq!(session.score(), Score::default());
    }

    #[test]
    fn test_resize_deferred_during_round() {
        let mut session = playing_session();
        session.resize(400, 300).unwrap();
        assert_eq!(session.round().unwrap().grid.width(), 100);

        assert_eq!(session.surface_pixels(), (1000, 600));

        crash_human(&mut session);
        session.advance(STEP_MS);
        // Applied as soon as the round ends, before any restart
        assert_eq!(session.surface_pixels(), (400, 300));
        session.retry().unwrap();
        let grid = session.round().unwrap().grid;
        assert_eq!((grid.width(), grid.height()), (40, 30));
    }

    #[test]
    fn test_surface_pixels_snap_to_cells() {
        let mut session = Session::new(Settings::default(), 3).unwrap();
        session.resize(1005, 607).unwrap();
        assert_eq!(session.surface_pixels(), (1000, 600));
    }

    #[test]
    fn test_exit_discards_round() {
        let mut session = playing_session();
        session.advance(STEP_MS * 2.0);
        session.on_exit();

        assert!(session.is_exited());
        assert!(session.round().is_none());
        assert_eq!(session.phase(), GamePhase::Menu);
        assert_eq!(session.advance(STEP_MS), None);

        // Input after exit is a no-op
        session.on_direction_input(Direction::Up);
        assert!(session.frame().round.is_none());

        session.start(true).unwrap();
        assert!(!session.is_exited());
        assert_eq!(session.round().unwrap().ticks, 0);
    }

    #[test]
    fn test_frame_reflects_session() {
        let mut session = playing_session();
        crash_human(&mut session);
        session.advance(STEP_MS);

        let frame = session.frame();
        assert_eq!(frame.phase, GamePhase::GameOver);
        assert_eq!(frame.outcome, Some(Outcome::CpuWin));
        assert_eq!(frame.score.cpu, 1);
        assert_eq!(frame.level, 1);
        assert!(frame.head(Side::Human).is_none());
        assert!(frame.head(Side::Cpu).is_some());
    }
}
