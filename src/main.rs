//! Light Cycles entry point
//!
//! Handles platform-specific initialization and runs the frame loop. Native
//! builds play in the terminal; wasm builds paint onto a `<canvas id="canvas">`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent};

    use light_cycles::render::{self, CellKind, FrameView, Surface};
    use light_cycles::sim::{Cell, Direction, GamePhase, Grid, Outcome};
    use light_cycles::{Session, Settings};

    /// Canvas 2D paint target
    struct CanvasSurface {
        ctx: CanvasRenderingContext2d,
        cell_size: f64,
        width: f64,
        height: f64,
    }

    impl Surface for CanvasSurface {
        type Error = JsValue;

        fn clear(&mut self, _grid: Grid) -> Result<(), JsValue> {
            self.ctx.set_fill_style_str("#000");
            self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
            Ok(())
        }

        fn fill_cell(&mut self, cell: Cell, kind: CellKind) -> Result<(), JsValue> {
            let color = match kind {
                CellKind::HumanTrail => "#0ff",
                CellKind::CpuTrail => "#f0f",
                CellKind::HumanHead | CellKind::CpuHead => "#fff",
            };
            self.ctx.set_fill_style_str(color);
            self.ctx.fill_rect(
                cell.x as f64 * self.cell_size,
                cell.y as f64 * self.cell_size,
                self.cell_size,
                self.cell_size,
            );
            Ok(())
        }

        fn hud(&mut self, frame: &FrameView<'_>) -> Result<(), JsValue> {
            self.ctx.set_fill_style_str("#fff");
            self.ctx.set_font("16px monospace");
            let line = format!(
                "PLAYER {}   LEVEL {}   CPU {}",
                frame.score.human, frame.level, frame.score.cpu
            );
            self.ctx.fill_text(&line, 12.0, 20.0)?;

            let banner = match (frame.phase, frame.outcome) {
                (GamePhase::Menu, _) => Some("TRON - press ENTER to start".to_string()),
                (GamePhase::GameOver, Some(Outcome::HumanWin)) => {
                    Some("VICTORY - ENTER for next level".to_string())
                }
                (GamePhase::GameOver, Some(outcome)) => {
                    Some(format!("{} - ENTER to retry", outcome.label()))
                }
                _ => None,
            };
            if let Some(banner) = banner {
                self.ctx.fill_text(&banner, 12.0, self.height / 2.0)?;
            }
            Ok(())
        }
    }

    /// Game instance holding all state
    struct Game {
        session: Session,
        canvas: HtmlCanvasElement,
        surface: CanvasSurface,
        last_time: f64,
    }

    impl Game {
        /// Snap the canvas to whole cells inside its parent and remeasure
        fn fit_canvas(&mut self) {
            let cell = self.session.settings().cell_size;
            let (w, h) = match self.canvas.parent_element() {
                Some(parent) => (parent.client_width().max(0) as u32, parent.client_height().max(0) as u32),
                None => (self.canvas.width(), self.canvas.height()),
            };
            if let Err(e) = self.session.resize(w / cell * cell, h / cell * cell) {
                log::warn!("Canvas too small: {}", e);
            }
            self.sync_canvas();
        }

        /// Match the canvas to the size the session measures rounds from.
        /// Held back mid-round along with the session's own resize.
        fn sync_canvas(&mut self) {
            if self.session.phase() == GamePhase::Playing {
                return;
            }
            let (w, h) = self.session.surface_pixels();
            if self.canvas.width() != w || self.canvas.height() != h {
                self.canvas.set_width(w);
                self.canvas.set_height(h);
            }
            self.surface.width = w as f64;
            self.surface.height = h as f64;
        }

        fn confirm(&mut self) {
            let result = match (self.session.phase(), self.session.last_outcome()) {
                (GamePhase::Menu, _) => self.session.start(true),
                (GamePhase::GameOver, Some(Outcome::HumanWin)) => self.session.start(false),
                (GamePhase::GameOver, _) => self.session.retry(),
                (GamePhase::Playing, _) => Ok(()),
            };
            if let Err(e) = result {
                log::warn!("Cannot start round: {}", e);
            }
        }

        fn frame(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 { time - self.last_time } else { 0.0 };
            self.last_time = time;

            if let Some(outcome) = self.session.advance(dt) {
                log::info!("Round finished: {:?}", outcome);
                self.sync_canvas();
            }
            if let Err(e) = render::paint(&self.session.frame(), &mut self.surface) {
                log::warn!("Render error: {:?}", e);
            }
        }
    }

    fn direction_for_key(key: &str) -> Option<Direction> {
        match key {
            "ArrowUp" => Some(Direction::Up),
            "ArrowDown" => Some(Direction::Down),
            "ArrowLeft" => Some(Direction::Left),
            "ArrowRight" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");
        log::info!("Light Cycles starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas element")
            .dyn_into()
            .expect("element is not a canvas");
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        log::info!("Game initialized with seed: {}", seed);

        let surface = CanvasSurface {
            ctx,
            cell_size: settings.cell_size as f64,
            width: canvas.width() as f64,
            height: canvas.height() as f64,
        };
        let session = match Session::new(settings, seed) {
            Ok(session) => session,
            Err(e) => {
                log::error!("Cannot create session: {}", e);
                return;
            }
        };
        let game = Rc::new(RefCell::new(Game {
            session,
            canvas,
            surface,
            last_time: 0.0,
        }));
        game.borrow_mut().fit_canvas();

        setup_input(game.clone());
        setup_resize(game.clone());
        request_animation_frame(game);
        log::info!("Light Cycles running!");
    }

    fn setup_input(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let mut g = game.borrow_mut();
            if g.session.is_exited() {
                return;
            }
            let key = event.key();
            if let Some(dir) = direction_for_key(&key) {
                event.prevent_default();
                g.session.on_direction_input(dir);
                return;
            }
            match key.as_str() {
                "Enter" | " " => g.confirm(),
                "Escape" => g.session.on_exit(),
                _ => {}
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_resize(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            game.borrow_mut().fit_canvas();
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            if g.session.is_exited() {
                log::info!("Light Cycles exited");
                return;
            }
            g.frame(time);
        }

        request_animation_frame(game);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native_game {
    use std::fs::File;
    use std::io::{self, Stdout, Write};
    use std::path::PathBuf;
    use std::thread;
    use std::time::{Duration, Instant};

    use crossterm::cursor::{Hide, MoveTo, Show};
    use crossterm::event::{self, Event, KeyCode, KeyEventKind};
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
    use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
    use crossterm::{ExecutableCommand, QueueableCommand};
    use rand::Rng;

    use light_cycles::render::{self, CellKind, FrameView, Surface};
    use light_cycles::sim::{Cell, Direction, GamePhase, Grid, Outcome};
    use light_cycles::{Session, Settings};

    /// Terminal columns per grid cell
    const CELL_W: u16 = 2;
    /// Rows reserved above the arena for the HUD
    const HUD_ROWS: u16 = 2;
    const FRAME_TIME: Duration = Duration::from_millis(16);

    /// Double-buffered terminal surface; only changed cells are redrawn
    struct TerminalSurface<'a> {
        out: &'a mut Stdout,
        grid: Option<Grid>,
        current: Vec<Option<CellKind>>,
        last: Vec<Option<CellKind>>,
        needs_full: bool,
        last_hud: String,
    }

    impl<'a> TerminalSurface<'a> {
        fn new(out: &'a mut Stdout) -> Self {
            Self {
                out,
                grid: None,
                current: Vec::new(),
                last: Vec::new(),
                needs_full: true,
                last_hud: String::new(),
            }
        }

        fn draw_cell(&mut self, x: i32, y: i32, kind: Option<CellKind>) -> io::Result<()> {
            let (text, color) = match kind {
                Some(CellKind::HumanTrail) => ("██", Color::Cyan),
                Some(CellKind::CpuTrail) => ("██", Color::Magenta),
                Some(CellKind::HumanHead) | Some(CellKind::CpuHead) => ("██", Color::White),
                None => ("  ", Color::Reset),
            };
            self.out
                .queue(MoveTo(x as u16 * CELL_W, y as u16 + HUD_ROWS))?
                .queue(SetForegroundColor(color))?
                .queue(Print(text))?
                .queue(ResetColor)?;
            Ok(())
        }
    }

    impl Surface for TerminalSurface<'_> {
        type Error = io::Error;

        fn clear(&mut self, grid: Grid) -> io::Result<()> {
            if self.grid != Some(grid) {
                self.grid = Some(grid);
                self.last = vec![None; grid.area()];
                self.needs_full = true;
            }
            self.current = vec![None; grid.area()];
            Ok(())
        }

        fn fill_cell(&mut self, cell: Cell, kind: CellKind) -> io::Result<()> {
            if let Some(i) = self.grid.and_then(|g| g.index(cell)) {
                self.current[i] = Some(kind);
            }
            Ok(())
        }

        fn hud(&mut self, frame: &FrameView<'_>) -> io::Result<()> {
            let status = match (frame.phase, frame.outcome) {
                (GamePhase::Menu, _) => "ENTER start  arrows/hjkl steer  q quit".to_string(),
                (GamePhase::Playing, _) => "q quit".to_string(),
                (GamePhase::GameOver, Some(Outcome::HumanWin)) => {
                    "VICTORY  ENTER next level  r restart  q quit".to_string()
                }
                (GamePhase::GameOver, outcome) => format!(
                    "{}  ENTER retry  r restart  q quit",
                    outcome.map(|o| o.label()).unwrap_or("GAME OVER")
                ),
            };
            let hud = format!(
                "PLAYER {}  |  LEVEL {}  |  CPU {}   {}",
                frame.score.human, frame.level, frame.score.cpu, status
            );
            if self.needs_full || hud != self.last_hud {
                self.out
                    .queue(MoveTo(0, 0))?
                    .queue(Clear(ClearType::CurrentLine))?
                    .queue(Print(&hud))?;
                self.last_hud = hud;
            }
            Ok(())
        }

        fn present(&mut self) -> io::Result<()> {
            if let Some(grid) = self.grid {
                if self.needs_full {
                    self.out.queue(Clear(ClearType::All))?;
                    self.last_hud.clear();
                }
                for y in 0..grid.height() {
                    for x in 0..grid.width() {
                        let i = (y * grid.width() + x) as usize;
                        if self.needs_full || self.current[i] != self.last[i] {
                            self.draw_cell(x, y, self.current[i])?;
                            self.last[i] = self.current[i];
                        }
                    }
                }
                self.needs_full = false;
            }
            self.out.flush()
        }
    }

    /// Grid-sized "pixel" surface for the current terminal
    fn surface_pixels(cell_size: u32) -> io::Result<(u32, u32)> {
        let (cols, rows) = terminal::size()?;
        let w = (cols / CELL_W) as u32;
        let h = rows.saturating_sub(HUD_ROWS) as u32;
        Ok((w * cell_size, h * cell_size))
    }

    fn direction_for_key(code: KeyCode) -> Option<Direction> {
        match code {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('w') => Some(Direction::Up),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('s') => Some(Direction::Down),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('a') => Some(Direction::Left),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('d') => Some(Direction::Right),
            _ => None,
        }
    }

    fn confirm(session: &mut Session) {
        let result = match (session.phase(), session.last_outcome()) {
            (GamePhase::Menu, _) => session.start(true),
            (GamePhase::GameOver, Some(Outcome::HumanWin)) => session.start(false),
            (GamePhase::GameOver, _) => session.retry(),
            (GamePhase::Playing, _) => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("Cannot start round: {}", e);
        }
    }

    /// Log file used while the terminal is in raw mode
    const LOG_FILE: &str = "light-cycles.log";

    fn load_settings() -> Result<Settings, light_cycles::GameError> {
        match std::env::args_os().nth(1).map(PathBuf::from) {
            Some(path) => Settings::load_from(&path),
            None => Ok(Settings::default()),
        }
    }

    /// Log to a file, and only when `RUST_LOG` asks for it. Anything written
    /// to stderr would land on top of the alternate screen.
    fn init_logging() {
        if std::env::var_os("RUST_LOG").is_none() {
            return;
        }
        match File::create(LOG_FILE) {
            Ok(file) => {
                env_logger::Builder::from_default_env()
                    .target(env_logger::Target::Pipe(Box::new(file)))
                    .init();
            }
            Err(e) => eprintln!("light-cycles: cannot open {}: {}", LOG_FILE, e),
        }
    }

    pub fn main() -> io::Result<()> {
        init_logging();
        log::info!("Light Cycles (terminal) starting...");

        let seed = rand::rng().random::<u64>();
        let session = match load_settings().and_then(|settings| Session::new(settings, seed)) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("light-cycles: {}", e);
                std::process::exit(2);
            }
        };
        log::info!("Game initialized with seed: {}", seed);

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(Hide)?;

        let result = run(&mut stdout, session);

        stdout.execute(Show)?;
        stdout.execute(LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        result
    }

    fn run(stdout: &mut Stdout, mut session: Session) -> io::Result<()> {
        let cell_size = session.settings().cell_size;
        let (w, h) = surface_pixels(cell_size)?;
        if let Err(e) = session.resize(w, h) {
            log::warn!("Terminal too small: {}", e);
        }

        let mut surface = TerminalSurface::new(stdout);
        let mut last_frame = Instant::now();

        loop {
            let frame_start = Instant::now();
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        if let Some(dir) = direction_for_key(key.code) {
                            session.on_direction_input(dir);
                            continue;
                        }
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => {
                                session.on_exit();
                                return Ok(());
                            }
                            KeyCode::Enter | KeyCode::Char(' ') => confirm(&mut session),
                            KeyCode::Char('r') if session.phase() != GamePhase::Playing => {
                                if let Err(e) = session.start(true) {
                                    log::warn!("Cannot start round: {}", e);
                                }
                            }
                            _ => {}
                        }
                    }
                    Event::Resize(cols, rows) => {
                        let w = (cols / CELL_W) as u32 * cell_size;
                        let h = rows.saturating_sub(HUD_ROWS) as u32 * cell_size;
                        if let Err(e) = session.resize(w, h) {
                            log::warn!("Terminal too small: {}", e);
                        }
                        surface.needs_full = true;
                    }
                    _ => {}
                }
            }

            let now = Instant::now();
            let elapsed_ms = now.duration_since(last_frame).as_secs_f64() * 1000.0;
            last_frame = now;
            if let Some(outcome) = session.advance(elapsed_ms) {
                log::info!("Round finished: {:?}", outcome);
                log::debug!("last CPU search: {:?}", session.search_stats());
            }

            render::paint(&session.frame(), &mut surface)?;

            let spent = frame_start.elapsed();
            if spent < FRAME_TIME {
                thread::sleep(FRAME_TIME - spent);
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::io::Result<()> {
    native_game::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
