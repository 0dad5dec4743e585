mod input;
mod pump;
mod screen;
mod settings;
mod ui;

use std::fs::{self, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use timer_core::{format_time, generate_scramble, CubeTimer, TimerState};
use tracing_subscriber::EnvFilter;

use crate::input::{Action, Bindings, InputReader, Signal, TapHold};
use crate::pump::Pump;
use crate::screen::Screen;
use crate::settings::Settings;
use crate::ui::Layout;

const APP_NAME: &str = "cubetimer";

/// Messages posted to the main loop by the input and pump threads.
pub enum AppOp {
    Terminal(Event),
    Pump(u64),
    InputError(String),
}

#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about = "Speedcubing timer with random-move scrambles")]
struct Cli {
    /// Config file (default: <config dir>/cubetimer/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs here instead of the default data directory
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Display refresh interval while a solve is running
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Seed the scramble generator for reproducible scrambles
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Ignore the mouse; only the trigger key starts and stops the timer
    #[arg(long)]
    no_mouse: bool,

    /// Print COUNT scrambles and exit
    #[arg(long, value_name = "COUNT")]
    scramble: Option<usize>,
}

struct CubeTimerApp {
    timer: CubeTimer<Screen, StdRng>,
    bindings: Bindings,
    /// Held-trigger tracking for terminals without key releases.
    tap: TapHold,
    layout: Layout,
    clock: Instant,
    help_visible: bool,
    confirm_exit: bool,
    quit: bool,
}

impl CubeTimerApp {
    fn new(
        screen: Screen,
        rng: StdRng,
        settings: &Settings,
        bindings: Bindings,
        size: (u16, u16),
    ) -> Self {
        Self {
            timer: CubeTimer::new(screen, rng, settings.tick_interval_ms),
            bindings,
            tap: TapHold::default(),
            layout: Layout::new(size.0, size.1),
            clock: Instant::now(),
            help_visible: false,
            confirm_exit: false,
            quit: false,
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn mark_dirty(&mut self) {
        self.timer.host_mut().mark_dirty();
    }

    fn redraw<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if !self.timer.host_mut().take_dirty() {
            return Ok(());
        }

        if self.help_visible {
            return ui::draw_help(out, &self.layout, &self.help_text());
        }
        if self.confirm_exit {
            return ui::draw_confirm_exit(out, &self.layout);
        }
        let trigger = self.bindings.trigger.to_string();
        ui::draw_timer(
            out,
            &self.layout,
            self.timer.host().view(),
            self.timer.state(),
            &trigger,
        )
    }

    fn handle_event(&mut self, event: &Event) {
        for action in input::translate(event, &self.bindings, self.layout.panel) {
            match action {
                Action::Signal(signal) => self.handle_signal(signal),
                Action::TriggerPress => {
                    let now = self.now_ms();
                    self.trigger_press(now);
                }
                Action::Key(code) => self.handle_key(code),
                Action::Interrupt => self.quit = true,
                Action::Resize(cols, rows) => {
                    self.layout = Layout::new(cols, rows);
                    self.mark_dirty();
                }
            }
        }
    }

    fn handle_signal(&mut self, signal: Signal) {
        let now = self.now_ms();
        self.deliver(signal, now);
    }

    fn trigger_press(&mut self, now: u64) {
        if let Some(signal) = self.tap.press(now) {
            self.deliver(signal, now);
        }
    }

    /// Ends a held trigger once its press stream has gone quiet.
    fn release_held_trigger(&mut self, now: u64) {
        if let Some(released_at) = self.tap.release_due(now) {
            self.deliver(Signal::Up, released_at);
        }
    }

    fn deliver(&mut self, signal: Signal, now: u64) {
        // Help swallows signals; a press closes it
        if self.help_visible {
            if signal == Signal::Down {
                self.help_visible = false;
                self.mark_dirty();
            }
            return;
        }
        // A press in the quit dialog closes it and still stops the solve
        if self.confirm_exit {
            if signal == Signal::Up {
                return;
            }
            self.confirm_exit = false;
            self.mark_dirty();
        }

        let before = self.timer.state();
        match signal {
            Signal::Down => self.timer.on_down(now),
            Signal::Up => self.timer.on_up(now),
        }
        let after = self.timer.state();
        if before != after {
            log::debug!("{:?} at {} ms: {} -> {}", signal, now, before.name(), after.name());
            if after == TimerState::Stopped {
                log::info!("solve: {}", format_time(self.timer.elapsed_ms()));
            }
            // Captions follow the state even when nothing was published
            self.mark_dirty();
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        // If help screen is showing, any key dismisses it
        if self.help_visible {
            self.help_visible = false;
            self.mark_dirty();
            return;
        }

        if self.confirm_exit {
            match code {
                KeyCode::Char('y') => self.quit = true,
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.confirm_exit = false;
                    self.mark_dirty();
                }
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char('?') | KeyCode::F(1) => {
                if matches!(self.timer.state(), TimerState::Idle | TimerState::Stopped) {
                    self.help_visible = true;
                    self.mark_dirty();
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.timer.state() == TimerState::Running {
                    self.confirm_exit = true;
                    self.mark_dirty();
                } else {
                    self.quit = true;
                }
            }
            _ => {}
        }
    }

    fn handle_pump(&mut self, generation: u64) {
        // Drop ticks from a run that has already been cancelled
        if !self.timer.host().pump().is_current(generation) {
            return;
        }
        let now = self.now_ms();
        self.timer.on_tick(now);
    }

    fn help_text(&self) -> String {
        let key = self.bindings.trigger.to_string();
        let mut text = format!(
            "CUBE TIMER HELP\n\n\
             hold {key}     Arm the timer\n\
             release {key}  Start the solve\n\
             press {key}    Stop the solve\n\
             press {key}    Clear and show a new scramble\n"
        );
        if self.bindings.mouse {
            text.push_str("\nThe left mouse button in the timer panel works like the key.\n");
        }
        if !self.bindings.release_events {
            text.push_str(
                "\nThis terminal does not report key releases:\n\
                 the solve starts a moment after the key goes quiet.\n",
            );
        }
        text.push_str("\n?      Help\nq/Esc  Quit");
        text
    }
}

/// Raw mode, alternate screen and input reporting for the lifetime of the app.
struct TerminalSession {
    mouse: bool,
    keyboard_enhanced: bool,
}

impl TerminalSession {
    fn enter(mouse: bool) -> io::Result<Self> {
        enable_raw_mode()?;
        // Guard first so a failure below still restores the terminal
        let mut session = Self {
            mouse: false,
            keyboard_enhanced: false,
        };
        let keyboard_enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        install_panic_hook(mouse, keyboard_enhanced);

        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide)?;
        if mouse {
            execute!(out, EnableMouseCapture)?;
            session.mouse = true;
        }
        if keyboard_enhanced {
            execute!(
                out,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
            session.keyboard_enhanced = true;
        }
        Ok(session)
    }

    /// Key releases are reported natively on Windows and through the
    /// keyboard enhancement protocol elsewhere.
    fn release_events(&self) -> bool {
        self.keyboard_enhanced || cfg!(windows)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        restore_terminal(self.mouse, self.keyboard_enhanced);
    }
}

fn restore_terminal(mouse: bool, keyboard_enhanced: bool) {
    let mut out = io::stdout();
    if keyboard_enhanced {
        let _ = execute!(out, PopKeyboardEnhancementFlags);
    }
    if mouse {
        let _ = execute!(out, DisableMouseCapture);
    }
    let _ = execute!(out, LeaveAlternateScreen, Show);
    let _ = disable_raw_mode();
}

fn install_panic_hook(mouse: bool, keyboard_enhanced: bool) {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal(mouse, keyboard_enhanced);
        original_hook(info);
    }));
}

fn init_logging(explicit: Option<PathBuf>) -> Option<PathBuf> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    for candidate in log_file_candidates(explicit) {
        if let Some(parent) = candidate.parent() {
            if fs::create_dir_all(parent).is_err() {
                continue;
            }
        }
        let Ok(file) = OpenOptions::new().create(true).append(true).open(&candidate) else {
            continue;
        };
        // Never log to the terminal: it is in raw mode for the whole session
        let installed = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .is_ok();
        return installed.then_some(candidate);
    }
    None
}

fn log_file_candidates(explicit: Option<PathBuf>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path];
    }
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::data_local_dir() {
        candidates.push(dir.join(APP_NAME).join("cubetimer.log"));
    }
    // Fallback for constrained environments
    candidates.push(PathBuf::from(".cubetimer").join("cubetimer.log"));
    candidates
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        // An explicitly named config must be valid
        Some(path) => Settings::load(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => Settings::load_or_default(Settings::default_path().as_deref()),
    };
    if let Some(tick_ms) = cli.tick_ms {
        settings.tick_interval_ms = tick_ms;
        settings.validate().context("invalid --tick-ms")?;
    }
    if cli.no_mouse {
        settings.mouse = false;
    }
    Ok(settings)
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn run(app: &mut CubeTimerApp, rx: &Receiver<AppOp>, out: &mut Stdout) -> Result<()> {
    app.redraw(out)?;
    while !app.quit {
        // Wake up in time to release a held trigger
        let msg = match app.tap.remaining_ms(app.now_ms()) {
            Some(ms) => match rx.recv_timeout(Duration::from_millis(ms)) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => bail!("event channel closed"),
            },
            None => Some(rx.recv().context("event channel closed")?),
        };
        match msg {
            Some(AppOp::Terminal(event)) => app.handle_event(&event),
            Some(AppOp::Pump(generation)) => app.handle_pump(generation),
            Some(AppOp::InputError(e)) => bail!("terminal input failed: {e}"),
            None => {}
        }
        let now = app.now_ms();
        app.release_held_trigger(now);
        app.redraw(out)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(cli.log_file.clone());
    if let Some(path) = &log_path {
        log::info!("{} {} logging to {}", APP_NAME, env!("CARGO_PKG_VERSION"), path.display());
    }

    let settings = load_settings(&cli)?;
    let mut rng = make_rng(cli.seed);

    if let Some(count) = cli.scramble {
        let mut stdout = io::stdout().lock();
        for _ in 0..count {
            writeln!(stdout, "{}", generate_scramble(&mut rng))?;
        }
        return Ok(());
    }

    let session = TerminalSession::enter(settings.mouse).context("can't set up terminal")?;
    let bindings = Bindings {
        trigger: settings.trigger_key,
        mouse: settings.mouse,
        release_events: session.release_events(),
    };
    log::info!(
        "trigger={} mouse={} release_events={} tick={}ms",
        bindings.trigger,
        bindings.mouse,
        bindings.release_events,
        settings.tick_interval_ms
    );

    let (tx, rx) = mpsc::channel();
    let screen = Screen::new(Pump::spawn(tx.clone()));
    let mut reader = InputReader::spawn(tx);
    let size = terminal::size().context("can't read terminal size")?;
    let mut app = CubeTimerApp::new(screen, rng, &settings, bindings, size);

    let mut out = io::stdout();
    let result = run(&mut app, &rx, &mut out);

    // Clean up
    if app.timer.host().pump().is_running() {
        log::info!("quit during a solve; result discarded");
    }
    app.timer.host_mut().pump_mut().shutdown();
    reader.shutdown();
    drop(session);
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    result
}
