//! Input-channel normalization.
//!
//! The trigger key and the left mouse button are folded into the two logical
//! signals the solve timer understands. No per-channel state is kept; key
//! repeats are recognised by their event kind and dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::settings::TriggerKey;
use crate::ui::Rect;
use crate::AppOp;

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness

/// Quiet time after the last trigger press before a held key counts as
/// released. Longer than the usual auto-repeat delay.
pub const TAP_RELEASE_MS: u64 = 600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Down,
    Up,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Signal(Signal),
    /// Trigger press on a terminal without release events. Auto-repeat of a
    /// held key arrives as more of these.
    TriggerPress,
    /// Any other key press, for menus and dialogs.
    Key(KeyCode),
    Interrupt,
    Resize(u16, u16),
}

#[derive(Clone, Copy, Debug)]
pub struct Bindings {
    pub trigger: TriggerKey,
    pub mouse: bool,
    /// The terminal reports key releases. Without them the release of a held
    /// trigger is inferred by `TapHold`.
    pub release_events: bool,
}

impl Bindings {
    fn is_trigger(&self, code: KeyCode) -> bool {
        match self.trigger {
            TriggerKey::Space => code == KeyCode::Char(' '),
            TriggerKey::Enter => code == KeyCode::Enter,
            TriggerKey::Char(c) => code == KeyCode::Char(c),
        }
    }
}

pub fn translate(event: &Event, bindings: &Bindings, panel: Rect) -> Vec<Action> {
    match event {
        Event::Key(key) => translate_key(key, bindings),
        Event::Mouse(mouse) if bindings.mouse => translate_mouse(mouse, panel),
        Event::Resize(cols, rows) => vec![Action::Resize(*cols, *rows)],
        _ => Vec::new(),
    }
}

fn translate_key(key: &KeyEvent, bindings: &Bindings) -> Vec<Action> {
    let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl_c && key.kind == KeyEventKind::Press {
        return vec![Action::Interrupt];
    }

    if !ctrl_c && bindings.is_trigger(key.code) {
        return match key.kind {
            KeyEventKind::Press if bindings.release_events => vec![Action::Signal(Signal::Down)],
            KeyEventKind::Press => vec![Action::TriggerPress],
            KeyEventKind::Release => vec![Action::Signal(Signal::Up)],
            KeyEventKind::Repeat => Vec::new(),
        };
    }

    if key.kind != KeyEventKind::Press {
        return Vec::new();
    }
    vec![Action::Key(key.code)]
}

/// Folds the press stream of a held trigger into one down/up pair on
/// terminals that only report presses.
#[derive(Debug, Default)]
pub struct TapHold {
    last_press_ms: Option<u64>,
}

impl TapHold {
    /// `Down` for the press that begins a hold; repeats of it yield nothing.
    pub fn press(&mut self, now_ms: u64) -> Option<Signal> {
        let fresh = self.last_press_ms.is_none();
        self.last_press_ms = Some(now_ms);
        fresh.then_some(Signal::Down)
    }

    /// Ends the hold once the key has been quiet for `TAP_RELEASE_MS`.
    /// Returns the last press instant, which stands in for the release.
    pub fn release_due(&mut self, now_ms: u64) -> Option<u64> {
        let last = self.last_press_ms?;
        if now_ms.saturating_sub(last) < TAP_RELEASE_MS {
            return None;
        }
        self.last_press_ms = None;
        Some(last)
    }

    /// Time left until a pending hold is released.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_press_ms
            .map(|last| last.saturating_add(TAP_RELEASE_MS).saturating_sub(now_ms))
    }
}

fn translate_mouse(mouse: &MouseEvent, panel: Rect) -> Vec<Action> {
    if !panel.contains(mouse.column, mouse.row) {
        return Vec::new();
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => vec![Action::Signal(Signal::Down)],
        MouseEventKind::Up(MouseButton::Left) => vec![Action::Signal(Signal::Up)],
        _ => Vec::new(),
    }
}

/// Reads terminal events on a background thread and posts them to the main loop.
pub struct InputReader {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl InputReader {
    pub fn spawn(main_conn: Sender<AppOp>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let join = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                match event::poll(INPUT_POLL_TIMEOUT) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        main_conn.send(AppOp::InputError(e.to_string())).ok();
                        break;
                    }
                }
                let msg = match event::read() {
                    Ok(ev) => AppOp::Terminal(ev),
                    Err(e) => AppOp::InputError(e.to_string()),
                };
                let failed = matches!(msg, AppOp::InputError(_));
                if main_conn.send(msg).is_err() || failed {
                    break;
                }
            }
        });
        Self {
            stop,
            join: Some(join),
        }
    }

    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("input thread panicked");
            }
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.shutdown();
    }
}
