//! Pure timing logic library with no platform dependencies.
//! Testable on host; the terminal app supplies clock, ticks and display.

mod machine;
mod scramble;

pub use machine::{CubeTimer, Cue, Host, TimerState};
pub use scramble::{generate_scramble, Face, Modifier, Move, Scramble, SCRAMBLE_LENGTH};

/// Tick resolution used when the caller does not configure one.
pub const DEFAULT_TICK_MS: u64 = 10;

/// Elapsed-time accounting for a single solve.
///
/// Measurement is anchored at `now - carried`, stored as the carried
/// milliseconds plus the instant the current segment started so that an
/// early clock reading can never underflow the anchor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stopwatch {
    carried_ms: u64,
    segment_start_ms: Option<u64>,
    elapsed_ms: u64,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.segment_start_ms.is_some()
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.is_running() {
            return;
        }
        self.carried_ms = self.elapsed_ms;
        self.segment_start_ms = Some(now_ms);
    }

    /// Recompute elapsed time at `now_ms`. Never moves backwards, even if
    /// the clock reading does.
    pub fn sample(&mut self, now_ms: u64) -> u64 {
        if let Some(start) = self.segment_start_ms {
            let measured = self.carried_ms + now_ms.saturating_sub(start);
            self.elapsed_ms = self.elapsed_ms.max(measured);
        }
        self.elapsed_ms
    }

    /// Final recomputation, then freeze.
    pub fn stop(&mut self, now_ms: u64) -> u64 {
        let elapsed = self.sample(now_ms);
        self.segment_start_ms = None;
        elapsed
    }

    pub fn reset(&mut self) {
        self.carried_ms = 0;
        self.segment_start_ms = None;
        self.elapsed_ms = 0;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

/// Format milliseconds as "S.mmm" (truncated, never rounded)
pub fn format_time(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}
