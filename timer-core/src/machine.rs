//! Hold-to-arm solve timer.
//!
//! Holding the trigger arms the timer (`Prepare`), releasing it starts the
//! clock, the next press stops it immediately, and one more press clears the
//! result and deals a fresh scramble. Every effect on the outside world goes
//! through [`Host`].

use rand::Rng;

use crate::scramble::{generate_scramble, Scramble};
use crate::{format_time, Stopwatch};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerState {
    Idle,
    Prepare,
    Running,
    Stopped,
}

impl TimerState {
    pub fn name(&self) -> &'static str {
        match self {
            TimerState::Idle => "Idle",
            TimerState::Prepare => "Prepare",
            TimerState::Running => "Running",
            TimerState::Stopped => "Stopped",
        }
    }
}

/// Visual category of the time display.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Cue {
    #[default]
    None,
    Ready,
    Running,
}

/// Collaborator that schedules ticks and renders what the timer publishes.
pub trait Host {
    /// Handle for one scheduled periodic tick. Consumed on cancel, so a
    /// tick can be cancelled at most once.
    type Tick;

    fn start_tick(&mut self, interval_ms: u64) -> Self::Tick;
    fn cancel_tick(&mut self, tick: Self::Tick);
    fn publish_time(&mut self, text: &str);
    fn publish_scramble(&mut self, text: &str);
    fn publish_cue(&mut self, cue: Cue);
}

pub struct CubeTimer<H: Host, R: Rng> {
    state: TimerState,
    stopwatch: Stopwatch,
    tick: Option<H::Tick>,
    tick_interval_ms: u64,
    scramble: Scramble,
    cue: Cue,
    rng: R,
    host: H,
}

impl<H: Host, R: Rng> CubeTimer<H, R> {
    /// Build an idle timer and publish the opening scramble and time.
    pub fn new(host: H, mut rng: R, tick_interval_ms: u64) -> Self {
        let scramble = generate_scramble(&mut rng);
        let mut timer = Self {
            state: TimerState::Idle,
            stopwatch: Stopwatch::new(),
            tick: None,
            tick_interval_ms: tick_interval_ms.max(1),
            scramble,
            cue: Cue::None,
            rng,
            host,
        };
        let text = timer.scramble.to_string();
        timer.host.publish_scramble(&text);
        timer.host.publish_time(&format_time(0));
        timer
    }

    pub fn on_down(&mut self, now_ms: u64) {
        match self.state {
            TimerState::Idle => {
                self.state = TimerState::Prepare;
                self.set_cue(Cue::Ready);
            }
            // Repeated down while armed
            TimerState::Prepare => {}
            TimerState::Running => self.stop(now_ms),
            TimerState::Stopped => self.reset(),
        }
    }

    pub fn on_up(&mut self, now_ms: u64) {
        match self.state {
            TimerState::Prepare => self.start(now_ms),
            // An up can arrive for a press that began before a reset
            TimerState::Idle => self.set_cue(Cue::None),
            TimerState::Running | TimerState::Stopped => {}
        }
    }

    /// Periodic tick; only has an effect while running.
    pub fn on_tick(&mut self, now_ms: u64) {
        if self.state != TimerState::Running {
            return;
        }
        let elapsed = self.stopwatch.sample(now_ms);
        self.host.publish_time(&format_time(elapsed));
    }

    fn start(&mut self, now_ms: u64) {
        self.stopwatch.start(now_ms);
        if let Some(stale) = self.tick.take() {
            self.host.cancel_tick(stale);
        }
        self.tick = Some(self.host.start_tick(self.tick_interval_ms));
        self.state = TimerState::Running;
        self.set_cue(Cue::Running);
    }

    fn stop(&mut self, now_ms: u64) {
        // Recompute before cancelling so a stale last tick cannot win
        let elapsed = self.stopwatch.stop(now_ms);
        if let Some(tick) = self.tick.take() {
            self.host.cancel_tick(tick);
        }
        self.state = TimerState::Stopped;
        self.host.publish_time(&format_time(elapsed));
        self.set_cue(Cue::None);
    }

    fn reset(&mut self) {
        self.stopwatch.reset();
        self.host.publish_time(&format_time(0));
        self.scramble = generate_scramble(&mut self.rng);
        let text = self.scramble.to_string();
        self.host.publish_scramble(&text);
        self.state = TimerState::Idle;
        self.set_cue(Cue::None);
    }

    fn set_cue(&mut self, cue: Cue) {
        self.cue = cue;
        self.host.publish_cue(cue);
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.stopwatch.elapsed_ms()
    }

    pub fn scramble(&self) -> &Scramble {
        &self.scramble
    }

    pub fn cue(&self) -> Cue {
        self.cue
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.is_some()
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[derive(Clone, Debug, PartialEq)]
    enum Event {
        StartTick(u32, u64),
        CancelTick(u32),
        Time(String),
        Scramble(String),
        Cue(Cue),
    }

    #[derive(Default)]
    struct RecordingHost {
        events: Vec<Event>,
        next_tick: u32,
    }

    impl RecordingHost {
        fn drain(&mut self) -> Vec<Event> {
            std::mem::take(&mut self.events)
        }

        fn last_time(&self) -> Option<&str> {
            self.events.iter().rev().find_map(|e| match e {
                Event::Time(t) => Some(t.as_str()),
                _ => None,
            })
        }
    }

    impl Host for RecordingHost {
        type Tick = u32;

        fn start_tick(&mut self, interval_ms: u64) -> u32 {
            self.next_tick += 1;
            self.events.push(Event::StartTick(self.next_tick, interval_ms));
            self.next_tick
        }

        fn cancel_tick(&mut self, tick: u32) {
            self.events.push(Event::CancelTick(tick));
        }

        fn publish_time(&mut self, text: &str) {
            self.events.push(Event::Time(text.to_string()));
        }

        fn publish_scramble(&mut self, text: &str) {
            self.events.push(Event::Scramble(text.to_string()));
        }

        fn publish_cue(&mut self, cue: Cue) {
            self.events.push(Event::Cue(cue));
        }
    }

    fn timer() -> CubeTimer<RecordingHost, ChaCha8Rng> {
        let mut timer = CubeTimer::new(RecordingHost::default(), ChaCha8Rng::seed_from_u64(1), 10);
        timer.host_mut().drain();
        timer
    }

    #[test]
    fn test_new_publishes_scramble_and_zero_time() {
        let timer = CubeTimer::new(RecordingHost::default(), ChaCha8Rng::seed_from_u64(1), 10);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.cue(), Cue::None);
        assert_eq!(
            timer.host().events,
            vec![
                Event::Scramble(timer.scramble().to_string()),
                Event::Time("0.000".to_string()),
            ]
        );
    }

    #[test]
    fn test_idle_down_arms() {
        let mut timer = timer();
        timer.on_down(0);
        assert_eq!(timer.state(), TimerState::Prepare);
        assert_eq!(timer.cue(), Cue::Ready);
        assert_eq!(timer.host_mut().drain(), vec![Event::Cue(Cue::Ready)]);
    }

    #[test]
    fn test_repeated_down_while_armed_is_ignored() {
        let mut timer = timer();
        timer.on_down(0);
        timer.host_mut().drain();
        timer.on_down(5);
        timer.on_down(10);
        assert_eq!(timer.state(), TimerState::Prepare);
        assert!(timer.host_mut().drain().is_empty());
    }

    #[test]
    fn test_release_starts_running() {
        let mut timer = timer();
        timer.on_down(0);
        timer.host_mut().drain();
        timer.on_up(50);
        assert_eq!(timer.state(), TimerState::Running);
        assert!(timer.is_ticking());
        assert_eq!(
            timer.host_mut().drain(),
            vec![Event::StartTick(1, 10), Event::Cue(Cue::Running)]
        );
    }

    #[test]
    fn test_up_while_running_is_ignored() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(0);
        timer.host_mut().drain();
        timer.on_up(100);
        assert_eq!(timer.state(), TimerState::Running);
        assert!(timer.host_mut().drain().is_empty());
    }

    #[test]
    fn test_down_while_running_stops_and_cancels_tick() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(1000);
        timer.host_mut().drain();
        timer.on_down(2234);
        assert_eq!(timer.state(), TimerState::Stopped);
        assert!(!timer.is_ticking());
        assert_eq!(timer.elapsed_ms(), 1234);
        assert_eq!(
            timer.host_mut().drain(),
            vec![
                Event::CancelTick(1),
                Event::Time("1.234".to_string()),
                Event::Cue(Cue::None),
            ]
        );
    }

    #[test]
    fn test_stop_recomputes_even_with_stale_ticks() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(5000);
        // Coarse ticks that never land on the stop instant
        timer.on_tick(5500);
        timer.on_tick(6000);
        timer.on_down(6234);
        assert_eq!(timer.host().last_time(), Some("1.234"));
    }

    #[test]
    fn test_ticks_publish_time_while_running() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(100);
        timer.host_mut().drain();
        timer.on_tick(110);
        timer.on_tick(125);
        assert_eq!(
            timer.host_mut().drain(),
            vec![Event::Time("0.010".to_string()), Event::Time("0.025".to_string())]
        );
    }

    #[test]
    fn test_ticks_outside_running_are_ignored() {
        let mut timer = timer();
        timer.on_tick(10);
        timer.on_down(20);
        timer.on_tick(30);
        timer.on_up(40);
        timer.on_down(1040);
        timer.host_mut().drain();
        timer.on_tick(5000);
        assert!(timer.host_mut().drain().is_empty());
        assert_eq!(timer.elapsed_ms(), 1000);
    }

    #[test]
    fn test_stopped_result_stays_frozen() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(0);
        timer.on_down(800);
        timer.on_up(900);
        timer.on_tick(5000);
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.elapsed_ms(), 800);
    }

    #[test]
    fn test_up_while_stopped_is_ignored() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(0);
        timer.on_down(300);
        timer.host_mut().drain();
        timer.on_up(400);
        assert_eq!(timer.state(), TimerState::Stopped);
        assert!(timer.host_mut().drain().is_empty());
    }

    #[test]
    fn test_down_while_stopped_resets_with_new_scramble() {
        let mut timer = timer();
        let first = timer.scramble().clone();
        timer.on_down(0);
        timer.on_up(0);
        timer.on_down(1500);
        timer.host_mut().drain();

        timer.on_down(2000);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.elapsed_ms(), 0);
        assert_ne!(timer.scramble(), &first);
        assert_eq!(
            timer.host_mut().drain(),
            vec![
                Event::Time("0.000".to_string()),
                Event::Scramble(timer.scramble().to_string()),
                Event::Cue(Cue::None),
            ]
        );
    }

    #[test]
    fn test_up_while_idle_clears_cue_only() {
        let mut timer = timer();
        timer.on_up(0);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.host_mut().drain(), vec![Event::Cue(Cue::None)]);
    }

    #[test]
    fn test_release_after_reset_press_only_clears_cue() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(0);
        timer.on_down(100);
        // The reset press and its release
        timer.on_down(200);
        timer.host_mut().drain();
        timer.on_up(250);
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(!timer.is_ticking());
        assert_eq!(timer.host_mut().drain(), vec![Event::Cue(Cue::None)]);
    }

    #[test]
    fn test_second_solve_uses_fresh_tick_and_starts_at_zero() {
        let mut timer = timer();
        timer.on_down(0);
        timer.on_up(0);
        timer.on_down(400);
        timer.on_down(500);
        timer.on_down(600);
        timer.on_up(700);
        timer.on_down(950);
        assert_eq!(timer.elapsed_ms(), 250);
        let starts = timer
            .host()
            .events
            .iter()
            .filter(|e| matches!(e, Event::StartTick(..)))
            .count();
        let cancels = timer
            .host()
            .events
            .iter()
            .filter(|e| matches!(e, Event::CancelTick(..)))
            .count();
        assert_eq!(starts, 2);
        assert_eq!(cancels, 2);
    }

    #[test]
    fn test_tick_interval_is_at_least_one_ms() {
        let timer = CubeTimer::new(RecordingHost::default(), ChaCha8Rng::seed_from_u64(1), 0);
        assert_eq!(timer.tick_interval_ms(), 1);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(TimerState::Idle.name(), "Idle");
        assert_eq!(TimerState::Prepare.name(), "Prepare");
        assert_eq!(TimerState::Running.name(), "Running");
        assert_eq!(TimerState::Stopped.name(), "Stopped");
    }
}
