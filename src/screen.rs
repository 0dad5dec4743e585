use timer_core::{Cue, Host};

use crate::pump::{Pump, TickTicket};

/// What the timer has published so far; drawn by `ui`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct View {
    pub time: String,
    pub scramble: String,
    pub cue: Cue,
}

/// Host side of the solve timer: schedules ticks on the pump thread and
/// keeps the published view until the next redraw.
pub struct Screen {
    view: View,
    dirty: bool,
    pump: Pump,
}

impl Screen {
    pub fn new(pump: Pump) -> Self {
        Self {
            view: View::default(),
            dirty: true,
            pump,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn pump(&self) -> &Pump {
        &self.pump
    }

    pub fn pump_mut(&mut self) -> &mut Pump {
        &mut self.pump
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

impl Host for Screen {
    type Tick = TickTicket;

    fn start_tick(&mut self, interval_ms: u64) -> TickTicket {
        let ticket = self.pump.start(interval_ms);
        log::debug!("tick generation {} started ({} ms)", ticket.generation(), interval_ms);
        ticket
    }

    fn cancel_tick(&mut self, tick: TickTicket) {
        log::debug!("tick generation {} cancelled", tick.generation());
        self.pump.cancel(tick);
    }

    fn publish_time(&mut self, text: &str) {
        if self.view.time != text {
            self.view.time.clear();
            self.view.time.push_str(text);
            self.dirty = true;
        }
    }

    fn publish_scramble(&mut self, text: &str) {
        log::info!("scramble: {}", text);
        self.view.scramble = text.to_string();
        self.dirty = true;
    }

    fn publish_cue(&mut self, cue: Cue) {
        if self.view.cue != cue {
            self.view.cue = cue;
            self.dirty = true;
        }
    }
}
