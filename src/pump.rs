use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::AppOp;

enum PumpCtl {
    Start { interval_ms: u64, generation: u64 },
    Stop,
    Quit,
}

/// One scheduled run of the pump. Not `Clone`: each ticket is handed back
/// exactly once when the run is cancelled.
#[derive(Debug, PartialEq, Eq)]
pub struct TickTicket {
    generation: u64,
}

impl TickTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Control side of the tick thread, owned by the main loop.
pub struct Pump {
    ctl: Sender<PumpCtl>,
    generation: u64,
    current: Option<u64>,
    join: Option<JoinHandle<()>>,
}

impl Pump {
    pub fn spawn(main_conn: Sender<AppOp>) -> Self {
        let (ctl, ctl_rx) = mpsc::channel();
        let join = thread::spawn(move || pump_thread(ctl_rx, main_conn));
        Self {
            ctl,
            generation: 0,
            current: None,
            join: Some(join),
        }
    }

    pub fn start(&mut self, interval_ms: u64) -> TickTicket {
        self.generation += 1;
        self.current = Some(self.generation);
        self.ctl
            .send(PumpCtl::Start {
                interval_ms,
                generation: self.generation,
            })
            .ok();
        TickTicket {
            generation: self.generation,
        }
    }

    pub fn cancel(&mut self, ticket: TickTicket) {
        if self.current == Some(ticket.generation) {
            self.current = None;
            self.ctl.send(PumpCtl::Stop).ok();
        } else {
            log::warn!("cancel for stale tick generation {}", ticket.generation);
        }
    }

    /// Whether a pump message belongs to the run that is currently scheduled.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current == Some(generation)
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn shutdown(&mut self) {
        self.current = None;
        self.ctl.send(PumpCtl::Quit).ok();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("pump thread panicked");
            }
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn pump_thread(ctl: Receiver<PumpCtl>, main_conn: Sender<AppOp>) {
    let mut interval = Duration::from_millis(timer_core::DEFAULT_TICK_MS);
    let mut running: Option<u64> = None;

    loop {
        // Wait out the interval when running, block when stopped
        let msg = match running {
            Some(generation) => match ctl.recv_timeout(interval) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout) => {
                    if main_conn.send(AppOp::Pump(generation)).is_err() {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match ctl.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            },
        };

        match msg {
            PumpCtl::Start {
                interval_ms,
                generation,
            } => {
                interval = Duration::from_millis(interval_ms.max(1));
                running = Some(generation);
            }
            PumpCtl::Stop => running = None,
            PumpCtl::Quit => break,
        }
    }
    log::debug!("pump thread exiting");
}
