//! Trigger scheduling: startup, periodic and debounced change triggers.
//!
//! A dedicated thread owns all deadlines. Timers are cancellable by
//! construction: stopping the scheduler tears the thread down, so no
//! queued trigger can fire afterwards. At most one debounce deadline
//! exists at a time; a new change event replaces it.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What caused a sync cycle to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// One-shot trigger after the post-initialization delay.
    Startup,
    /// Unconditional fixed-interval trigger.
    Periodic,
    /// Debounced local-store change trigger.
    Change,
    /// Explicit caller request.
    Manual,
}

pub(crate) enum SchedulerMsg {
    Change,
    CancelDebounce,
    Stop,
}

/// Handle to the scheduler thread.
pub(crate) struct Scheduler {
    tx: Sender<SchedulerMsg>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the scheduler thread. `run_cycle` is invoked on that
    /// thread whenever a trigger fires.
    pub(crate) fn start<F>(
        startup_delay: Duration,
        periodic_interval: Duration,
        debounce_delay: Duration,
        run_cycle: F,
    ) -> Self
    where
        F: Fn(Trigger) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            run_loop(rx, startup_delay, periodic_interval, debounce_delay, run_cycle);
        });
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// A sender for feeding change events into the scheduler.
    pub(crate) fn change_sender(&self) -> Sender<SchedulerMsg> {
        self.tx.clone()
    }

    /// Cancels any pending debounce deadline.
    pub(crate) fn cancel_debounce(&self) {
        let _ = self.tx.send(SchedulerMsg::CancelDebounce);
    }

    /// Stops the scheduler and joins its thread. A cycle already running
    /// on the scheduler thread completes first; only future scheduling
    /// is suppressed.
    pub(crate) fn stop(&mut self) {
        let _ = self.tx.send(SchedulerMsg::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<F: Fn(Trigger)>(
    rx: Receiver<SchedulerMsg>,
    startup_delay: Duration,
    periodic_interval: Duration,
    debounce_delay: Duration,
    run_cycle: F,
) {
    // The first timer deadline is the one-shot startup trigger; every
    // deadline after that is periodic.
    let mut next_timer = Instant::now() + startup_delay;
    let mut started = false;
    let mut debounce: Option<Instant> = None;

    loop {
        let deadline = match debounce {
            Some(d) if d < next_timer => d,
            _ => next_timer,
        };
        let timeout = deadline.saturating_duration_since(Instant::now());

        match rx.recv_timeout(timeout) {
            Ok(SchedulerMsg::Change) => {
                // Replace, never stack: one pending debounce at most.
                debounce = Some(Instant::now() + debounce_delay);
            }
            Ok(SchedulerMsg::CancelDebounce) => debounce = None,
            Ok(SchedulerMsg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();

                if debounce.is_some_and(|d| now >= d) {
                    debounce = None;
                    run_cycle(Trigger::Change);
                }

                if now >= next_timer {
                    let trigger = if started {
                        Trigger::Periodic
                    } else {
                        started = true;
                        Trigger::Startup
                    };
                    next_timer = Instant::now() + periodic_interval;
                    run_cycle(trigger);
                }
            }
        }
    }
}
