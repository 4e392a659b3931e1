use crate::domain_port::*;
use crate::server::ManualClock;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// One tokio task per timer. Cancelling `shutdown` cancels every timer.
pub struct TokioScheduler {
    runtime: Handle,
    shutdown: CancellationToken,
}

impl TokioScheduler {
    pub fn new(runtime: Handle, shutdown: CancellationToken) -> Self {
        Self { runtime, shutdown }
    }
}

impl Scheduler for TokioScheduler {
    fn run_after(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => task(),
            }
        });
        TimerHandle::new(token)
    }
}

struct PendingTask {
    due: DateTime<Utc>,
    handle: TimerHandle,
    task: ScheduledTask,
}

/// Timers driven by a `ManualClock`: nothing runs until `advance` moves the
/// clock past a deadline.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    tasks: Mutex<Vec<PendingTask>>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Moves the clock forward and runs every timer that came due, in deadline
    /// order. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        self.clock.advance(by);
        self.run_due()
    }

    pub fn run_due(&self) -> usize {
        let now = self.clock.now();
        let mut ran = 0;
        loop {
            let due = {
                let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
                tasks.retain(|t| !t.handle.is_cancelled());
                let next = tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= now)
                    .min_by_key(|(_, t)| t.due)
                    .map(|(i, _)| i);
                next.map(|i| tasks.remove(i))
            };
            // run outside the lock, tasks may schedule more timers
            match due {
                Some(pending) => {
                    (pending.task)();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Timers neither run nor cancelled.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|t| !t.handle.is_cancelled())
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn run_after(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let now = self.clock.now();
        let due = TimeDelta::from_std(delay)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let handle = TimerHandle::new(CancellationToken::new());
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(PendingTask {
                due,
                handle: handle.clone(),
                task,
            });
        handle
    }
}
