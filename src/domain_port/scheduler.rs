use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs a closure once after a delay.
pub trait Scheduler: Send + Sync {
    fn run_after(&self, delay: Duration, task: ScheduledTask) -> TimerHandle;
}

/// Cancelling more than once, or after the task ran, does nothing.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
