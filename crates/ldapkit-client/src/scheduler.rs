//! Timer scheduling for response timeouts.
//!
//! The pending-operation table arms one timer per operation through a
//! [`Scheduler`]. [`TokioScheduler`] backs timers with spawned tasks, so
//! tests running on a paused clock control when they fire.

use std::fmt;
use std::time::Duration;

/// A task run when a timer fires.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Arms one-shot timers.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Runs `task` once `delay` has elapsed, unless the returned handle is
    /// cancelled first.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

/// Handle to an armed timer.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    /// Creates a handle that runs `cancel` when the timer is cancelled.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates a handle with nothing to cancel.
    #[must_use]
    pub const fn none() -> Self {
        Self { cancel: None }
    }

    /// Cancels the timer. Has no effect if it already fired.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Scheduler that spawns a sleeping task on the current tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        let abort = handle.abort_handle();
        TimerHandle::new(move || abort.abort())
    }
}
