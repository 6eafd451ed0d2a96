//! Execution contexts used by batching devices.
//!
//! A device never performs network I/O on a producer's thread. Instead it
//! posts [`Task`]s onto a [`TaskExecutor`]. Two implementations exist:
//!
//! - [`ThreadExecutor`] runs tasks one at a time on a dedicated worker
//!   thread. This is the production implementation.
//! - [`ImmediateExecutor`] runs each task synchronously on the posting
//!   thread, which makes device behaviour deterministic in tests.
//!
//! [`IntervalTimer`] posts a callback on a fixed period until stopped.

mod immediate;
mod thread;
mod timer;

use std::{io, sync::Arc, time::Duration};

pub use immediate::ImmediateExecutor;
pub use thread::ThreadExecutor;
pub use timer::IntervalTimer;

/// Unit of work posted onto an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Serial execution context owned by a single device.
pub trait TaskExecutor: Send + Sync {
    /// Queue `task` for execution. Returns `false` if the executor no longer
    /// accepts work; the task is dropped in that case.
    fn post(&self, task: Task) -> bool;

    /// Stop accepting tasks and let already queued ones run to completion.
    fn shutdown(&self);

    /// Discard queued tasks and stop as soon as the current task returns.
    fn halt(&self);

    /// Block until the executor terminates or `timeout` elapses. Returns
    /// `true` once terminated.
    fn wait_for_termination(&self, timeout: Duration) -> bool;

    /// Whether the executor still accepts tasks.
    fn is_running(&self) -> bool;
}

/// Selects the executor implementation a device spawns on `start`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutorKind {
    /// Dedicated worker thread.
    #[default]
    Thread,
    /// Run tasks synchronously on the posting thread.
    Immediate,
}

impl ExecutorKind {
    /// Spawn a fresh executor of this kind.
    pub fn spawn(self, name: &str) -> io::Result<Arc<dyn TaskExecutor>> {
        Ok(match self {
            Self::Thread => Arc::new(ThreadExecutor::spawn(name)?),
            Self::Immediate => Arc::new(ImmediateExecutor::new()),
        })
    }
}

/// Run `task`, logging instead of unwinding if it panics.
pub(crate) fn run_isolated(task: Task) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
        log::warn!("femtobatch executor: task panicked");
    }
}
