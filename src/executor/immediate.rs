//! Synchronous executor for deterministic tests.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use super::{Task, TaskExecutor, run_isolated};

/// Executor that runs each posted task on the caller's thread before `post`
/// returns.
#[derive(Debug)]
pub struct ImmediateExecutor {
    running: AtomicBool,
}

impl ImmediateExecutor {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
        }
    }
}

impl Default for ImmediateExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for ImmediateExecutor {
    fn post(&self, task: Task) -> bool {
        if !self.is_running() {
            return false;
        }
        run_isolated(task);
        true
    }

    fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn halt(&self) {
        self.shutdown();
    }

    fn wait_for_termination(&self, _timeout: Duration) -> bool {
        true
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}
