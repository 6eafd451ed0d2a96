//! Worker-thread executor.
//!
//! Tasks travel over an unbounded crossbeam channel to a single named worker
//! thread, so posting never blocks. Shutdown is a command on the same channel,
//! which means every task posted before `shutdown` still runs. `halt` flips a
//! flag the worker checks between tasks.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use super::{Task, TaskExecutor, run_isolated};

enum ExecutorCommand {
    Run(Task),
    Shutdown,
}

/// Executor running posted tasks sequentially on one background thread.
pub struct ThreadExecutor {
    tx: Mutex<Option<Sender<ExecutorCommand>>>,
    halted: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    terminated: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadExecutor {
    /// Spawn the worker thread. `name` labels the thread for debuggers.
    pub fn spawn(name: &str) -> io::Result<Self> {
        let (tx, rx) = unbounded();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let halted = Arc::new(AtomicBool::new(false));
        let worker_halted = Arc::clone(&halted);
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                worker_loop(&rx, &worker_halted);
                let _ = done_tx.send(());
            })?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            halted,
            done_rx,
            terminated: AtomicBool::new(false),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn join_worker(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("ThreadExecutor: worker thread panicked");
        }
    }
}

fn worker_loop(rx: &Receiver<ExecutorCommand>, halted: &AtomicBool) {
    for cmd in rx {
        if halted.load(Ordering::Acquire) {
            break;
        }
        match cmd {
            ExecutorCommand::Run(task) => run_isolated(task),
            ExecutorCommand::Shutdown => break,
        }
    }
}

impl TaskExecutor for ThreadExecutor {
    fn post(&self, task: Task) -> bool {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        tx.send(ExecutorCommand::Run(task)).is_ok()
    }

    fn shutdown(&self) {
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        let _ = tx.send(ExecutorCommand::Shutdown);
    }

    fn halt(&self) {
        self.halted.store(true, Ordering::Release);
        self.tx.lock().take();
    }

    fn wait_for_termination(&self, timeout: Duration) -> bool {
        if self.terminated.load(Ordering::Acquire) {
            return true;
        }
        if self.done_rx.recv_timeout(timeout).is_err() {
            return false;
        }
        self.terminated.store(true, Ordering::Release);
        self.join_worker();
        true
    }

    fn is_running(&self) -> bool {
        self.tx.lock().is_some()
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
        // A worker still busy at this point is detached rather than joined.
        if self.terminated.load(Ordering::Acquire) {
            self.join_worker();
        }
    }
}

impl std::fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("running", &self.is_running())
            .field("halted", &self.halted.load(Ordering::Relaxed))
            .finish()
    }
}
