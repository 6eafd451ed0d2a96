//! Periodic timer driving time-based flushes.
//!
//! The timer thread only sleeps and invokes its callback; the callback is
//! expected to post real work onto the device's executor.

use std::{
    io,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};

/// Fires a callback every `interval` until stopped.
pub struct IntervalTimer {
    stop_tx: Option<Sender<()>>,
    done_rx: crossbeam_channel::Receiver<()>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl IntervalTimer {
    /// Start a timer thread named `name` calling `tick` every `interval`.
    pub fn start<F>(name: &str, interval: Duration, tick: F) -> io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded(1);
        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            let _ = done_tx.send(());
        })?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            done_rx,
            handle: Some(handle),
            interval,
        })
    }

    /// Period between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop ticking and wait up to `timeout` for the timer thread to exit.
    ///
    /// Returns `false` if the thread was still running a tick when the wait
    /// expired; it is detached in that case and exits after the tick.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        let Some(stop_tx) = self.stop_tx.take() else {
            return true;
        };
        let _ = stop_tx.try_send(());
        drop(stop_tx);
        if self.done_rx.recv_timeout(timeout).is_err() {
            self.handle.take();
            return false;
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("IntervalTimer: timer thread panicked");
        }
        true
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.stop(Duration::ZERO);
    }
}

impl std::fmt::Debug for IntervalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("interval", &self.interval)
            .field("running", &self.stop_tx.is_some())
            .finish()
    }
}
