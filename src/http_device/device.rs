//! The batching engine behind every HTTP log device.
//!
//! Producers only touch the send queue and post a send task; everything that
//! may block (formatting, serialization, the HTTP call) runs on the device's
//! executor. A timer posts the same send task every `batch_interval` so a
//! trickle of messages still gets delivered.

use std::{
    any::Any,
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    time::{Duration, Instant},
};

use crossbeam_channel::bounded;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use crate::{
    device::FemtoDeviceTrait,
    error::DeviceBuildError,
    executor::{IntervalTimer, TaskExecutor},
    formatter::SharedMessageFormatter,
    message::FemtoMessage,
    rate_limited_warner::RateLimitedWarner,
    send_queue::SendQueue,
};

use super::{
    batch::{BatchLimits, build_batch},
    builder::HttpDeviceBuilder,
    config::HttpDeviceConfig,
    endpoint::Endpoint,
    request::SharedRequestBuilder,
    stats::{DeviceStats, StatsSnapshot},
    transport::BatchTransport,
};

/// Lifecycle of a device's background machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceState {
    Stopped = 0,
    Running = 1,
    Stopping = 2,
}

impl DeviceState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Everything a device is assembled from.
pub(crate) struct DeviceParts {
    pub(crate) name: &'static str,
    pub(crate) endpoint: Endpoint,
    pub(crate) config: HttpDeviceConfig,
    pub(crate) formatter: SharedMessageFormatter,
    pub(crate) request_builder: SharedRequestBuilder,
    pub(crate) transport: Arc<dyn BatchTransport>,
}

/// State shared between the device handle and its send tasks.
struct DeviceCore {
    name: &'static str,
    endpoint: Endpoint,
    config: HttpDeviceConfig,
    limits: BatchLimits,
    queue: SendQueue,
    formatter: SharedMessageFormatter,
    request_builder: SharedRequestBuilder,
    transport: Arc<dyn BatchTransport>,
    last_send: Mutex<Instant>,
    send_lock: Mutex<()>,
    send_scheduled: AtomicBool,
    stats: DeviceStats,
    warner: RateLimitedWarner,
}

impl DeviceCore {
    fn batch_ready(&self) -> bool {
        self.queue.size() >= self.config.max_batch_size
            || self.last_send.lock().elapsed() >= self.config.batch_interval
    }

    /// Post a send task unless one is already waiting to run.
    fn schedule_send(core: &Arc<Self>, executor: &dyn TaskExecutor) {
        if core.send_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let task_core = Arc::clone(core);
        if !executor.post(Box::new(move || task_core.send_if_ready())) {
            core.send_scheduled.store(false, Ordering::Release);
        }
    }

    /// Send one batch if ready, then keep sending while full batches remain.
    /// Writes that pile up during a slow send only find the pending flag
    /// cleared once, so this task must not leave a full batch behind. The
    /// loop is bounded by the messages queued when it started.
    fn send_if_ready(&self) {
        self.send_scheduled.store(false, Ordering::Release);
        let _guard = self.send_lock.lock();
        if self.queue.is_empty() || !self.batch_ready() {
            return;
        }
        let mut remaining = self.queue.size();
        loop {
            let sent = self.dispatch_batch();
            remaining = remaining.saturating_sub(sent);
            if sent == 0 || remaining == 0 || self.queue.size() < self.config.max_batch_size {
                break;
            }
        }
    }

    /// Send batches until the messages queued at entry are gone or `deadline`
    /// passes. Readiness is ignored.
    fn drain(&self, deadline: Instant) {
        let _guard = self.send_lock.lock();
        let mut remaining = self.queue.size();
        while remaining > 0 && Instant::now() < deadline {
            let sent = self.dispatch_batch();
            if sent == 0 {
                break;
            }
            remaining = remaining.saturating_sub(sent);
        }
    }

    /// Assemble and deliver one batch; returns how many messages it held.
    fn dispatch_batch(&self) -> usize {
        let batch = build_batch(&self.queue, &self.formatter, self.limits);
        if batch.is_empty() {
            return 0;
        }
        let request = self.request_builder.build(&self.endpoint);
        // Stamped before the call so a slow send does not push the next
        // interval tick past its deadline.
        *self.last_send.lock() = Instant::now();
        let result = self.transport.send(&request, &batch.payload());

        let count = batch.len();
        self.stats
            .record_batch(count, batch.truncated(), result.is_ok());
        match result {
            Ok(()) => debug!(
                "{} delivered {count} messages to {}",
                self.name, request.endpoint
            ),
            Err(err) => warn!(
                "{} dropped a batch of {count} messages for {}: {err}",
                self.name, request.endpoint
            ),
        }
        count
    }

    fn warn_drops(&self, reason: &str) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("{} dropped {count} messages {reason}", self.name);
        });
    }
}

/// Executor and timer owned by a running device.
struct Runtime {
    executor: Arc<dyn TaskExecutor>,
    timer: IntervalTimer,
}

/// Log device shipping messages to an HTTP endpoint in JSON array batches.
///
/// The device starts lazily on the first [`write`](Self::write). Writes never
/// block on the network and never fail: a full queue drops the message and
/// counts it. Delivery is best effort and at most once; a failed batch is
/// logged and discarded.
pub struct FemtoHttpDevice {
    core: Arc<DeviceCore>,
    runtime: RwLock<Option<Runtime>>,
    lifecycle: Mutex<()>,
    state: AtomicU8,
    closed: AtomicBool,
}

impl FemtoHttpDevice {
    /// Construct a device for `endpoint` with the supplied options.
    pub fn new(endpoint: &str, config: HttpDeviceConfig) -> Result<Self, DeviceBuildError> {
        HttpDeviceBuilder::from_config(config)
            .with_endpoint(endpoint)
            .build()
    }

    /// Start configuring a device.
    pub fn builder() -> HttpDeviceBuilder {
        HttpDeviceBuilder::new()
    }

    pub(crate) fn from_parts(parts: DeviceParts) -> Self {
        let DeviceParts {
            name,
            endpoint,
            config,
            formatter,
            request_builder,
            transport,
        } = parts;
        let core = DeviceCore {
            name,
            limits: BatchLimits::from(&config),
            queue: SendQueue::new(config.max_queue_bytesize),
            warner: RateLimitedWarner::new(config.warn_interval),
            endpoint,
            config,
            formatter,
            request_builder,
            transport,
            last_send: Mutex::new(Instant::now()),
            send_lock: Mutex::new(()),
            send_scheduled: AtomicBool::new(false),
            stats: DeviceStats::default(),
        };
        Self {
            core: Arc::new(core),
            runtime: RwLock::new(None),
            lifecycle: Mutex::new(()),
            state: AtomicU8::new(DeviceState::Stopped as u8),
            closed: AtomicBool::new(false),
        }
    }

    /// Spawn the executor and the interval timer. A no-op while running.
    pub fn start(&self) -> io::Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("{} has been closed", self.core.name),
            ));
        }
        if self.state() == DeviceState::Running {
            return Ok(());
        }

        let executor = self.core.config.executor.spawn("femtobatch-send")?;
        *self.core.last_send.lock() = Instant::now();
        self.core.send_scheduled.store(false, Ordering::Release);

        let timer_core = Arc::clone(&self.core);
        let timer_executor = Arc::clone(&executor);
        let timer = IntervalTimer::start(
            "femtobatch-timer",
            self.core.config.batch_interval,
            move || DeviceCore::schedule_send(&timer_core, timer_executor.as_ref()),
        )
        .inspect_err(|_| executor.halt())?;

        *self.runtime.write() = Some(Runtime { executor, timer });
        self.set_state(DeviceState::Running);
        debug!("{} started for {}", self.core.name, self.core.endpoint);
        Ok(())
    }

    /// Queue `message` for delivery, starting the device if necessary.
    pub fn write(&self, message: impl Into<FemtoMessage>) {
        if self.closed.load(Ordering::Acquire) {
            self.core.stats.record_closed_drop();
            self.core.warn_drops("after the device was closed");
            return;
        }
        if self.state() != DeviceState::Running
            && let Err(err) = self.start()
        {
            warn!("{} failed to start: {err}", self.core.name);
        }
        if !self.core.queue.enqueue(message.into()) {
            self.core.stats.record_overflow();
            self.core.warn_drops("because the send queue was full");
            return;
        }
        self.core.stats.record_accepted();
        self.send();
    }

    /// Post a send task onto the executor. The task does nothing unless a
    /// batch is ready.
    pub fn send(&self) {
        let Some(executor) = self.executor() else {
            return;
        };
        DeviceCore::schedule_send(&self.core, executor.as_ref());
    }

    /// Whether a send would dispatch now: the queue holds a full batch, or
    /// `batch_interval` has elapsed since the last send attempt.
    pub fn batch_ready(&self) -> bool {
        self.core.batch_ready()
    }

    /// Deliver everything queued right now, ignoring readiness, and wait for
    /// the executor to finish. Returns `false` if the device is not running
    /// or the wait timed out.
    pub fn flush(&self) -> bool {
        self.core.warner.flush(|count| {
            warn!(
                "{} dropped {count} messages in the last interval",
                self.core.name
            );
        });
        let Some(executor) = self.executor() else {
            return false;
        };
        let timeout = self.flush_timeout();
        let deadline = Instant::now() + timeout;
        let (ack_tx, ack_rx) = bounded(1);
        let core = Arc::clone(&self.core);
        if !executor.post(Box::new(move || {
            core.drain(deadline);
            let _ = ack_tx.send(());
        })) {
            return false;
        }
        ack_rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .is_ok()
    }

    /// Stop the timer and the executor. Waits up to `shutdown_timeout` for a
    /// graceful exit, then halts and waits once more before giving up.
    pub fn stop(&self) {
        let _lifecycle = self.lifecycle.lock();
        if self.state() != DeviceState::Running {
            return;
        }
        self.set_state(DeviceState::Stopping);
        let Some(mut runtime) = self.runtime.write().take() else {
            self.set_state(DeviceState::Stopped);
            return;
        };

        let name = self.core.name;
        let timeout = self.core.config.shutdown_timeout;
        if !runtime.timer.stop(timeout) {
            warn!("{name}: timer did not stop within {timeout:?}");
        }
        if self.core.config.flush_on_stop {
            let core = Arc::clone(&self.core);
            let deadline = Instant::now() + timeout;
            runtime.executor.post(Box::new(move || core.drain(deadline)));
        }
        runtime.executor.shutdown();
        if !runtime.executor.wait_for_termination(timeout) {
            warn!("{name}: executor did not finish within {timeout:?}; halting");
            runtime.executor.halt();
            if !runtime.executor.wait_for_termination(timeout) {
                warn!("{name}: executor still busy after halt; detaching it");
            }
        }
        self.set_state(DeviceState::Stopped);
        debug!("{name} stopped");
    }

    /// Stop the device and release the transport. Later writes are dropped.
    pub fn close(&self) {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        self.stop();
        if first {
            self.core.transport.close();
            self.core.warner.flush(|count| {
                warn!(
                    "{} dropped {count} messages before closing",
                    self.core.name
                );
            });
        }
    }

    pub fn state(&self) -> DeviceState {
        DeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == DeviceState::Running
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of messages waiting to be sent.
    pub fn queue_size(&self) -> usize {
        self.core.queue.size()
    }

    /// Bytes accounted to queued messages.
    pub fn queued_bytesize(&self) -> usize {
        self.core.queue.bytesize()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats.snapshot()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.core.endpoint
    }

    pub fn config(&self) -> &HttpDeviceConfig {
        &self.core.config
    }

    fn executor(&self) -> Option<Arc<dyn TaskExecutor>> {
        self.runtime
            .read()
            .as_ref()
            .map(|runtime| Arc::clone(&runtime.executor))
    }

    fn set_state(&self, state: DeviceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// One `write_timeout` per batch currently queued.
    fn flush_timeout(&self) -> Duration {
        let batches = self
            .core
            .queue
            .size()
            .div_ceil(self.core.config.max_batch_size)
            .max(1);
        self.core
            .config
            .write_timeout
            .saturating_mul(u32::try_from(batches).unwrap_or(u32::MAX))
    }
}

impl FemtoDeviceTrait for FemtoHttpDevice {
    fn write(&self, message: FemtoMessage) {
        FemtoHttpDevice::write(self, message);
    }

    fn close(&self) {
        FemtoHttpDevice::close(self);
    }

    fn flush(&self) -> bool {
        FemtoHttpDevice::flush(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for FemtoHttpDevice {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FemtoHttpDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.core.name)
            .field("endpoint", &self.core.endpoint.to_string())
            .field("state", &self.state())
            .field("queue_size", &self.queue_size())
            .field("queued_bytesize", &self.queued_bytesize())
            .finish()
    }
}
