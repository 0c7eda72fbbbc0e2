//! Queued servo motion controller.
//!
//! A [`ServoController`] owns one unbounded FIFO and one worker task. The
//! tracking loop (or any other producer holding a [`ServoHandle`]) appends
//! commands without ever waiting on actuator timing; the worker applies them
//! in submission order.
//!
//! ```text
//!  Stopped ──start()──▶ Running ──stop()──▶ Draining ──worker exits──▶ Stopped
//! ```
//!
//! Two angle tables are kept:
//! - *applied*: last angle the worker wrote; only the worker mutates it
//! - *commanded*: last target a producer queued; the start point for
//!   gradual moves queued back to back

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use wavebot_models::{Calibration, Channel, ChannelMap};

use crate::command::{plan_gradual, Command, Lease, Queued, Walk};
use crate::config::ServoConfig;
use crate::error::{ServoError, ServoResult};
use crate::hardware::HardwareBackend;
use crate::positions::PositionTable;
use crate::worker::{self, WorkerStats};

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Stopped,
    Running,
    Draining,
}

/// State shared between the controller, its handles and the worker.
#[derive(Debug)]
pub(crate) struct Shared {
    pub calibration: Calibration,
    pub applied: PositionTable,
    pub commanded: PositionTable,
    /// Per-channel retarget generation; leased steps from older generations are skipped.
    epochs: ChannelMap<AtomicU64>,
    /// Present while the worker accepts commands. Held across each submission
    /// so queue order, `commanded` and retarget epochs always agree.
    sender: Mutex<Option<UnboundedSender<Queued>>>,
}

impl Shared {
    fn new(calibration: Calibration) -> Self {
        let pose = calibration.center_pose();
        Self {
            applied: PositionTable::new(&pose),
            commanded: PositionTable::new(&pose),
            epochs: ChannelMap::from_fn(|_| AtomicU64::new(0)),
            sender: Mutex::new(None),
            calibration,
        }
    }

    pub fn is_superseded(&self, lease: Lease) -> bool {
        self.epochs[lease.channel].load(Ordering::Acquire) != lease.epoch
    }

    fn current_lease(&self, channel: Channel) -> Lease {
        Lease {
            channel,
            epoch: self.epochs[channel].load(Ordering::Acquire),
        }
    }

    fn next_lease(&self, channel: Channel) -> Lease {
        Lease {
            channel,
            epoch: self.epochs[channel].fetch_add(1, Ordering::AcqRel) + 1,
        }
    }

    /// Build a batch and append it while holding the sender lock.
    ///
    /// `build` runs only once the controller is known to be running, so any
    /// table updates it makes are skipped for rejected requests. The batch
    /// lands in the queue contiguously with respect to other producers and
    /// to `stop()`.
    fn submit(&self, build: impl FnOnce(&Self) -> Vec<Queued>) -> ServoResult<()> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(ServoError::NotRunning)?;
        for queued in build(self) {
            tx.send(queued).map_err(|_| ServoError::NotRunning)?;
        }
        Ok(())
    }

    fn open(&self, tx: UnboundedSender<Queued>) {
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    /// Queue the shutdown sentinel and refuse everything after it.
    fn close(&self) -> bool {
        let mut guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(tx) => tx.send(Queued::plain(Command::Shutdown)).is_ok(),
            None => false,
        }
    }

    fn is_open(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Cloneable producer-side view of a controller.
///
/// Every `queue_*` call returns as soon as its commands are appended.
/// Calls fail with [`ServoError::NotRunning`] when the controller is not
/// running; out-of-range angles are never an error.
#[derive(Debug, Clone)]
pub struct ServoHandle {
    shared: Arc<Shared>,
}

impl ServoHandle {
    /// Queue an immediate move.
    pub fn queue_set_angle(&self, channel: Channel, angle: f64) -> ServoResult<()> {
        self.shared.submit(|shared| {
            shared
                .commanded
                .set(channel, shared.calibration.clamp(channel, angle));
            vec![Queued::plain(Command::set_angle(channel, angle))]
        })
    }

    /// Queue a stepped move from the channel's last commanded angle to `target`.
    pub fn queue_move_gradual(
        &self,
        channel: Channel,
        target: f64,
        step: f64,
        delay: Duration,
    ) -> ServoResult<()> {
        self.shared.submit(|shared| {
            let calibration = &shared.calibration;
            let from = calibration.clamp(channel, shared.commanded.get(channel));
            let target = calibration.clamp(channel, target);
            let lease = shared.current_lease(channel);

            let plan = plan_gradual(channel, from, target, step, delay);
            debug!(
                channel = %channel,
                from = from,
                target = target,
                commands = plan.len(),
                "Queueing gradual move"
            );
            shared.commanded.set(channel, target);
            plan.into_iter()
                .map(|command| Queued::leased(command, lease))
                .collect()
        })
    }

    /// Queue a stepped move that voids every not-yet-executed step of earlier
    /// gradual moves on this channel.
    ///
    /// The walk is planned when the worker reaches it, from the angle the
    /// channel holds at that moment, so immediate moves queued ahead of it
    /// still run first and the walk picks up where they left the servo.
    pub fn queue_retarget(
        &self,
        channel: Channel,
        target: f64,
        step: f64,
        delay: Duration,
    ) -> ServoResult<()> {
        self.shared.submit(|shared| {
            let target = shared.calibration.clamp(channel, target);
            let lease = shared.next_lease(channel);
            debug!(channel = %channel, epoch = lease.epoch, target = target, "Retargeting");
            shared.commanded.set(channel, target);
            vec![Queued::walk(
                Walk {
                    channel,
                    target,
                    step,
                    delay,
                },
                lease,
            )]
        })
    }

    /// Queue an immediate jump of every channel to its rest angle.
    pub fn queue_center(&self) -> ServoResult<()> {
        self.shared.submit(|shared| {
            let calibration = &shared.calibration;
            Channel::ALL
                .into_iter()
                .map(|channel| {
                    let center = calibration.center(channel);
                    shared.commanded.set(channel, center);
                    Queued::plain(Command::set_angle(channel, center))
                })
                .collect()
        })?;
        info!("Queued servo centering");
        Ok(())
    }

    /// Last angle applied by the worker.
    pub fn position(&self, channel: Channel) -> f64 {
        self.shared.applied.get(channel)
    }

    /// Last applied angle of every channel. May trail the queue.
    pub fn positions(&self) -> ChannelMap<f64> {
        self.shared.applied.snapshot()
    }

    /// Last target queued for every channel.
    pub fn commanded_positions(&self) -> ChannelMap<f64> {
        self.shared.commanded.snapshot()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.shared.calibration
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_open()
    }
}

/// Owner of the command queue, the worker task and the hardware backend.
pub struct ServoController {
    handle: ServoHandle,
    backend: Option<HardwareBackend>,
    backend_label: &'static str,
    worker: Option<JoinHandle<(HardwareBackend, WorkerStats)>>,
    state: ControllerState,
}

impl ServoController {
    pub fn new(calibration: Calibration, backend: HardwareBackend) -> Self {
        Self {
            handle: ServoHandle {
                shared: Arc::new(Shared::new(calibration)),
            },
            backend_label: backend.label(),
            backend: Some(backend),
            worker: None,
            state: ControllerState::Stopped,
        }
    }

    /// Load calibration and bring up the configured backend.
    pub fn from_config(config: &ServoConfig) -> ServoResult<Self> {
        let calibration = config.load_calibration()?;
        let backend = HardwareBackend::detect(config);
        Ok(Self::new(calibration, backend))
    }

    /// Spawn the worker on the current tokio runtime. No-op when running.
    ///
    /// Fails with [`ServoError::StillDraining`] when an earlier `stop()` was
    /// abandoned before the worker exited; call `stop()` again to finish it.
    pub fn start(&mut self) -> ServoResult<()> {
        match self.state {
            ControllerState::Running => return Ok(()),
            ControllerState::Draining => return Err(ServoError::StillDraining),
            ControllerState::Stopped => {}
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ServoError::NoRuntime)?;
        let backend = self
            .backend
            .take()
            .ok_or_else(|| ServoError::WorkerPanicked("hardware backend was lost".to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::clone(&self.handle.shared);
        self.handle.shared.open(tx);

        let task = runtime.spawn(
            worker::run(rx, backend, shared)
                .instrument(info_span!("servo_worker", backend = self.backend_label)),
        );
        self.worker = Some(task);
        self.state = ControllerState::Running;

        info!(backend = self.backend_label, "Servo controller started");
        Ok(())
    }

    /// Queue shutdown and wait for the worker to drain everything before it.
    ///
    /// Once this returns, every `queue_*` call fails with `NotRunning`.
    /// No-op when already stopped. If the returned future is dropped before
    /// the worker exits, the controller stays `Draining` and a later call
    /// resumes the wait.
    pub async fn stop(&mut self) -> ServoResult<WorkerStats> {
        match self.state {
            ControllerState::Stopped => return Ok(WorkerStats::default()),
            ControllerState::Running => {
                self.state = ControllerState::Draining;
                if !self.handle.shared.close() {
                    warn!("Servo worker exited before shutdown was queued");
                }
            }
            ControllerState::Draining => debug!("Resuming servo drain"),
        }

        // The handle stays in place until the worker has been joined.
        let Some(task) = self.worker.as_mut() else {
            self.state = ControllerState::Stopped;
            return Ok(WorkerStats::default());
        };
        let result = task.await;
        self.worker = None;
        self.state = ControllerState::Stopped;

        match result {
            Ok((backend, stats)) => {
                self.backend = Some(backend);
                info!(
                    applied = stats.applied,
                    faults = stats.faults,
                    "Servo controller stopped"
                );
                Ok(stats)
            }
            Err(e) => Err(ServoError::WorkerPanicked(e.to_string())),
        }
    }

    /// Producer handle sharing this controller's queue and tables.
    pub fn handle(&self) -> ServoHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn backend_label(&self) -> &'static str {
        self.backend_label
    }

    pub fn queue_set_angle(&self, channel: Channel, angle: f64) -> ServoResult<()> {
        self.handle.queue_set_angle(channel, angle)
    }

    pub fn queue_move_gradual(
        &self,
        channel: Channel,
        target: f64,
        step: f64,
        delay: Duration,
    ) -> ServoResult<()> {
        self.handle.queue_move_gradual(channel, target, step, delay)
    }

    pub fn queue_retarget(
        &self,
        channel: Channel,
        target: f64,
        step: f64,
        delay: Duration,
    ) -> ServoResult<()> {
        self.handle.queue_retarget(channel, target, step, delay)
    }

    pub fn queue_center(&self) -> ServoResult<()> {
        self.handle.queue_center()
    }

    pub fn position(&self, channel: Channel) -> f64 {
        self.handle.position(channel)
    }

    pub fn positions(&self) -> ChannelMap<f64> {
        self.handle.positions()
    }

    pub fn commanded_positions(&self) -> ChannelMap<f64> {
        self.handle.commanded_positions()
    }

    pub fn calibration(&self) -> &Calibration {
        self.handle.calibration()
    }
}

impl Drop for ServoController {
    fn drop(&mut self) {
        // The worker drains on its own once the sentinel is queued.
        if self.state == ControllerState::Running {
            self.handle.shared.close();
        }
    }
}
