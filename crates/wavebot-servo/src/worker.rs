//! The servo worker: the single consumer of the command queue.
//!
//! Pops one command at a time, strictly FIFO, and is the only code that
//! writes the applied-position table or touches the hardware backend.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use wavebot_models::Channel;

use crate::command::{plan_gradual, Command, Lease, Queued, Task};
use crate::controller::Shared;
use crate::error::ServoError;
use crate::hardware::HardwareBackend;

/// Counters for one worker run, returned by `stop()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// `SetAngle` commands written to the position table
    pub applied: u64,
    /// Sink writes that failed
    pub faults: u64,
    /// `Sleep` commands honored
    pub sleeps: u64,
    /// Steps skipped because a retarget replaced their move
    pub superseded: u64,
}

pub(crate) async fn run(
    mut rx: UnboundedReceiver<Queued>,
    mut backend: HardwareBackend,
    shared: Arc<Shared>,
) -> (HardwareBackend, WorkerStats) {
    let mut stats = WorkerStats::default();
    info!(backend = backend.label(), "Servo worker started");

    while let Some(queued) = rx.recv().await {
        if is_superseded(&shared, &mut stats, queued.lease) {
            continue;
        }

        match queued.task {
            Task::Run(Command::Shutdown) => {
                debug!("Shutdown command received");
                break;
            }
            Task::Run(command) => execute(&mut backend, &shared, &mut stats, command).await,
            Task::Walk(walk) => {
                let from = shared.applied.get(walk.channel);
                let plan = plan_gradual(walk.channel, from, walk.target, walk.step, walk.delay);
                debug!(
                    channel = %walk.channel,
                    from = from,
                    target = walk.target,
                    commands = plan.len(),
                    "Starting retarget walk"
                );
                for command in plan {
                    // A newer retarget on this channel cuts the walk short.
                    if is_superseded(&shared, &mut stats, queued.lease) {
                        continue;
                    }
                    execute(&mut backend, &shared, &mut stats, command).await;
                }
            }
        }
    }

    info!(
        applied = stats.applied,
        faults = stats.faults,
        superseded = stats.superseded,
        "Servo worker stopped"
    );
    (backend, stats)
}

fn is_superseded(shared: &Shared, stats: &mut WorkerStats, lease: Option<Lease>) -> bool {
    let Some(lease) = lease else {
        return false;
    };
    if !shared.is_superseded(lease) {
        return false;
    }
    stats.superseded += 1;
    metrics::counter!("servo_commands_superseded_total").increment(1);
    debug!(channel = %lease.channel, epoch = lease.epoch, "Skipping superseded step");
    true
}

async fn execute(
    backend: &mut HardwareBackend,
    shared: &Shared,
    stats: &mut WorkerStats,
    command: Command,
) {
    match command {
        Command::SetAngle { channel, angle } => apply(backend, shared, stats, channel, angle),
        Command::Sleep(duration) => {
            tokio::time::sleep(duration).await;
            stats.sleeps += 1;
        }
        // Handled by the receive loop; plans never contain it.
        Command::Shutdown => {}
    }
}

fn apply(
    backend: &mut HardwareBackend,
    shared: &Shared,
    stats: &mut WorkerStats,
    channel: Channel,
    requested: f64,
) {
    let angle = shared.calibration.clamp(channel, requested);
    let old = shared.applied.get(channel);

    // Updated before the write: a faulted channel still reports where it was told to go.
    shared.applied.set(channel, angle);
    stats.applied += 1;

    debug!(
        channel = %channel,
        old = old,
        new = angle,
        requested = requested,
        hw = backend.is_physical(),
        "set_servo_angle"
    );
    metrics::counter!("servo_commands_applied_total", "channel" => channel.as_str()).increment(1);
    metrics::gauge!("servo_position_degrees", "channel" => channel.as_str()).set(angle);

    if let Err(e) = backend.write(channel, angle) {
        stats.faults += 1;
        metrics::counter!("servo_channel_faults_total", "channel" => channel.as_str()).increment(1);
        warn!(angle = angle, "{}", ServoError::channel_fault(channel, e));
    }
}
