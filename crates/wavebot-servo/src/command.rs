//! Commands consumed by the servo worker, and gradual-move planning.

use std::time::Duration;

use wavebot_models::Channel;

/// Upper bound on the number of intermediate steps in one gradual move.
///
/// Tiny step sizes over long distances are widened to respect it.
pub const MAX_GRADUAL_STEPS: usize = 10_000;

/// A single unit of work for the servo worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Move a channel to an angle (clamped by the worker).
    SetAngle { channel: Channel, angle: f64 },
    /// Suspend the worker for a while.
    Sleep(Duration),
    /// Stop the worker. Nothing queued after it is executed.
    Shutdown,
}

impl Command {
    pub fn set_angle(channel: Channel, angle: f64) -> Self {
        Command::SetAngle { channel, angle }
    }
}

/// Ties a queued command to the gradual move that produced it, so a later
/// retarget on the same channel can void the steps that have not run yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lease {
    pub channel: Channel,
    pub epoch: u64,
}

/// A stepped move planned by the worker when it reaches the entry, starting
/// from whatever angle the channel holds at that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Walk {
    pub channel: Channel,
    pub target: f64,
    pub step: f64,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Task {
    Run(Command),
    Walk(Walk),
}

/// Queue entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Queued {
    pub task: Task,
    pub lease: Option<Lease>,
}

impl Queued {
    pub fn plain(command: Command) -> Self {
        Self {
            task: Task::Run(command),
            lease: None,
        }
    }

    pub fn leased(command: Command, lease: Lease) -> Self {
        Self {
            task: Task::Run(command),
            lease: Some(lease),
        }
    }

    pub fn walk(walk: Walk, lease: Lease) -> Self {
        Self {
            task: Task::Walk(walk),
            lease: Some(lease),
        }
    }
}

/// Expand a gradual move into `SetAngle`/`Sleep` pairs.
///
/// Walks from `from` toward `target` in increments of `|step|`, pausing
/// `delay` after each intermediate angle, and always ends with one exact
/// `SetAngle(target)`. A zero or non-finite step degenerates to that single
/// final command. Both endpoints are expected to be clamped already.
pub fn plan_gradual(
    channel: Channel,
    from: f64,
    target: f64,
    step: f64,
    delay: Duration,
) -> Vec<Command> {
    let mut commands = Vec::new();
    let distance = target - from;
    let step = step.abs();

    if step.is_finite() && step > 0.0 && distance.is_finite() && distance != 0.0 {
        let magnitude = step.max(distance.abs() / MAX_GRADUAL_STEPS as f64);
        let direction = distance.signum();

        // Each angle is computed from the start so rounding never accumulates.
        let mut k = 1u32;
        loop {
            let angle = from + direction * magnitude * f64::from(k);
            if (target - angle) * direction <= 0.0 {
                break;
            }
            commands.push(Command::set_angle(channel, angle));
            commands.push(Command::Sleep(delay));
            k += 1;
        }
    }

    commands.push(Command::set_angle(channel, target));
    commands
}
