//! Controller behavior against a recording PWM sink.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_test::assert_ok;
use wavebot_models::{Calibration, Channel};
use wavebot_servo::{
    ControllerState, HardwareBackend, HwError, PwmSink, ServoController, ServoError,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Write {
    channel: Channel,
    angle: f64,
    at: Instant,
}

/// Records every write; optionally fails writes to some channels.
#[derive(Clone, Default)]
struct RecordingSink {
    writes: Arc<Mutex<Vec<Write>>>,
    failing: Arc<HashSet<Channel>>,
}

impl RecordingSink {
    fn failing_on(channels: &[Channel]) -> Self {
        Self {
            writes: Arc::default(),
            failing: Arc::new(channels.iter().copied().collect()),
        }
    }

    fn calls(&self) -> Vec<(Channel, f64)> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|w| (w.channel, w.angle))
            .collect()
    }

    fn angles_for(&self, channel: Channel) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter(|(ch, _)| *ch == channel)
            .map(|(_, angle)| angle)
            .collect()
    }

    fn timestamps(&self) -> Vec<Instant> {
        self.writes.lock().unwrap().iter().map(|w| w.at).collect()
    }
}

impl PwmSink for RecordingSink {
    fn set_pwm_duty_cycle(&mut self, channel: Channel, angle: f64) -> Result<(), HwError> {
        self.writes.lock().unwrap().push(Write {
            channel,
            angle,
            at: Instant::now(),
        });
        if self.failing.contains(&channel) {
            return Err(HwError::bus("remote I/O error"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn started(sink: &RecordingSink) -> ServoController {
    let mut controller =
        ServoController::new(Calibration::default(), HardwareBackend::physical(sink.clone()));
    controller.start().expect("controller should start inside a runtime");
    controller
}

#[tokio::test]
async fn test_applied_angle_is_clamped_request() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);
    let calibration = Calibration::default();

    let requests = [
        (Channel::NeckX, 500.0),
        (Channel::NeckY, -30.0),
        (Channel::EyeLeftX, 140.0),
        (Channel::EyeRightY, 61.5),
        (Channel::HandRight, 181.0),
    ];
    for (channel, angle) in requests {
        controller.queue_set_angle(channel, angle).unwrap();
    }
    controller.stop().await.unwrap();

    for (channel, angle) in requests {
        let expected = calibration.clamp(channel, angle);
        assert_eq!(controller.position(channel), expected, "{channel}");
        assert_eq!(sink.angles_for(channel), vec![expected], "{channel}");
    }
}

#[tokio::test]
async fn test_commands_reach_sink_in_submission_order() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    controller.queue_set_angle(Channel::NeckX, 60.0).unwrap();
    controller.queue_set_angle(Channel::EyeLeftX, 130.0).unwrap();
    controller.queue_set_angle(Channel::NeckX, 90.0).unwrap();
    controller.stop().await.unwrap();

    assert_eq!(
        sink.calls(),
        vec![
            (Channel::NeckX, 60.0),
            (Channel::EyeLeftX, 130.0),
            (Channel::NeckX, 90.0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_gradual_move_ends_exactly_on_clamped_target() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    // 74 -> 110 (clamped from 200) in steps of 7: 81, 88, 95, 102, 109, then 110.
    controller
        .queue_move_gradual(Channel::NeckX, 200.0, 7.0, Duration::from_millis(15))
        .unwrap();
    let stats = controller.stop().await.unwrap();

    assert_eq!(
        sink.angles_for(Channel::NeckX),
        vec![81.0, 88.0, 95.0, 102.0, 109.0, 110.0]
    );
    assert_eq!(controller.position(Channel::NeckX), 110.0);
    assert_eq!(stats.sleeps, 5);
}

#[tokio::test(start_paused = true)]
async fn test_gradual_steps_are_spaced_by_delay() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);
    let delay = Duration::from_millis(40);

    controller
        .queue_move_gradual(Channel::HandRight, 100.0, 2.5, delay)
        .unwrap();
    controller.stop().await.unwrap();

    let stamps = sink.timestamps();
    assert_eq!(stamps.len(), 4);
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= delay);
    }
}

#[tokio::test(start_paused = true)]
async fn test_producer_never_waits_for_sleeps() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    let before = Instant::now();
    controller
        .queue_move_gradual(Channel::HandRight, 0.0, 1.0, Duration::from_secs(1))
        .unwrap();
    controller.queue_set_angle(Channel::NeckX, 50.0).unwrap();
    assert_eq!(Instant::now(), before);

    controller.stop().await.unwrap();
    assert!(Instant::now() - before >= Duration::from_secs(89));
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_gradual_moves_chain_from_commanded_angle() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);
    let delay = Duration::from_millis(5);

    controller
        .queue_move_gradual(Channel::HandRight, 80.0, 5.0, delay)
        .unwrap();
    controller
        .queue_move_gradual(Channel::HandRight, 95.0, 5.0, delay)
        .unwrap();
    controller.stop().await.unwrap();

    assert_eq!(
        sink.angles_for(Channel::HandRight),
        vec![85.0, 80.0, 85.0, 90.0, 95.0]
    );
}

#[tokio::test]
async fn test_center_is_one_jump_per_channel_in_fixed_order() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);
    let calibration = Calibration::default();

    controller.queue_set_angle(Channel::NeckX, 30.0).unwrap();
    controller.queue_set_angle(Channel::EyeLeftY, 60.0).unwrap();
    controller.queue_center().unwrap();
    controller.stop().await.unwrap();

    let calls = sink.calls();
    let centering = &calls[2..];
    let expected: Vec<(Channel, f64)> = Channel::ALL
        .into_iter()
        .map(|ch| (ch, calibration.center(ch)))
        .collect();
    assert_eq!(centering, expected.as_slice());
    assert_eq!(controller.positions(), calibration.center_pose());
}

#[tokio::test]
async fn test_stop_drains_queue_then_rejects() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);
    let handle = controller.handle();

    assert_ok!(controller.queue_set_angle(Channel::EyeLeftX, 110.0));
    assert_ok!(controller.queue_set_angle(Channel::EyeRightX, 150.0));
    assert_ok!(handle.queue_set_angle(Channel::NeckY, 35.0));

    let stats = controller.stop().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(stats.applied, 3);
    assert_eq!(sink.calls().len(), 3);

    assert!(matches!(
        controller.queue_set_angle(Channel::NeckX, 80.0),
        Err(ServoError::NotRunning)
    ));
    assert!(matches!(
        handle.queue_move_gradual(Channel::NeckX, 80.0, 1.0, Duration::ZERO),
        Err(ServoError::NotRunning)
    ));
    assert_eq!(sink.calls().len(), 3);
}

#[tokio::test]
async fn test_channel_fault_does_not_stall_queue() {
    let sink = RecordingSink::failing_on(&[Channel::NeckY]);
    let mut controller = started(&sink);

    controller.queue_set_angle(Channel::NeckY, 30.0).unwrap();
    controller.queue_set_angle(Channel::NeckX, 90.0).unwrap();
    controller.queue_set_angle(Channel::NeckY, 10.0).unwrap();
    let stats = controller.stop().await.unwrap();

    assert_eq!(stats.faults, 2);
    assert_eq!(stats.applied, 3);
    // Optimistic update: the faulted channel still records the command.
    assert_eq!(controller.position(Channel::NeckY), 10.0);
    assert_eq!(controller.position(Channel::NeckX), 90.0);
}

#[tokio::test(start_paused = true)]
async fn test_retarget_voids_pending_gradual_steps() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    // The worker has not run yet on this single-threaded runtime, so the
    // whole first move is still queued when the retarget arrives.
    controller
        .queue_move_gradual(Channel::NeckX, 110.0, 1.0, Duration::from_millis(10))
        .unwrap();
    controller
        .queue_retarget(Channel::NeckX, 30.0, 10.0, Duration::ZERO)
        .unwrap();
    let stats = controller.stop().await.unwrap();

    assert_eq!(
        sink.angles_for(Channel::NeckX),
        vec![64.0, 54.0, 44.0, 34.0, 30.0]
    );
    assert_eq!(stats.superseded, 71);
    assert_eq!(stats.sleeps, 4);
    assert_eq!(controller.position(Channel::NeckX), 30.0);
}

#[tokio::test(start_paused = true)]
async fn test_retarget_continues_from_queued_set_angle() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    controller.queue_set_angle(Channel::NeckX, 110.0).unwrap();
    controller
        .queue_retarget(Channel::NeckX, 100.0, 2.0, Duration::from_millis(10))
        .unwrap();
    let stats = controller.stop().await.unwrap();

    // No jump back to the angle applied before the immediate move.
    assert_eq!(
        sink.angles_for(Channel::NeckX),
        vec![110.0, 108.0, 106.0, 104.0, 102.0, 100.0]
    );
    assert_eq!(stats.superseded, 0);
}

#[tokio::test(start_paused = true)]
async fn test_retarget_cuts_short_a_walk_in_progress() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    controller
        .queue_retarget(Channel::NeckX, 110.0, 1.0, Duration::from_millis(10))
        .unwrap();
    // Writes land at 0, 10, 20 and 30 ms; the worker is asleep until 40 ms.
    tokio::time::sleep(Duration::from_millis(35)).await;
    controller
        .queue_retarget(Channel::NeckX, 30.0, 10.0, Duration::ZERO)
        .unwrap();
    let stats = controller.stop().await.unwrap();

    assert_eq!(
        sink.angles_for(Channel::NeckX),
        vec![75.0, 76.0, 77.0, 78.0, 68.0, 58.0, 48.0, 38.0, 30.0]
    );
    assert_eq!(stats.superseded, 63);
    assert_eq!(controller.commanded_positions()[Channel::NeckX], 30.0);
}

#[tokio::test(start_paused = true)]
async fn test_retarget_leaves_other_channels_alone() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);
    let delay = Duration::from_millis(10);

    controller
        .queue_move_gradual(Channel::HandRight, 100.0, 5.0, delay)
        .unwrap();
    controller.queue_set_angle(Channel::NeckX, 50.0).unwrap();
    controller
        .queue_retarget(Channel::EyeLeftX, 150.0, 100.0, Duration::ZERO)
        .unwrap();
    controller.stop().await.unwrap();

    assert_eq!(sink.angles_for(Channel::HandRight), vec![95.0, 100.0]);
    assert_eq!(sink.angles_for(Channel::NeckX), vec![50.0]);
    assert_eq!(sink.angles_for(Channel::EyeLeftX), vec![150.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_producers_lose_nothing() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    let producers: Vec<_> = (0..4)
        .map(|i| {
            let handle = controller.handle();
            std::thread::spawn(move || {
                for n in 0..50 {
                    let angle = 20.0 + f64::from(i * 50 + n) * 0.1;
                    handle.queue_set_angle(Channel::NeckX, angle).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let stats = controller.stop().await.unwrap();
    assert_eq!(stats.applied, 200);
    assert_eq!(sink.calls().len(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_commanded_agrees_with_queue_order_under_contention() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    let producers: Vec<_> = (0..4)
        .map(|i| {
            let handle = controller.handle();
            std::thread::spawn(move || {
                for n in 0..50 {
                    let angle = 20.0 + f64::from(i * 50 + n) * 0.4;
                    if n % 2 == 0 {
                        handle.queue_set_angle(Channel::NeckX, angle).unwrap();
                    } else {
                        handle
                            .queue_move_gradual(Channel::NeckX, angle, 5.0, Duration::ZERO)
                            .unwrap();
                    }
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let commanded = controller.commanded_positions()[Channel::NeckX];
    controller.stop().await.unwrap();

    // The last batch in the queue belongs to whichever producer updated
    // the commanded table last.
    assert_eq!(controller.position(Channel::NeckX), commanded);
    assert_eq!(sink.angles_for(Channel::NeckX).last(), Some(&commanded));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_stop_can_be_resumed() {
    let sink = RecordingSink::default();
    let mut controller = started(&sink);

    controller
        .queue_move_gradual(Channel::NeckX, 110.0, 1.0, Duration::from_secs(1))
        .unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(10), controller.stop()).await;
    assert!(abandoned.is_err());
    assert_eq!(controller.state(), ControllerState::Draining);
    assert!(matches!(controller.start(), Err(ServoError::StillDraining)));
    assert!(matches!(
        controller.queue_set_angle(Channel::NeckY, 20.0),
        Err(ServoError::NotRunning)
    ));

    let stats = controller.stop().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(stats.applied, 36);
    assert_eq!(controller.position(Channel::NeckX), 110.0);

    // The backend came back with the worker.
    assert_ok!(controller.start());
    controller.queue_set_angle(Channel::NeckY, 20.0).unwrap();
    controller.stop().await.unwrap();
    assert_eq!(controller.position(Channel::NeckY), 20.0);
}

#[tokio::test]
async fn test_simulated_backend_is_transparent() {
    let mut controller = ServoController::new(Calibration::default(), HardwareBackend::simulated());
    controller.start().unwrap();
    controller.queue_set_angle(Channel::NeckX, 95.0).unwrap();
    controller
        .queue_move_gradual(Channel::EyeRightX, 170.0, 10.0, Duration::ZERO)
        .unwrap();
    let stats = controller.stop().await.unwrap();

    assert_eq!(stats.faults, 0);
    assert_eq!(controller.position(Channel::NeckX), 95.0);
    assert_eq!(controller.position(Channel::EyeRightX), 170.0);
}
