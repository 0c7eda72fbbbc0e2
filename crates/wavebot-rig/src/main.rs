//! Face-tracking rig binary.
//!
//! Reads newline-delimited detection records from stdin (piped from the
//! face detector) and drives the servos until EOF or Ctrl-C.

use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use wavebot_rig::{init_tracing, DetectionRecord};
use wavebot_servo::{ServoConfig, ServoController};
use wavebot_tracking::{AngleMapper, TrackingConfig, TrackingSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing(None)?;

    info!("Starting wavebot");

    let servo_config = ServoConfig::from_env();
    let tracking_config = TrackingConfig::from_env();
    info!("Servo config: {:?}", servo_config);
    info!("Tracking config: {:?}", tracking_config);

    let mut controller = ServoController::from_config(&servo_config)?;
    controller.start()?;
    controller.queue_center()?;

    let mapper = AngleMapper::new(
        tracking_config.load_mapper()?,
        controller.calibration().clone(),
    );
    let mut session = TrackingSession::new(&tracking_config, mapper, Instant::now());
    let servos = controller.handle();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Detection stream closed");
                    break;
                };
                let record = match DetectionRecord::parse_line(&line) {
                    Ok(Some(record)) => record,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Skipping malformed detection record: {}", e);
                        continue;
                    }
                };

                let frame = record.frame(tracking_config.frame);
                session.process_frame(|| record.faces, frame, Instant::now(), &servos)?;
            }
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    let stats = controller.stop().await?;
    info!(
        frames = session.frame_count(),
        applied = stats.applied,
        faults = stats.faults,
        "wavebot stopped"
    );
    Ok(())
}
