use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use wavebot_models::{Calibration, Channel};
use wavebot_rig::{init_tracing, CalibrateCommand};
use wavebot_servo::{ServoConfig, ServoController};

/// Move individual servos by hand to find calibration limits.
#[derive(Parser, Debug)]
#[command(name = "servo-calibrate", version, about)]
struct Args {
    /// Print channel names and PWM pins, then exit
    #[arg(long)]
    list_channels: bool,

    /// Channel to move (e.g. NECK_X)
    #[arg(long, requires = "angle")]
    channel: Option<Channel>,

    /// Target angle in degrees
    #[arg(long, requires = "channel", allow_negative_numbers = true)]
    angle: Option<f64>,

    /// Walk to the angle in small steps instead of jumping
    #[arg(long, requires = "channel")]
    gradual: bool,

    /// Center every channel
    #[arg(long)]
    center: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();
    init_tracing(args.log_file.as_deref())?;

    let config = ServoConfig::from_env();
    if args.list_channels {
        print_channels(&config.load_calibration()?);
        return Ok(());
    }

    let mut controller = ServoController::from_config(&config)?;
    controller.start()?;
    info!(backend = controller.backend_label(), "servo-calibrate ready");

    if args.center {
        controller.queue_center()?;
    }

    match (args.channel, args.angle) {
        (Some(channel), Some(angle)) => {
            if args.gradual {
                controller.queue_move_gradual(
                    channel,
                    angle,
                    config.gradual_step_degrees,
                    config.gradual_step_delay,
                )?;
            } else {
                controller.queue_set_angle(channel, angle)?;
            }
        }
        _ if args.center => {}
        _ => interactive(&controller).await?,
    }

    controller.stop().await?;
    print_positions(&controller);
    Ok(())
}

async fn interactive(controller: &ServoController) -> anyhow::Result<()> {
    println!("servo-calibrate: <channel> <angle> | list | center | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<CalibrateCommand>() {
            Ok(CalibrateCommand::Set { channel, angle }) => {
                let clamped = controller.calibration().clamp(channel, angle);
                controller.queue_set_angle(channel, angle)?;
                if clamped != angle {
                    println!("{channel} -> {clamped} (clamped from {angle})");
                } else {
                    println!("{channel} -> {clamped}");
                }
            }
            Ok(CalibrateCommand::List) => print_channels(controller.calibration()),
            Ok(CalibrateCommand::Center) => controller.queue_center()?,
            Ok(CalibrateCommand::Quit) => break,
            Err(e) => println!("{e}"),
        }
    }
    Ok(())
}

fn print_channels(calibration: &Calibration) {
    for (channel, limits) in calibration.channels().iter() {
        println!(
            "{:<12} pin {:>2}  min {:>5.1}  max {:>5.1}  center {:>5.1}",
            channel.as_str(),
            channel.pin(),
            limits.min,
            limits.max,
            limits.center
        );
    }
}

fn print_positions(controller: &ServoController) {
    for (channel, angle) in controller.positions().iter() {
        println!("{:<12} {:>6.1}", channel.as_str(), angle);
    }
}
