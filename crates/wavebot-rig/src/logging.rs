//! Tracing subscriber setup shared by the binaries.
//!
//! `RUST_LOG` controls filtering on top of a `wavebot=info` default.
//! `LOG_FORMAT=json` switches to JSON lines; otherwise output is human
//! readable, with ANSI colors only when writing to the terminal.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter, Layer};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Logs go to stderr, or are appended to
/// `log_file` when given.
pub fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("wavebot=info".parse()?);

    let layer: BoxedLayer = match (log_file, use_json) {
        (Some(path), json) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let writer = Mutex::new(file);
            if json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            }
        }
        (None, true) => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        (None, false) => fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}
