//! Interactive command grammar for `servo-calibrate`.

use std::str::FromStr;

use thiserror::Error;
use wavebot_models::Channel;

/// One line typed at the calibration prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrateCommand {
    /// `<channel> <angle>`
    Set { channel: Channel, angle: f64 },
    /// `list`
    List,
    /// `center`
    Center,
    /// `quit` or `q`
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown channel '{0}' (try 'list')")]
    UnknownChannel(String),

    #[error("invalid angle '{0}'")]
    InvalidAngle(String),

    #[error("usage: <channel> <angle> | list | center | quit")]
    Usage,
}

impl FromStr for CalibrateCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Err(ParseCommandError::Empty);
        };

        let command = match first.to_lowercase().as_str() {
            "list" => CalibrateCommand::List,
            "center" => CalibrateCommand::Center,
            "quit" | "q" | "exit" => CalibrateCommand::Quit,
            _ => {
                let channel: Channel = first
                    .parse()
                    .map_err(|_| ParseCommandError::UnknownChannel(first.to_string()))?;
                let raw = words.next().ok_or(ParseCommandError::Usage)?;
                let angle: f64 = raw
                    .parse()
                    .ok()
                    .filter(|a: &f64| a.is_finite())
                    .ok_or_else(|| ParseCommandError::InvalidAngle(raw.to_string()))?;
                CalibrateCommand::Set { channel, angle }
            }
        };

        if words.next().is_some() {
            return Err(ParseCommandError::Usage);
        }
        Ok(command)
    }
}
