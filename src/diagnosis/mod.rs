//! Diagnosis LED driven remotely through the `dropMessage` method.

pub mod led;

pub use led::{DiagnosisLed, GpioLed, LedPin, LoggingLed};

use std::fmt;

pub const DEFAULT_RECEIVER: &str = "LED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    pub fn is_on(self) -> bool {
        matches!(self, LedCommand::On)
    }
}

/// Reasons a `dropMessage` call is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    ArgumentCount(usize),
    NotAString(usize),
    WrongReceiver(String),
    UnknownMessage(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentCount(n) => write!(f, "expected 2 arguments, got {n}"),
            Self::NotAString(i) => write!(f, "argument {i} is not a string"),
            Self::WrongReceiver(r) => write!(f, "wrong receiver {r:?}"),
            Self::UnknownMessage(m) => write!(f, "wrong message {m:?}"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Validates a receiver/message pair. Matching is exact and case sensitive.
pub fn parse_command(
    expected_receiver: &str,
    receiver: &str,
    message: &str,
) -> Result<LedCommand, CommandError> {
    if receiver != expected_receiver {
        return Err(CommandError::WrongReceiver(receiver.to_string()));
    }
    match message {
        "ON" => Ok(LedCommand::On),
        "OFF" => Ok(LedCommand::Off),
        other => Err(CommandError::UnknownMessage(other.to_string())),
    }
}
