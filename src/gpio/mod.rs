//! GPIO access for the reader reset line

pub mod reset;
#[cfg(feature = "rppal")]
pub mod rppal;
pub mod sim;

use std::fmt;

use thiserror::Error;

pub use reset::{ResetSequencer, ResetStep, RESET_PULSE};
pub use sim::SimulatedGpio;

/// Default chip name on Linux boards
pub const DEFAULT_CHIP: &str = "gpiochip0";

/// Logic level of an output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("low"),
            Level::High => f.write_str("high"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpioError {
    #[error("cannot open GPIO chip {chip}: {reason}")]
    Chip { chip: String, reason: String },

    #[error("cannot request line {pin} as output: {reason}")]
    Line { pin: u8, reason: String },

    #[error("cannot drive line {pin} {level}: {reason}")]
    SetLevel { pin: u8, level: Level, reason: String },
}

/// Opens GPIO chips by name
pub trait GpioBackend: Send + Sync {
    fn open_chip(&self, name: &str) -> Result<Box<dyn GpioChip>, GpioError>;
}

/// An open GPIO chip
pub trait GpioChip {
    fn request_output(&mut self, pin: u8, initial: Level) -> Result<Box<dyn OutputLine>, GpioError>;
}

/// A requested output line; dropping it releases the line
pub trait OutputLine {
    fn set_level(&mut self, level: Level) -> Result<(), GpioError>;
}
