//! Reader driver seam
//!
//! The radio protocol itself lives behind these traits. A driver opens
//! devices by connection string; a device polls for one target at a time.

use std::time::Duration;

use thiserror::Error;

use super::modulation::Modulation;
use super::target::Target;

/// Errors reported by a driver backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("no reader device found")]
    NoDevice,

    #[error("device '{0}' not available")]
    DeviceNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("operation timed out")]
    Timeout,

    #[error("device already closed")]
    Closed,
}

/// Opens reader devices
pub trait NfcDriver: Send + Sync {
    /// Open a device; an empty `connection` picks the first available one.
    fn open(&self, connection: &str) -> Result<Box<dyn NfcDevice>, DriverError>;
}

/// An open reader device
pub trait NfcDevice: Send {
    fn name(&self) -> &str;

    /// Put the device into initiator (reader) mode
    fn initiator_init(&mut self) -> Result<(), DriverError>;

    /// Try each modulation `poll_count` times, waiting up to `period` per try.
    ///
    /// Returns the first target found, or `None` if nothing answered.
    fn poll_target(
        &mut self,
        modulations: &[Modulation],
        poll_count: u8,
        period: Duration,
    ) -> Result<Option<Target>, DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;
}
