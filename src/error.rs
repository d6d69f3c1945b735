//! Errors surfaced to callers of a reader session

use thiserror::Error;

use crate::nfc::DriverError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("cannot communicate with the device: {0}")]
    DeviceOpen(#[source] DriverError),

    #[error("cannot initialize the reader: {0}")]
    DeviceInit(#[source] DriverError),

    #[error("cannot close the reader: {0}")]
    DeviceClose(#[source] DriverError),

    #[error("reader is already listening")]
    AlreadyListening,
}

pub type ReaderResult<T> = Result<T, ReaderError>;
