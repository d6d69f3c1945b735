//! NFC tag capture
//!
//! Polls a contactless reader across a fixed modulation catalog, decodes the
//! UID of each detected tag and streams it over a bounded channel. A stuck
//! reader can be power-cycled through a GPIO reset line.

pub mod config;
pub mod error;
pub mod gpio;
pub mod nfc;
pub mod reader;
pub mod shutdown;

pub use error::{ReaderError, ReaderResult};
pub use nfc::TagUid;
pub use reader::{ReaderSettings, ReaderState, TagReader};
pub use shutdown::Shutdown;
