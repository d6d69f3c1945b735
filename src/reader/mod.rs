//! Reader session and its state

pub mod session;
mod state;

pub use session::{ReaderSettings, TagReader, POLL_INTERVAL, POLL_PERIOD, TAG_CHANNEL_CAPACITY};
pub use state::{ReaderState, ReaderStats};
