//! Reader session state and counters

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a reader session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReaderState {
    Idle = 0,
    Initializing = 1,
    Polling = 2,
    /// Open failed and a reset pulse was issued
    ResetTriggered = 3,
    Stopped = 4,
}

impl From<u8> for ReaderState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Initializing,
            2 => Self::Polling,
            3 => Self::ResetTriggered,
            4 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReaderState::Idle => "idle",
            ReaderState::Initializing => "initializing",
            ReaderState::Polling => "polling",
            ReaderState::ResetTriggered => "reset-triggered",
            ReaderState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Atomic cell holding a [`ReaderState`]
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ReaderState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ReaderState {
        ReaderState::from(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: ReaderState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Counters for a reader session
#[derive(Debug, Default)]
pub struct ReaderStats {
    pub polls: AtomicU64,
    pub poll_errors: AtomicU64,
    pub tags_read: AtomicU64,
    pub decode_errors: AtomicU64,
    pub resets: AtomicU64,
}

impl ReaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tag(&self) {
        self.tags_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn get_poll_errors(&self) -> u64 {
        self.poll_errors.load(Ordering::Relaxed)
    }

    pub fn get_tags_read(&self) -> u64 {
        self.tags_read.load(Ordering::Relaxed)
    }

    pub fn get_decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    pub fn get_resets(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_tracks_transitions() {
        let cell = StateCell::new(ReaderState::Idle);
        for state in [
            ReaderState::Initializing,
            ReaderState::Polling,
            ReaderState::ResetTriggered,
            ReaderState::Stopped,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }
}
