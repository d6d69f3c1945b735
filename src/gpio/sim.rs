//! GPIO backend that records operations instead of touching hardware

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::debug;

use super::{GpioBackend, GpioChip, GpioError, Level, OutputLine};

/// A recorded GPIO operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioOp {
    OpenChip(String),
    Request { pin: u8, initial: Level },
    Set { pin: u8, level: Level },
    Release { pin: u8 },
}

#[derive(Debug, Default)]
struct Recorder {
    ops: Vec<GpioOp>,
    set_times: Vec<Instant>,
    set_attempts: usize,
    fail_open: bool,
    fail_set_at: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedGpio {
    recorder: Arc<Mutex<Recorder>>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every chip open fail
    pub fn fail_open(self) -> Self {
        self.lock().fail_open = true;
        self
    }

    /// Fail the `index`-th level change (zero based)
    pub fn fail_set_at(self, index: usize) -> Self {
        self.lock().fail_set_at = Some(index);
        self
    }

    pub fn ops(&self) -> Vec<GpioOp> {
        self.lock().ops.clone()
    }

    /// Levels successfully driven, in order
    pub fn level_changes(&self) -> Vec<Level> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                GpioOp::Set { level, .. } => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn set_times(&self) -> Vec<Instant> {
        self.lock().set_times.clone()
    }

    /// Number of completed or aborted reset attempts (chip opens)
    pub fn chip_opens(&self) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| matches!(op, GpioOp::OpenChip(_)))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        self.recorder.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl GpioBackend for SimulatedGpio {
    fn open_chip(&self, name: &str) -> Result<Box<dyn GpioChip>, GpioError> {
        let mut rec = self.lock();
        rec.ops.push(GpioOp::OpenChip(name.to_string()));
        if rec.fail_open {
            return Err(GpioError::Chip {
                chip: name.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        debug!("Opened simulated GPIO chip {}", name);
        Ok(Box::new(SimChip {
            recorder: self.recorder.clone(),
        }))
    }
}

struct SimChip {
    recorder: Arc<Mutex<Recorder>>,
}

impl GpioChip for SimChip {
    fn request_output(&mut self, pin: u8, initial: Level) -> Result<Box<dyn OutputLine>, GpioError> {
        let mut rec = self.recorder.lock().unwrap_or_else(|e| e.into_inner());
        rec.ops.push(GpioOp::Request { pin, initial });
        Ok(Box::new(SimLine {
            pin,
            recorder: self.recorder.clone(),
        }))
    }
}

struct SimLine {
    pin: u8,
    recorder: Arc<Mutex<Recorder>>,
}

impl OutputLine for SimLine {
    fn set_level(&mut self, level: Level) -> Result<(), GpioError> {
        let mut rec = self.recorder.lock().unwrap_or_else(|e| e.into_inner());
        let attempt = rec.set_attempts;
        rec.set_attempts += 1;
        if rec.fail_set_at == Some(attempt) {
            return Err(GpioError::SetLevel {
                pin: self.pin,
                level,
                reason: "simulated failure".to_string(),
            });
        }
        rec.ops.push(GpioOp::Set {
            pin: self.pin,
            level,
        });
        rec.set_times.push(Instant::now());
        Ok(())
    }
}

impl Drop for SimLine {
    fn drop(&mut self) {
        let mut rec = self.recorder.lock().unwrap_or_else(|e| e.into_inner());
        rec.ops.push(GpioOp::Release { pin: self.pin });
    }
}
