//! Scripted reader driver
//!
//! Plays back a queue of poll results. Used by the tests and by the binary
//! when no hardware driver is linked in.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::driver::{DriverError, NfcDevice, NfcDriver};
use super::modulation::{BaudRate, Modulation, Technology};
use super::target::{Target, TargetInfo};

/// One scripted poll outcome
#[derive(Debug, Clone)]
pub enum SimEvent {
    Detect(Target),
    Nothing,
    PollError(DriverError),
}

#[derive(Debug, Default)]
struct SimShared {
    script: Mutex<VecDeque<SimEvent>>,
    open_failures: AtomicUsize,
    init_failures: AtomicUsize,
    opens: AtomicUsize,
    polls: AtomicUsize,
    closes: AtomicUsize,
}

/// Driver whose devices replay a shared script
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    shared: Arc<SimShared>,
    poll_delay: Duration,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(targets: impl IntoIterator<Item = Target>) -> Self {
        let driver = Self::new();
        for target in targets {
            driver.push(SimEvent::Detect(target));
        }
        driver
    }

    /// Time each poll takes, standing in for the per-attempt timeout
    pub fn poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Fail the next `count` opens
    pub fn fail_opens(self, count: usize) -> Self {
        self.shared.open_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Fail the next `count` initiator setups
    pub fn fail_inits(self, count: usize) -> Self {
        self.shared.init_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn push(&self, event: SimEvent) {
        lock_script(&self.shared).push_back(event);
    }

    pub fn remaining(&self) -> usize {
        lock_script(&self.shared).len()
    }

    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.shared.polls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

fn lock_script(shared: &SimShared) -> std::sync::MutexGuard<'_, VecDeque<SimEvent>> {
    shared.script.lock().unwrap_or_else(|e| e.into_inner())
}

/// Decrement a failure budget; true if this call should fail
fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl NfcDriver for SimulatedDriver {
    fn open(&self, connection: &str) -> Result<Box<dyn NfcDevice>, DriverError> {
        let name = match connection {
            "" => "sim:0".to_string(),
            c if c == "sim" || c.starts_with("sim:") => c.to_string(),
            other => return Err(DriverError::DeviceNotFound(other.to_string())),
        };

        if take_failure(&self.shared.open_failures) {
            return Err(DriverError::Io(format!("{}: no response from reader", name)));
        }

        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        debug!("Opened simulated reader {}", name);

        Ok(Box::new(SimulatedDevice {
            name,
            shared: self.shared.clone(),
            poll_delay: self.poll_delay,
            closed: false,
        }))
    }
}

struct SimulatedDevice {
    name: String,
    shared: Arc<SimShared>,
    poll_delay: Duration,
    closed: bool,
}

impl NfcDevice for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn initiator_init(&mut self) -> Result<(), DriverError> {
        if take_failure(&self.shared.init_failures) {
            return Err(DriverError::Io("initiator setup rejected".to_string()));
        }
        Ok(())
    }

    fn poll_target(
        &mut self,
        modulations: &[Modulation],
        _poll_count: u8,
        _period: Duration,
    ) -> Result<Option<Target>, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.shared.polls.fetch_add(1, Ordering::SeqCst);

        if !self.poll_delay.is_zero() {
            thread::sleep(self.poll_delay);
        }

        match lock_script(&self.shared).pop_front() {
            // A real reader only answers on modulations it was asked for,
            // but the script replays whatever it holds so dispatch can be tested.
            Some(SimEvent::Detect(target)) => {
                if !modulations.contains(&target.modulation()) {
                    debug!("Scripted target outside requested modulations: {}", target.modulation());
                }
                Ok(Some(target))
            }
            Some(SimEvent::PollError(e)) => Err(e),
            Some(SimEvent::Nothing) | None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.closed = true;
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Parse scripted detections: `technology@baud:hexbytes[/declared_len]`, comma separated.
///
/// Example: `a@106:01020304,felica@424:0102030405060708`
pub fn parse_sim_targets(script: &str) -> Result<Vec<Target>, String> {
    script
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_sim_target)
        .collect()
}

fn parse_sim_target(entry: &str) -> Result<Target, String> {
    let (modulation, data) = entry
        .split_once(':')
        .ok_or_else(|| format!("'{}': expected technology@baud:hex", entry))?;
    let (technology, baud) = modulation
        .split_once('@')
        .ok_or_else(|| format!("'{}': expected technology@baud", modulation))?;
    let technology: Technology = technology.parse()?;
    let baud_rate: BaudRate = baud.parse()?;

    let (hex_part, declared) = match data.split_once('/') {
        Some((h, len)) => (
            h,
            Some(len.trim().parse::<usize>().map_err(|e| format!("'{}': {}", len, e))?),
        ),
        None => (data, None),
    };
    let bytes = hex::decode(hex_part.trim()).map_err(|e| format!("'{}': {}", hex_part, e))?;

    let info = match technology {
        Technology::Iso14443a => {
            let mut uid = [0u8; 10];
            copy_prefix(&mut uid, &bytes);
            TargetInfo::Iso14443a {
                atqa: [0x00, 0x44],
                sak: 0x00,
                uid,
                uid_len: declared.unwrap_or_else(|| bytes.len().min(10)),
            }
        }
        Technology::Iso14443b => {
            let mut application_data = [0u8; 4];
            copy_prefix(&mut application_data, &bytes);
            TargetInfo::Iso14443b {
                pupi: [0u8; 4],
                application_data,
                protocol_info: [0u8; 3],
            }
        }
        Technology::Felica => {
            let mut id = [0u8; 8];
            copy_prefix(&mut id, &bytes);
            TargetInfo::Felica {
                len: declared.unwrap_or_else(|| bytes.len().min(8)),
                res_code: 0x01,
                id,
                pad: [0u8; 8],
                sys_code: [0xFF, 0xFF],
            }
        }
        Technology::Jewel => {
            let mut id = [0u8; 4];
            copy_prefix(&mut id, &bytes);
            TargetInfo::Jewel {
                sens_res: [0x0C, 0x00],
                id,
            }
        }
        Technology::Iso14443bIClass => {
            let mut uid = [0u8; 8];
            copy_prefix(&mut uid, &bytes);
            TargetInfo::Iso14443bIClass { uid }
        }
        other => TargetInfo::Other {
            technology: other,
            raw: bytes,
        },
    };

    Ok(Target::new(baud_rate, info))
}

fn copy_prefix(dst: &mut [u8], src: &[u8]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}
