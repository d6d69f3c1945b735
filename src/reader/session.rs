//! Reader session: device ownership, poll loop and reset wiring

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::error::{ReaderError, ReaderResult};
use crate::gpio::{GpioBackend, ResetSequencer, ResetStep, DEFAULT_CHIP, RESET_PULSE};
use crate::nfc::{decode_target, ModulationCatalog, NfcDevice, NfcDriver, TagUid, Target};
use crate::shutdown::Shutdown;

use super::state::{ReaderState, ReaderStats, StateCell};

/// Per-attempt poll timeout
pub const POLL_PERIOD: Duration = Duration::from_millis(300);
/// Throttle between poll cycles
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Identifier channel capacity
pub const TAG_CHANNEL_CAPACITY: usize = 10;

/// Tunable timings for a session
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// Timeout of one attempt on one modulation
    pub poll_period: Duration,
    /// Tries per modulation per cycle
    pub poll_count: u8,
    pub poll_interval: Duration,
    pub channel_capacity: usize,
    pub gpio_chip: String,
    pub reset_pulse: Vec<ResetStep>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            poll_period: POLL_PERIOD,
            poll_count: 1,
            poll_interval: POLL_INTERVAL,
            channel_capacity: TAG_CHANNEL_CAPACITY,
            gpio_chip: DEFAULT_CHIP.to_string(),
            reset_pulse: RESET_PULSE.to_vec(),
        }
    }
}

/// A contactless reader session.
///
/// [`listen`](Self::listen) runs the poll loop on the caller's thread and owns
/// the device handle for as long as it runs. Identifiers are published on a
/// bounded channel obtained from [`identifiers`](Self::identifiers).
pub struct TagReader {
    connection: String,
    reset_pin: u8,
    settings: ReaderSettings,
    catalog: ModulationCatalog,
    driver: Box<dyn NfcDriver>,
    gpio: Box<dyn GpioBackend>,
    device: Mutex<Option<Box<dyn NfcDevice>>>,
    tag_tx: Sender<TagUid>,
    tag_rx: Receiver<TagUid>,
    state: StateCell,
    stats: ReaderStats,
}

impl TagReader {
    /// `connection` empty means the first available device
    pub fn new(
        connection: impl Into<String>,
        reset_pin: u8,
        driver: Box<dyn NfcDriver>,
        gpio: Box<dyn GpioBackend>,
    ) -> Self {
        Self::with_settings(connection, reset_pin, driver, gpio, ReaderSettings::default())
    }

    pub fn with_settings(
        connection: impl Into<String>,
        reset_pin: u8,
        driver: Box<dyn NfcDriver>,
        gpio: Box<dyn GpioBackend>,
        settings: ReaderSettings,
    ) -> Self {
        let (tag_tx, tag_rx) = bounded::<TagUid>(settings.channel_capacity);

        Self {
            connection: connection.into(),
            reset_pin,
            settings,
            catalog: ModulationCatalog::standard(),
            driver,
            gpio,
            device: Mutex::new(None),
            tag_tx,
            tag_rx,
            state: StateCell::new(ReaderState::Idle),
            stats: ReaderStats::new(),
        }
    }

    /// Receiving end of the identifier stream
    pub fn identifiers(&self) -> Receiver<TagUid> {
        self.tag_rx.clone()
    }

    pub fn state(&self) -> ReaderState {
        self.state.get()
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    /// Open the device and poll until `shutdown` fires.
    ///
    /// Returns `Ok(())` on shutdown. Open and initiator failures are returned;
    /// everything after that is logged and retried.
    pub fn listen(&self, shutdown: &Shutdown) -> ReaderResult<()> {
        let mut slot = match self.device.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(ReaderError::AlreadyListening),
        };

        let device = match slot.take() {
            Some(device) => {
                debug!("Reusing open device {}", device.name());
                slot.insert(device)
            }
            None => self.init(&mut slot)?,
        };

        self.state.set(ReaderState::Polling);
        info!(
            "Polling {} for tags on {} modulations",
            device.name(),
            self.catalog.len()
        );

        while !shutdown.is_cancelled() {
            self.stats.record_poll();
            match device.poll_target(
                self.catalog.entries(),
                self.settings.poll_count,
                self.settings.poll_period,
            ) {
                Ok(Some(target)) => {
                    if !self.publish(&target, shutdown) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    self.stats.record_poll_error();
                    warn!("Error polling the reader: {}", e);
                }
            }

            select! {
                recv(shutdown.done()) -> _ => break,
                default(self.settings.poll_interval) => {}
            }
        }

        self.state.set(ReaderState::Stopped);
        info!(
            "Poll loop stopped. Polls: {}, Tags: {}, Poll errors: {}, Decode errors: {}",
            self.stats.get_polls(),
            self.stats.get_tags_read(),
            self.stats.get_poll_errors(),
            self.stats.get_decode_errors()
        );
        Ok(())
    }

    fn init<'s>(
        &self,
        slot: &'s mut Option<Box<dyn NfcDevice>>,
    ) -> ReaderResult<&'s mut Box<dyn NfcDevice>> {
        self.state.set(ReaderState::Initializing);

        let mut device = match self.driver.open(&self.connection) {
            Ok(device) => device,
            Err(e) => {
                error!("Cannot communicate with the device '{}': {}", self.connection, e);
                self.state.set(ReaderState::ResetTriggered);
                self.reset();
                return Err(ReaderError::DeviceOpen(e));
            }
        };

        if let Err(e) = device.initiator_init() {
            error!("Cannot initialize the reader {}: {}", device.name(), e);
            // The slot only ever holds initialized devices
            if let Err(close_err) = device.close() {
                error!("Error closing the reader: {}", close_err);
            }
            self.state.set(ReaderState::Stopped);
            return Err(ReaderError::DeviceInit(e));
        }

        info!(
            "Opened reader {} (reset line BCM {})",
            device.name(),
            self.reset_pin
        );
        Ok(slot.insert(device))
    }

    /// Decode and push one detection. Returns false if shutdown interrupted the push.
    fn publish(&self, target: &Target, shutdown: &Shutdown) -> bool {
        let uid = match decode_target(&self.catalog, target) {
            Ok(uid) => uid,
            Err(e) => {
                self.stats.record_decode_error();
                warn!("Error getting ID from target: {}", e);
                return true;
            }
        };

        // Detection finished after shutdown fired: nothing is written once cancelled
        if shutdown.is_cancelled() {
            debug!("Shutdown requested, dropping tag {}", uid);
            return false;
        }

        debug!("Tag {} on {}", uid, target.modulation());
        self.stats.record_tag();

        // Blocks while the channel is full
        let mut keep_polling = true;
        select! {
            send(self.tag_tx, uid) -> res => {
                if res.is_err() {
                    warn!("Tag channel closed");
                }
            },
            recv(shutdown.done()) -> _ => {
                debug!("Shutdown while tag channel full, dropping detection");
                keep_polling = false;
            },
        }
        keep_polling
    }

    /// Pulse the reset line. Failures are logged, never returned.
    pub fn reset(&self) {
        self.stats.record_reset();
        ResetSequencer::new(self.gpio.as_ref(), &self.settings.gpio_chip, self.reset_pin)
            .with_pulse(&self.settings.reset_pulse)
            .run();
    }

    /// Close the device. Waits for a running `listen` to return; later calls are no-ops.
    pub fn cleanup(&self) -> ReaderResult<()> {
        let mut slot = lock_device(&self.device);
        match slot.take() {
            Some(mut device) => {
                let name = device.name().to_string();
                device.close().map_err(ReaderError::DeviceClose)?;
                info!("Closed reader {}", name);
            }
            None => debug!("Reader already closed"),
        }
        Ok(())
    }
}

fn lock_device(
    device: &Mutex<Option<Box<dyn NfcDevice>>>,
) -> MutexGuard<'_, Option<Box<dyn NfcDevice>>> {
    device.lock().unwrap_or_else(|e| e.into_inner())
}

impl Drop for TagReader {
    fn drop(&mut self) {
        let slot = self.device.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(mut device) = slot.take() {
            warn!("Reader {} dropped without cleanup, closing", device.name());
            if let Err(e) = device.close() {
                error!("Error closing the reader: {}", e);
            }
        }
    }
}
