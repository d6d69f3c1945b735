//! Configuration loaded from environment variables

use std::fmt;
use std::time::Duration;

use crate::gpio::DEFAULT_CHIP;
use crate::reader::{ReaderSettings, POLL_INTERVAL, POLL_PERIOD, TAG_CHANNEL_CAPACITY};

/// Which GPIO implementation drives the reset line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioBackendKind {
    Rppal,
    Sim,
}

impl GpioBackendKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rppal" => Some(Self::Rppal),
            "sim" => Some(Self::Sim),
            _ => None,
        }
    }
}

impl Default for GpioBackendKind {
    fn default() -> Self {
        if cfg!(feature = "rppal") {
            Self::Rppal
        } else {
            Self::Sim
        }
    }
}

impl fmt::Display for GpioBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rppal => f.write_str("rppal"),
            Self::Sim => f.write_str("sim"),
        }
    }
}

/// Which driver talks to the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfcBackendKind {
    Libnfc,
    Sim,
}

impl NfcBackendKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "libnfc" | "nfc1" => Some(Self::Libnfc),
            "sim" => Some(Self::Sim),
            _ => None,
        }
    }

    /// Scripted tags or a `sim` connection string select the simulator
    fn infer(connection: &str, sim_tags: bool) -> Self {
        let sim_connection = connection == "sim" || connection.starts_with("sim:");
        if sim_connection || sim_tags || !cfg!(feature = "nfc1") {
            Self::Sim
        } else {
            Self::Libnfc
        }
    }
}

impl fmt::Display for NfcBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Libnfc => f.write_str("libnfc"),
            Self::Sim => f.write_str("sim"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Reader connection string (empty = first available device)
    pub connection: String,

    pub nfc_backend: NfcBackendKind,

    /// BCM number of the reader's reset line
    pub reset_pin: u8,

    /// GPIO chip the reset line lives on; fixed to the SoC bank with rppal
    pub gpio_chip: String,

    pub gpio_backend: GpioBackendKind,

    /// Pulse the reset line once before opening the reader
    pub reset_on_start: bool,

    /// Per-modulation poll timeout in milliseconds
    pub poll_timeout_ms: u64,

    /// Delay between poll cycles in milliseconds
    pub poll_interval_ms: u64,

    pub channel_capacity: usize,

    /// How often the consumer logs that it is still waiting
    pub waiting_log_interval_ms: u64,

    /// Scripted detections for the simulated reader
    pub sim_tags: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let connection = lookup("NFC_CONNSTRING").unwrap_or_default();
        let sim_tags = lookup("NFC_SIM_TAGS").filter(|s| !s.trim().is_empty());

        let gpio_backend = lookup("GPIO_BACKEND")
            .and_then(|s| GpioBackendKind::parse(&s))
            .unwrap_or_default();

        Self {
            nfc_backend: lookup("NFC_BACKEND")
                .and_then(|s| NfcBackendKind::parse(&s))
                .unwrap_or_else(|| NfcBackendKind::infer(&connection, sim_tags.is_some())),

            connection,

            reset_pin: lookup("NFC_RESET_PIN")
                .and_then(|s| s.parse().ok())
                .unwrap_or(19),

            gpio_chip: match gpio_backend {
                GpioBackendKind::Rppal => DEFAULT_CHIP.to_string(),
                GpioBackendKind::Sim => {
                    lookup("GPIO_CHIP").unwrap_or_else(|| DEFAULT_CHIP.to_string())
                }
            },

            gpio_backend,

            reset_on_start: lookup("NFC_RESET_ON_START")
                .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),

            poll_timeout_ms: lookup("POLL_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(POLL_PERIOD.as_millis() as u64),

            poll_interval_ms: lookup("POLL_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(POLL_INTERVAL.as_millis() as u64),

            channel_capacity: lookup("TAG_CHANNEL_CAPACITY")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(TAG_CHANNEL_CAPACITY),

            waiting_log_interval_ms: lookup("WAITING_LOG_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),

            sim_tags,
        }
    }

    pub fn reader_settings(&self) -> ReaderSettings {
        ReaderSettings {
            poll_period: Duration::from_millis(self.poll_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            channel_capacity: self.channel_capacity,
            gpio_chip: self.gpio_chip.clone(),
            ..ReaderSettings::default()
        }
    }

    pub fn waiting_log_interval(&self) -> Duration {
        Duration::from_millis(self.waiting_log_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.connection, "");
        assert_eq!(config.reset_pin, 19);
        assert_eq!(config.gpio_chip, "gpiochip0");
        assert!(!config.reset_on_start);
        assert_eq!(config.sim_tags, None);
        let expected = if cfg!(feature = "nfc1") {
            NfcBackendKind::Libnfc
        } else {
            NfcBackendKind::Sim
        };
        assert_eq!(config.nfc_backend, expected);

        let settings = config.reader_settings();
        assert_eq!(settings.poll_period, Duration::from_millis(300));
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.channel_capacity, 10);
        assert_eq!(settings.poll_count, 1);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("NFC_CONNSTRING", "sim:desk"),
            ("NFC_RESET_PIN", "22"),
            ("GPIO_BACKEND", "SIM"),
            ("NFC_RESET_ON_START", "true"),
            ("POLL_INTERVAL_MS", "250"),
            ("TAG_CHANNEL_CAPACITY", "0"),
            ("NFC_SIM_TAGS", "a@106:01020304"),
        ]);
        assert_eq!(config.connection, "sim:desk");
        assert_eq!(config.reset_pin, 22);
        assert_eq!(config.gpio_backend, GpioBackendKind::Sim);
        assert!(config.reset_on_start);
        assert_eq!(config.poll_interval_ms, 250);
        // Zero capacity would make the channel a rendezvous
        assert_eq!(config.channel_capacity, 10);
        assert_eq!(config.sim_tags.as_deref(), Some("a@106:01020304"));
        assert_eq!(config.nfc_backend, NfcBackendKind::Sim);
    }

    #[test]
    fn test_backend_selection() {
        let config = config_from(&[("NFC_CONNSTRING", "sim:bench")]);
        assert_eq!(config.nfc_backend, NfcBackendKind::Sim);

        let config = config_from(&[
            ("NFC_CONNSTRING", "pn532_uart:/dev/ttyUSB0"),
            ("NFC_BACKEND", "libnfc"),
        ]);
        assert_eq!(config.nfc_backend, NfcBackendKind::Libnfc);
        assert_eq!(config.connection, "pn532_uart:/dev/ttyUSB0");
    }

    #[test]
    fn test_gpio_chip_follows_backend() {
        let config = config_from(&[("GPIO_BACKEND", "rppal"), ("GPIO_CHIP", "gpiochip4")]);
        assert_eq!(config.gpio_chip, "gpiochip0");
        assert_eq!(config.reader_settings().gpio_chip, "gpiochip0");

        let config = config_from(&[("GPIO_BACKEND", "sim"), ("GPIO_CHIP", "gpiochip4")]);
        assert_eq!(config.gpio_chip, "gpiochip4");
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_from(&[("NFC_RESET_PIN", "gpio19"), ("GPIO_BACKEND", "sysfs")]);
        assert_eq!(config.reset_pin, 19);
        assert_eq!(config.gpio_backend, GpioBackendKind::default());
    }
}
