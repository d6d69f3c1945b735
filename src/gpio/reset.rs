//! Hardware reset pulse for a stuck reader

use std::thread;
use std::time::Duration;

use tracing::{error, info};

use super::{GpioBackend, GpioError, Level};

/// One level change and how long to hold it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetStep {
    pub level: Level,
    pub hold: Duration,
}

/// High 400 ms, low 400 ms, high 100 ms
pub const RESET_PULSE: [ResetStep; 3] = [
    ResetStep {
        level: Level::High,
        hold: Duration::from_millis(400),
    },
    ResetStep {
        level: Level::Low,
        hold: Duration::from_millis(400),
    },
    ResetStep {
        level: Level::High,
        hold: Duration::from_millis(100),
    },
];

/// Drives the reset line through [`RESET_PULSE`].
///
/// Blocking and not cancellable once started. Never reopens the reader.
pub struct ResetSequencer<'a> {
    backend: &'a dyn GpioBackend,
    chip: &'a str,
    pin: u8,
    pulse: &'a [ResetStep],
}

impl<'a> ResetSequencer<'a> {
    pub fn new(backend: &'a dyn GpioBackend, chip: &'a str, pin: u8) -> Self {
        Self {
            backend,
            chip,
            pin,
            pulse: &RESET_PULSE,
        }
    }

    /// Override the pulse table (shorter holds in tests)
    pub fn with_pulse(mut self, pulse: &'a [ResetStep]) -> Self {
        self.pulse = pulse;
        self
    }

    /// Run the sequence; failures are logged and end it early.
    pub fn run(&self) {
        info!("Resetting the reader (chip {}, pin {})...", self.chip, self.pin);

        match self.pulse_line() {
            Ok(()) => info!("Reader reset pulse complete"),
            Err(e) => error!("Reader reset aborted: {}", e),
        }
    }

    fn pulse_line(&self) -> Result<(), GpioError> {
        let mut chip = self.backend.open_chip(self.chip)?;
        let mut line = chip.request_output(self.pin, Level::Low)?;

        for step in self.pulse {
            line.set_level(step.level)?;
            thread::sleep(step.hold);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::sim::{GpioOp, SimulatedGpio};
    use std::time::Instant;

    const FAST_PULSE: [ResetStep; 3] = [
        ResetStep {
            level: Level::High,
            hold: Duration::from_millis(4),
        },
        ResetStep {
            level: Level::Low,
            hold: Duration::from_millis(4),
        },
        ResetStep {
            level: Level::High,
            hold: Duration::from_millis(1),
        },
    ];

    #[test]
    fn test_pulse_table() {
        let levels: Vec<Level> = RESET_PULSE.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![Level::High, Level::Low, Level::High]);
        let holds: Vec<u64> = RESET_PULSE.iter().map(|s| s.hold.as_millis() as u64).collect();
        assert_eq!(holds, vec![400, 400, 100]);
    }

    #[test]
    fn test_reset_issues_three_level_changes() {
        let gpio = SimulatedGpio::new();
        ResetSequencer::new(&gpio, "gpiochip0", 19)
            .with_pulse(&FAST_PULSE)
            .run();

        assert_eq!(
            gpio.ops(),
            vec![
                GpioOp::OpenChip("gpiochip0".to_string()),
                GpioOp::Request { pin: 19, initial: Level::Low },
                GpioOp::Set { pin: 19, level: Level::High },
                GpioOp::Set { pin: 19, level: Level::Low },
                GpioOp::Set { pin: 19, level: Level::High },
                GpioOp::Release { pin: 19 },
            ]
        );
        assert_eq!(gpio.level_changes(), vec![Level::High, Level::Low, Level::High]);
    }

    #[test]
    fn test_reset_holds_levels() {
        let gpio = SimulatedGpio::new();
        let start = Instant::now();
        ResetSequencer::new(&gpio, "gpiochip0", 19).run();
        assert!(start.elapsed() >= Duration::from_millis(900));

        let stamps = gpio.set_times();
        assert_eq!(stamps.len(), 3);
        assert!(stamps[1] - stamps[0] >= Duration::from_millis(400));
        assert!(stamps[2] - stamps[1] >= Duration::from_millis(400));
    }

    #[test]
    fn test_failed_step_skips_the_rest() {
        // Second set (drive low) fails
        let gpio = SimulatedGpio::new().fail_set_at(1);
        ResetSequencer::new(&gpio, "gpiochip0", 19)
            .with_pulse(&FAST_PULSE)
            .run();

        assert_eq!(gpio.level_changes(), vec![Level::High]);
        assert_eq!(gpio.ops().last(), Some(&GpioOp::Release { pin: 19 }));
    }

    #[test]
    fn test_chip_open_failure_is_absorbed() {
        let gpio = SimulatedGpio::new().fail_open();
        ResetSequencer::new(&gpio, "gpiochip9", 19).run();
        assert!(gpio.level_changes().is_empty());
    }
}
