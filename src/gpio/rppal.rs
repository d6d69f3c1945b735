//! Raspberry Pi GPIO through `rppal`

use ::rppal::gpio::{Gpio, OutputPin};
use tracing::debug;

use super::{GpioBackend, GpioChip, GpioError, Level, OutputLine, DEFAULT_CHIP};

/// `rppal` only drives the SoC's own bank, exposed as `gpiochip0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RppalGpio;

impl GpioBackend for RppalGpio {
    fn open_chip(&self, name: &str) -> Result<Box<dyn GpioChip>, GpioError> {
        if name != DEFAULT_CHIP {
            return Err(GpioError::Chip {
                chip: name.to_string(),
                reason: format!("rppal can only drive {}", DEFAULT_CHIP),
            });
        }

        let gpio = Gpio::new().map_err(|e| GpioError::Chip {
            chip: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(RppalChip { gpio }))
    }
}

struct RppalChip {
    gpio: Gpio,
}

impl GpioChip for RppalChip {
    fn request_output(&mut self, pin: u8, initial: Level) -> Result<Box<dyn OutputLine>, GpioError> {
        let line = self.gpio.get(pin).map_err(|e| GpioError::Line {
            pin,
            reason: e.to_string(),
        })?;

        let mut output = match initial {
            Level::Low => line.into_output_low(),
            Level::High => line.into_output_high(),
        };
        // Leave the reader powered after the line is released
        output.set_reset_on_drop(false);
        debug!("Requested BCM {} as output ({})", pin, initial);

        Ok(Box::new(RppalLine { pin: output }))
    }
}

struct RppalLine {
    pin: OutputPin,
}

impl OutputLine for RppalLine {
    fn set_level(&mut self, level: Level) -> Result<(), GpioError> {
        match level {
            Level::Low => self.pin.set_low(),
            Level::High => self.pin.set_high(),
        }
        Ok(())
    }
}
