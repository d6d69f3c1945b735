//! Hardware readers through libnfc (`nfc1`)

use std::time::Duration;

use nfc1::target_info::TargetInfo as RawInfo;
use tracing::debug;

use super::driver::{DriverError, NfcDevice, NfcDriver};
use super::modulation::{BaudRate, Modulation, Technology};
use super::target::{Target, TargetInfo};

/// libnfc expresses the per-attempt period in 150 ms units
const PERIOD_UNIT_MS: u128 = 150;

/// Opens readers by libnfc connection string (`pn532_uart:/dev/ttyS0`, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct LibnfcDriver;

impl NfcDriver for LibnfcDriver {
    fn open(&self, connection: &str) -> Result<Box<dyn NfcDevice>, DriverError> {
        // A device borrows its context, so each opened device keeps its own
        // context alive for the rest of the process.
        let context = Box::leak(Box::new(nfc1::Context::new().map_err(driver_error)?));

        let mut device = if connection.is_empty() {
            context.open()
        } else {
            context.open_with_connstring(connection)
        }
        .map_err(|e| match driver_error(e) {
            DriverError::NoDevice if !connection.is_empty() => {
                DriverError::DeviceNotFound(connection.to_string())
            }
            other => other,
        })?;

        let name = device.name().to_string();
        debug!("Opened libnfc device {}", name);

        Ok(Box::new(LibnfcDevice {
            name,
            device: Some(device),
        }))
    }
}

struct LibnfcDevice {
    name: String,
    device: Option<nfc1::Device<'static>>,
}

// SAFETY: the handle is only touched through `&mut self`, and the session
// keeps the device behind a mutex, so libnfc never sees concurrent calls.
unsafe impl Send for LibnfcDevice {}

impl LibnfcDevice {
    fn handle(&mut self) -> Result<&mut nfc1::Device<'static>, DriverError> {
        self.device.as_mut().ok_or(DriverError::Closed)
    }
}

impl NfcDevice for LibnfcDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn initiator_init(&mut self) -> Result<(), DriverError> {
        self.handle()?.initiator_init().map_err(driver_error)
    }

    fn poll_target(
        &mut self,
        modulations: &[Modulation],
        poll_count: u8,
        period: Duration,
    ) -> Result<Option<Target>, DriverError> {
        let requested: Vec<nfc1::Modulation> = modulations.iter().map(raw_modulation).collect();

        match self
            .handle()?
            .initiator_poll_target(&requested, poll_count, period_units(period))
        {
            Ok(raw) => convert_target(raw).map(Some),
            // Nothing answered within the period
            Err(nfc1::Error::Timeout) => Ok(None),
            Err(e) => Err(driver_error(e)),
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        // Dropping the handle closes it
        match self.device.take() {
            Some(device) => {
                drop(device);
                Ok(())
            }
            None => Err(DriverError::Closed),
        }
    }
}

fn driver_error(e: nfc1::Error) -> DriverError {
    match e {
        nfc1::Error::Timeout => DriverError::Timeout,
        nfc1::Error::NoSuchDeviceFound => DriverError::NoDevice,
        other => DriverError::Io(format!("{:?}", other)),
    }
}

fn period_units(period: Duration) -> u8 {
    (period.as_millis() / PERIOD_UNIT_MS).clamp(1, u8::MAX as u128) as u8
}

fn raw_modulation(modulation: &Modulation) -> nfc1::Modulation {
    let modulation_type = match modulation.technology {
        Technology::Iso14443a => nfc1::ModulationType::Iso14443a,
        Technology::Iso14443b => nfc1::ModulationType::Iso14443b,
        Technology::Felica => nfc1::ModulationType::Felica,
        Technology::Jewel => nfc1::ModulationType::Jewel,
        Technology::Iso14443bIClass => nfc1::ModulationType::Iso14443biClass,
        Technology::Iso14443b2sr => nfc1::ModulationType::Iso14443b2sr,
        Technology::Iso14443b2ct => nfc1::ModulationType::Iso14443b2ct,
        Technology::Dep => nfc1::ModulationType::Dep,
    };
    let baud_rate = match modulation.baud_rate {
        BaudRate::Nbr106 => nfc1::BaudRate::Baud106,
        BaudRate::Nbr212 => nfc1::BaudRate::Baud212,
        BaudRate::Nbr424 => nfc1::BaudRate::Baud424,
        BaudRate::Nbr847 => nfc1::BaudRate::Baud847,
    };
    nfc1::Modulation {
        modulation_type,
        baud_rate,
    }
}

fn convert_target(raw: nfc1::Target) -> Result<Target, DriverError> {
    let baud_rate = match raw.modulation.baud_rate {
        nfc1::BaudRate::Baud106 => BaudRate::Nbr106,
        nfc1::BaudRate::Baud212 => BaudRate::Nbr212,
        nfc1::BaudRate::Baud424 => BaudRate::Nbr424,
        nfc1::BaudRate::Baud847 => BaudRate::Nbr847,
        other => {
            return Err(DriverError::Io(format!("unsupported baud rate {:?}", other)));
        }
    };

    let info = match raw.target_info {
        RawInfo::Iso14443a(t) => TargetInfo::Iso14443a {
            atqa: t.atqa,
            sak: t.sak,
            uid: t.uid,
            uid_len: t.uid_len as usize,
        },
        RawInfo::Iso14443b(t) => TargetInfo::Iso14443b {
            pupi: t.pupi,
            application_data: t.application_data,
            protocol_info: t.protocol_info,
        },
        RawInfo::Felica(t) => TargetInfo::Felica {
            len: t.len as usize,
            res_code: t.res_code,
            id: t.id,
            pad: t.pad,
            sys_code: t.sys_code,
        },
        RawInfo::Jewel(t) => TargetInfo::Jewel {
            sens_res: t.sens_res,
            id: t.id,
        },
        RawInfo::Iso14443biClass(t) => TargetInfo::Iso14443bIClass { uid: t.uid },
        RawInfo::Iso14443b2sr(_) => TargetInfo::Other {
            technology: Technology::Iso14443b2sr,
            raw: Vec::new(),
        },
        RawInfo::Iso14443b2ct(_) => TargetInfo::Other {
            technology: Technology::Iso14443b2ct,
            raw: Vec::new(),
        },
        RawInfo::Dep(_) => TargetInfo::Other {
            technology: Technology::Dep,
            raw: Vec::new(),
        },
        other => {
            return Err(DriverError::Io(format!("unsupported target {:?}", other)));
        }
    };

    Ok(Target::new(baud_rate, info))
}
