//! Reader driver seam, modulation catalog and UID decoding

pub mod decode;
pub mod driver;
#[cfg(feature = "nfc1")]
pub mod libnfc;
pub mod modulation;
pub mod sim;
mod target;
mod uid;

pub use decode::{decode_target, DecodeError};
pub use driver::{DriverError, NfcDevice, NfcDriver};
#[cfg(feature = "nfc1")]
pub use libnfc::LibnfcDriver;
pub use modulation::{BaudRate, Modulation, ModulationCatalog, Technology};
pub use sim::{parse_sim_targets, SimEvent, SimulatedDriver};
pub use target::{Target, TargetInfo};
pub use uid::TagUid;
