//! Detected target data as reported by a reader

use super::modulation::{BaudRate, Modulation, Technology};

/// Technology-specific fields of a detected target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInfo {
    Iso14443a {
        atqa: [u8; 2],
        sak: u8,
        /// UID buffer, only the first `uid_len` bytes are meaningful
        uid: [u8; 10],
        uid_len: usize,
    },
    Iso14443b {
        pupi: [u8; 4],
        application_data: [u8; 4],
        protocol_info: [u8; 3],
    },
    Felica {
        /// Declared length of `id` in bytes
        len: usize,
        res_code: u8,
        id: [u8; 8],
        pad: [u8; 8],
        sys_code: [u8; 2],
    },
    Jewel {
        sens_res: [u8; 2],
        id: [u8; 4],
    },
    Iso14443bIClass {
        uid: [u8; 8],
    },
    /// A technology this crate has no identifier semantics for
    Other {
        technology: Technology,
        raw: Vec<u8>,
    },
}

impl TargetInfo {
    pub fn technology(&self) -> Technology {
        match self {
            TargetInfo::Iso14443a { .. } => Technology::Iso14443a,
            TargetInfo::Iso14443b { .. } => Technology::Iso14443b,
            TargetInfo::Felica { .. } => Technology::Felica,
            TargetInfo::Jewel { .. } => Technology::Jewel,
            TargetInfo::Iso14443bIClass { .. } => Technology::Iso14443bIClass,
            TargetInfo::Other { technology, .. } => *technology,
        }
    }
}

/// One tag found by a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub baud_rate: BaudRate,
    pub info: TargetInfo,
}

impl Target {
    pub fn new(baud_rate: BaudRate, info: TargetInfo) -> Self {
        Self { baud_rate, info }
    }

    /// ISO 14443-A target from a UID slice (up to 10 bytes)
    pub fn iso14443a(uid_bytes: &[u8]) -> Self {
        let mut uid = [0u8; 10];
        let uid_len = uid_bytes.len().min(uid.len());
        uid[..uid_len].copy_from_slice(&uid_bytes[..uid_len]);
        Self::new(
            BaudRate::Nbr106,
            TargetInfo::Iso14443a {
                atqa: [0x00, 0x44],
                sak: 0x00,
                uid,
                uid_len,
            },
        )
    }

    /// FeliCa target from an ID slice (up to 8 bytes)
    pub fn felica(baud_rate: BaudRate, id_bytes: &[u8]) -> Self {
        let mut id = [0u8; 8];
        let len = id_bytes.len().min(id.len());
        id[..len].copy_from_slice(&id_bytes[..len]);
        Self::new(
            baud_rate,
            TargetInfo::Felica {
                len,
                res_code: 0x01,
                id,
                pad: [0u8; 8],
                sys_code: [0xFF, 0xFF],
            },
        )
    }

    /// Reported modulation: the technology comes from the variant itself
    pub fn modulation(&self) -> Modulation {
        Modulation::new(self.info.technology(), self.baud_rate)
    }
}
