//! Identifier extraction per modulation

use thiserror::Error;

use super::modulation::{Modulation, ModulationCatalog};
use super::target::{Target, TargetInfo};
use super::uid::TagUid;

/// Why a detected target produced no identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown modulation: {0}")]
    UnknownModulation(Modulation),

    #[error("declared UID length {declared} exceeds {capacity}-byte buffer")]
    LengthOutOfRange { declared: usize, capacity: usize },
}

/// Find the catalog entry for `target` and extract its UID.
pub fn decode_target(catalog: &ModulationCatalog, target: &Target) -> Result<TagUid, DecodeError> {
    let modulation = target.modulation();
    if catalog.lookup(&modulation).is_none() {
        return Err(DecodeError::UnknownModulation(modulation));
    }

    let bytes = match &target.info {
        TargetInfo::Iso14443a { uid, uid_len, .. } => declared_prefix(uid, *uid_len)?,
        // B cards expose no UID; application data stands in for it
        TargetInfo::Iso14443b {
            application_data, ..
        } => &application_data[..],
        TargetInfo::Felica { id, len, .. } => declared_prefix(id, *len)?,
        TargetInfo::Jewel { id, .. } => &id[..],
        TargetInfo::Iso14443bIClass { uid } => &uid[..],
        TargetInfo::Other { .. } => return Err(DecodeError::UnknownModulation(modulation)),
    };

    Ok(TagUid::from_bytes(bytes))
}

/// Slice to the declared length before encoding, never after.
fn declared_prefix(buf: &[u8], declared: usize) -> Result<&[u8], DecodeError> {
    buf.get(..declared).ok_or(DecodeError::LengthOutOfRange {
        declared,
        capacity: buf.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfc::modulation::{BaudRate, Technology};

    fn decode(target: &Target) -> Result<TagUid, DecodeError> {
        decode_target(&ModulationCatalog::standard(), target)
    }

    #[test]
    fn test_iso14443a_uses_declared_length() {
        let target = Target::new(
            BaudRate::Nbr106,
            TargetInfo::Iso14443a {
                atqa: [0x00, 0x04],
                sak: 0x08,
                uid: [0xDE, 0xAD, 0xBE, 0xEF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
                uid_len: 4,
            },
        );
        assert_eq!(decode(&target).unwrap(), "deadbeef");
    }

    #[test]
    fn test_odd_length_truncates_bytes_not_chars() {
        // 7-byte UID: slicing the encoded string to 7 chars would give "0401020"
        let target = Target::iso14443a(&[0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let uid = decode(&target).unwrap();
        assert_eq!(uid, "04010203040506");
        assert_eq!(uid.as_str().len(), 14);
    }

    #[test]
    fn test_iso14443b_uses_application_data() {
        let target = Target::new(
            BaudRate::Nbr106,
            TargetInfo::Iso14443b {
                pupi: [0x11, 0x22, 0x33, 0x44],
                application_data: [0xA1, 0xB2, 0xC3, 0xD4],
                protocol_info: [0x00, 0x81, 0x71],
            },
        );
        assert_eq!(decode(&target).unwrap(), "a1b2c3d4");
    }

    #[test]
    fn test_felica_both_tiers() {
        let id = [0x01, 0x2E, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        for baud in [BaudRate::Nbr212, BaudRate::Nbr424] {
            let uid = decode(&Target::felica(baud, &id)).unwrap();
            assert_eq!(uid, "012e456789abcdef");
        }

        let short = Target::felica(BaudRate::Nbr212, &id[..5]);
        assert_eq!(decode(&short).unwrap(), "012e456789");
    }

    #[test]
    fn test_jewel_and_iclass_full_buffer() {
        let jewel = Target::new(
            BaudRate::Nbr106,
            TargetInfo::Jewel {
                sens_res: [0x0C, 0x00],
                id: [0x12, 0x34, 0x56, 0x78],
            },
        );
        assert_eq!(decode(&jewel).unwrap(), "12345678");

        let iclass = Target::new(
            BaudRate::Nbr106,
            TargetInfo::Iso14443bIClass {
                uid: [0x8A, 0x7B, 0x6C, 0x5D, 0x4E, 0x3F, 0x20, 0x11],
            },
        );
        assert_eq!(decode(&iclass).unwrap(), "8a7b6c5d4e3f2011");
    }

    #[test]
    fn test_every_catalog_entry_yields_twice_declared_length() {
        let catalog = ModulationCatalog::standard();
        for modulation in catalog.entries() {
            let (target, declared) = match modulation.technology {
                Technology::Iso14443a => (Target::iso14443a(&[1, 2, 3]), 3),
                Technology::Felica => (Target::felica(modulation.baud_rate, &[9; 6]), 6),
                Technology::Iso14443b => (
                    Target::new(
                        modulation.baud_rate,
                        TargetInfo::Iso14443b {
                            pupi: [0; 4],
                            application_data: [7; 4],
                            protocol_info: [0; 3],
                        },
                    ),
                    4,
                ),
                Technology::Jewel => (
                    Target::new(
                        modulation.baud_rate,
                        TargetInfo::Jewel {
                            sens_res: [0; 2],
                            id: [5; 4],
                        },
                    ),
                    4,
                ),
                Technology::Iso14443bIClass => (
                    Target::new(
                        modulation.baud_rate,
                        TargetInfo::Iso14443bIClass { uid: [3; 8] },
                    ),
                    8,
                ),
                other => panic!("unexpected catalog technology {}", other),
            };
            assert_eq!(target.modulation(), *modulation);
            let uid = decode_target(&catalog, &target).unwrap();
            assert_eq!(uid.as_str().len(), 2 * declared, "{}", modulation);
        }
    }

    #[test]
    fn test_unknown_modulation() {
        let wrong_baud = Target {
            baud_rate: BaudRate::Nbr424,
            ..Target::iso14443a(&[1, 2, 3, 4])
        };
        assert_eq!(
            decode(&wrong_baud),
            Err(DecodeError::UnknownModulation(Modulation::new(
                Technology::Iso14443a,
                BaudRate::Nbr424
            )))
        );

        let dep = Target::new(
            BaudRate::Nbr106,
            TargetInfo::Other {
                technology: Technology::Dep,
                raw: vec![0x01],
            },
        );
        assert!(matches!(
            decode(&dep),
            Err(DecodeError::UnknownModulation(_))
        ));
    }

    #[test]
    fn test_declared_length_beyond_buffer() {
        let target = Target::new(
            BaudRate::Nbr212,
            TargetInfo::Felica {
                len: 12,
                res_code: 1,
                id: [0; 8],
                pad: [0; 8],
                sys_code: [0; 2],
            },
        );
        assert_eq!(
            decode(&target),
            Err(DecodeError::LengthOutOfRange {
                declared: 12,
                capacity: 8
            })
        );
    }
}
