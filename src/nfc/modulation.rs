//! Modulation types and the fixed poll catalog

use std::fmt;
use std::str::FromStr;

/// Contactless technology families a reader can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technology {
    Iso14443a,
    Iso14443b,
    Felica,
    Jewel,
    /// ISO 14443-B iClass (vicinity card)
    Iso14443bIClass,
    Iso14443b2sr,
    Iso14443b2ct,
    Dep,
}

/// Over-the-air bit rates in kbps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    Nbr106,
    Nbr212,
    Nbr424,
    Nbr847,
}

/// A (technology, baud rate) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modulation {
    pub technology: Technology,
    pub baud_rate: BaudRate,
}

impl Modulation {
    pub const fn new(technology: Technology, baud_rate: BaudRate) -> Self {
        Self {
            technology,
            baud_rate,
        }
    }
}

/// Poll order used every cycle
const STANDARD_MODULATIONS: [Modulation; 6] = [
    Modulation::new(Technology::Iso14443a, BaudRate::Nbr106),
    Modulation::new(Technology::Iso14443b, BaudRate::Nbr106),
    Modulation::new(Technology::Felica, BaudRate::Nbr212),
    Modulation::new(Technology::Felica, BaudRate::Nbr424),
    Modulation::new(Technology::Jewel, BaudRate::Nbr106),
    Modulation::new(Technology::Iso14443bIClass, BaudRate::Nbr106),
];

/// Immutable, ordered set of modulations the poll loop attempts.
///
/// The table is `'static` and never reordered; entry order is poll priority.
#[derive(Debug, Clone, Copy)]
pub struct ModulationCatalog {
    entries: &'static [Modulation],
}

impl ModulationCatalog {
    /// The six-entry catalog every reader session polls with
    pub const fn standard() -> Self {
        Self {
            entries: &STANDARD_MODULATIONS,
        }
    }

    pub fn entries(&self) -> &'static [Modulation] {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact match of a reported modulation against the catalog
    pub fn lookup(&self, modulation: &Modulation) -> Option<&'static Modulation> {
        self.entries.iter().find(|m| *m == modulation)
    }
}

impl Default for ModulationCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Technology::Iso14443a => "ISO/IEC 14443A",
            Technology::Iso14443b => "ISO/IEC 14443-4B",
            Technology::Felica => "FeliCa",
            Technology::Jewel => "Innovision Jewel",
            Technology::Iso14443bIClass => "ISO/IEC 14443-2B iClass",
            Technology::Iso14443b2sr => "ISO/IEC 14443-2B ST SRx",
            Technology::Iso14443b2ct => "ISO/IEC 14443-2B ASK CTx",
            Technology::Dep => "D.E.P.",
        };
        f.write_str(name)
    }
}

impl FromStr for Technology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "iso14443a" => Ok(Technology::Iso14443a),
            "b" | "iso14443b" => Ok(Technology::Iso14443b),
            "f" | "felica" => Ok(Technology::Felica),
            "jewel" | "topaz" => Ok(Technology::Jewel),
            "iclass" | "iso14443biclass" => Ok(Technology::Iso14443bIClass),
            "b2sr" | "iso14443b2sr" => Ok(Technology::Iso14443b2sr),
            "b2ct" | "iso14443b2ct" => Ok(Technology::Iso14443b2ct),
            "dep" => Ok(Technology::Dep),
            other => Err(format!("unknown technology '{}'", other)),
        }
    }
}

impl BaudRate {
    pub fn kbps(&self) -> u32 {
        match self {
            BaudRate::Nbr106 => 106,
            BaudRate::Nbr212 => 212,
            BaudRate::Nbr424 => 424,
            BaudRate::Nbr847 => 847,
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kbps", self.kbps())
    }
}

impl FromStr for BaudRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "106" => Ok(BaudRate::Nbr106),
            "212" => Ok(BaudRate::Nbr212),
            "424" => Ok(BaudRate::Nbr424),
            "847" => Ok(BaudRate::Nbr847),
            other => Err(format!("unknown baud rate '{}'", other)),
        }
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.technology, self.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let catalog = ModulationCatalog::standard();
        assert_eq!(catalog.len(), 6);
        assert_eq!(
            catalog.entries()[0],
            Modulation::new(Technology::Iso14443a, BaudRate::Nbr106)
        );
        assert_eq!(
            catalog.entries()[2],
            Modulation::new(Technology::Felica, BaudRate::Nbr212)
        );
        assert_eq!(
            catalog.entries()[3],
            Modulation::new(Technology::Felica, BaudRate::Nbr424)
        );
        assert_eq!(
            catalog.entries()[5],
            Modulation::new(Technology::Iso14443bIClass, BaudRate::Nbr106)
        );
    }

    #[test]
    fn test_lookup_requires_exact_baud() {
        let catalog = ModulationCatalog::standard();
        assert!(catalog
            .lookup(&Modulation::new(Technology::Felica, BaudRate::Nbr424))
            .is_some());
        assert!(catalog
            .lookup(&Modulation::new(Technology::Iso14443a, BaudRate::Nbr212))
            .is_none());
        assert!(catalog
            .lookup(&Modulation::new(Technology::Dep, BaudRate::Nbr106))
            .is_none());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("felica".parse::<Technology>(), Ok(Technology::Felica));
        assert_eq!("A".parse::<Technology>(), Ok(Technology::Iso14443a));
        assert_eq!("424".parse::<BaudRate>(), Ok(BaudRate::Nbr424));
        assert!("300".parse::<BaudRate>().is_err());
        assert!("nfc-z".parse::<Technology>().is_err());
    }
}
