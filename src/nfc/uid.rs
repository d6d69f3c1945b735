//! Canonical tag identifier

use std::fmt;

/// Lowercase hex rendering of a tag UID, no separators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagUid(String);

impl TagUid {
    /// Encode exactly `bytes`; callers truncate to the declared length first
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for TagUid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_hex() {
        let uid = TagUid::from_bytes(&[0x04, 0xAB, 0xCD, 0xEF]);
        assert_eq!(uid.as_str(), "04abcdef");
        assert_eq!(uid.to_string(), "04abcdef");
    }
}
