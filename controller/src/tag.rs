use core::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Longest UID that still fits the integer form of a tag id.
pub const MAX_UID_LEN: usize = 8;

/// A tag UID read as one big-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(u64);

impl TagId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `None` for an empty UID or one longer than [`MAX_UID_LEN`].
    pub fn from_uid(uid: &[u8]) -> Option<Self> {
        if uid.is_empty() || uid.len() > MAX_UID_LEN {
            return None;
        }
        Some(Self(uid.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))))
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid tag id {0:?}, expected 0x-prefixed hex or decimal")]
pub struct ParseTagIdError(pub String);

impl FromStr for TagId {
    type Err = ParseTagIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed.map(TagId).map_err(|_| ParseTagIdError(s.to_string()))
    }
}

// Config files carry ids as "0x668005b8" strings, same as the rig labels.
impl Serialize for TagId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TagId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
