//! Principal identifiers for accounts, callers and target services.

use crate::error::AgoraError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An opaque, fixed-width identifier for an account, caller or service.
///
/// Principals are totally ordered so they can be used directly as storage
/// keys. The all-zero value is reserved for the anonymous caller.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Principal([u8; 32]);

impl Principal {
    /// Length of the raw identifier in bytes.
    pub const LEN: usize = 32;

    /// The anonymous caller. Never allowed where authorship is required.
    pub const ANONYMOUS: Self = Self([0u8; 32]);

    /// Text form of [`Principal::ANONYMOUS`].
    pub const ANONYMOUS_TEXT: &'static str = "anonymous";

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        *self == Self::ANONYMOUS
    }

    /// Parse from a byte slice of exactly [`Principal::LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AgoraError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            AgoraError::InvalidPrincipal(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Lowercase hex rendering, regardless of the anonymous sentinel.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Principal {
    type Err = AgoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == Self::ANONYMOUS_TEXT {
            return Ok(Self::ANONYMOUS);
        }
        let bytes = hex::decode(s).map_err(|e| AgoraError::InvalidPrincipal(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            f.write_str(Self::ANONYMOUS_TEXT)
        } else {
            f.write_str(&self.to_hex())
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self)
    }
}

// Text in human-readable formats (JSON, TOML), raw bytes in binary ones (bincode).
impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}
