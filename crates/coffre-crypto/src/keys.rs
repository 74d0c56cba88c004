//! Key and identifier types for sealed resources.

use std::{fmt, str::FromStr};

use zeroize::Zeroize;

use crate::error::SealError;

/// A 32-byte symmetric resource key.
///
/// One key protects one resource (or one encryption session's worth of
/// resources). Keys are random, never derived from user data, and zeroized
/// on drop.
#[derive(Clone)]
pub struct ResourceKey {
    key: [u8; 32],
}

impl ResourceKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Raw key bytes for the AEAD.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl Drop for ResourceKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material never reaches logs
        f.write_str("ResourceKey(..)")
    }
}

/// Stable 16-byte identifier of a sealed resource.
///
/// Carried in clear in every ciphertext header, so any holder of the bytes
/// can recover it without decryption capability. Displays as 32 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId([u8; 16]);

impl ResourceId {
    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ResourceId {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s).map_err(|_| SealError::MalformedResourceId(s.to_string()))?;
        let bytes: [u8; 16] =
            raw.try_into().map_err(|_| SealError::MalformedResourceId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_roundtrips_through_hex() {
        let id = ResourceId::from_bytes([0xAB; 16]);
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<ResourceId>().unwrap(), id);
    }

    #[test]
    fn resource_id_rejects_wrong_length() {
        assert!(matches!("abcd".parse::<ResourceId>(), Err(SealError::MalformedResourceId(_))));
    }

    #[test]
    fn resource_id_rejects_non_hex() {
        let garbage = "zz".repeat(16);
        assert!(garbage.parse::<ResourceId>().is_err());
    }

    #[test]
    fn key_debug_hides_material() {
        let key = ResourceKey::from_bytes([0x42; 32]);
        assert_eq!(format!("{key:?}"), "ResourceKey(..)");
    }
}
