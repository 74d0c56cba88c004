//! Shared identifier and status types.

use std::{fmt, str::FromStr};

use crate::error::Error;

/// Lifecycle status of a [`Session`](crate::Session).
///
/// Encryption, group, and device operations are valid only in `Ready`;
/// starting is valid only from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No backend session. Initial state, and the state after `stop()`.
    Stopped,
    /// Session open, key material unlocked, all operations available.
    Ready,
    /// First start for this user: an initial verification method must be
    /// registered.
    IdentityRegistrationNeeded,
    /// Known user on a new device: an existing method must be proved.
    IdentityVerificationNeeded,
}

/// Stable identifier of one of a user's devices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId([u8; 16]);

impl DeviceId {
    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id(s).map(Self).ok_or_else(|| {
            Error::InvalidArgument(format!("malformed device id: {s:?}"))
        })
    }
}

/// Identifier of a sharing group, minted by the backend at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId([u8; 16]);

impl GroupId {
    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for GroupId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id(s).map(Self).ok_or_else(|| {
            Error::InvalidArgument(format!("malformed group id: {s:?}"))
        })
    }
}

fn parse_hex_id(s: &str) -> Option<[u8; 16]> {
    hex::decode(s).ok()?.try_into().ok()
}

/// Opaque per-session credential handed out by the backend at
/// `open_session` and presented on every subsequent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceToken(u64);

impl DeviceToken {
    /// Wrap a raw token value (backend side).
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw token value (backend side).
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// One entry of a user's device list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// The device's stable identifier.
    pub device_id: DeviceId,
    /// Whether the device has been revoked. Revocation is one-way.
    pub is_revoked: bool,
}
