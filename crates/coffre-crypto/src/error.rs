//! Error type for sealed-resource parsing and opening.

use thiserror::Error;

/// Errors from sealing, opening, and header inspection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    /// Input is shorter than the smallest valid encoding.
    #[error("sealed input too short: need at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum length for the attempted parse
        expected: usize,
        /// Actual input length
        actual: usize,
    },

    /// Leading version byte does not name a known format.
    #[error("unsupported sealed format version: {0}")]
    UnsupportedVersion(u8),

    /// Authentication failed: wrong key, tampered body, or spliced chunk.
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// What was being opened when authentication failed
        reason: &'static str,
    },

    /// A textual resource ID was not 16 hex-encoded bytes.
    #[error("malformed resource id: {0}")]
    MalformedResourceId(String),
}
