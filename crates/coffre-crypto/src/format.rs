//! Sealed-resource header layout and inspection.
//!
//! Both formats share a common prefix of `version(1) || resource_id(16)`,
//! which is what makes [`resource_id`] a pure, format-agnostic header read.

use crate::{error::SealError, keys::ResourceId};

/// Format version of one-shot sealed resources.
pub const SIMPLE_VERSION: u8 = 1;

/// Format version of chunked stream resources.
pub const STREAM_VERSION: u8 = 2;

/// Size of the resource ID carried in every header.
pub const RESOURCE_ID_SIZE: usize = 16;

/// Size of the XChaCha20 nonce in the simple format.
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag.
pub const TAG_SIZE: usize = 16;

/// Clear header size of the simple format: version, resource ID, nonce.
pub const SIMPLE_HEADER_SIZE: usize = 1 + RESOURCE_ID_SIZE + NONCE_SIZE;

/// Fixed size difference between a simple ciphertext and its plaintext.
///
/// Depends only on the format version, never on content.
pub const SIMPLE_OVERHEAD: usize = SIMPLE_HEADER_SIZE + TAG_SIZE;

/// Clear header size of the stream format: version, resource ID, salt.
pub const STREAM_HEADER_SIZE: usize = 1 + RESOURCE_ID_SIZE + crate::stream::STREAM_SALT_SIZE;

/// Read the resource ID out of a sealed resource of either format.
///
/// Pure header inspection: no key, no network, no decryption capability
/// required. Works on simple ciphertexts and on stream headers alike because
/// both formats share the `version || resource_id` prefix.
///
/// # Errors
///
/// - [`SealError::Truncated`] if fewer than 17 bytes are present
/// - [`SealError::UnsupportedVersion`] if the version byte is unknown
pub fn resource_id(sealed: &[u8]) -> Result<ResourceId, SealError> {
    const PREFIX: usize = 1 + RESOURCE_ID_SIZE;
    if sealed.len() < PREFIX {
        return Err(SealError::Truncated { expected: PREFIX, actual: sealed.len() });
    }
    if sealed[0] != SIMPLE_VERSION && sealed[0] != STREAM_VERSION {
        return Err(SealError::UnsupportedVersion(sealed[0]));
    }

    let mut id = [0u8; RESOURCE_ID_SIZE];
    id.copy_from_slice(&sealed[1..PREFIX]);
    Ok(ResourceId::from_bytes(id))
}

/// Split a simple ciphertext into (resource ID, nonce, header, body).
///
/// The header slice is returned so callers can authenticate it as AEAD
/// associated data.
pub(crate) fn parse_simple(
    sealed: &[u8],
) -> Result<(ResourceId, [u8; NONCE_SIZE], &[u8], &[u8]), SealError> {
    if sealed.len() < SIMPLE_OVERHEAD {
        return Err(SealError::Truncated { expected: SIMPLE_OVERHEAD, actual: sealed.len() });
    }
    if sealed[0] != SIMPLE_VERSION {
        return Err(SealError::UnsupportedVersion(sealed[0]));
    }

    let id = resource_id(sealed)?;
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&sealed[1 + RESOURCE_ID_SIZE..SIMPLE_HEADER_SIZE]);
    let (header, body) = sealed.split_at(SIMPLE_HEADER_SIZE);
    Ok((id, nonce, header, body))
}
