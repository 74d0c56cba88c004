//! Chunked stream format for data of unbounded length.
//!
//! A stream is a 33-byte clear header followed by independently sealed
//! chunks. The chunk key is HKDF-derived from the resource key and the
//! stream salt, so the stream and simple formats never share an AEAD key
//! even when they share a resource ID. Each chunk's index is bound into its
//! nonce: reordered or spliced chunks fail authentication.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::{
    error::SealError,
    format::{NONCE_SIZE, RESOURCE_ID_SIZE, STREAM_HEADER_SIZE, STREAM_VERSION, TAG_SIZE},
    keys::{ResourceId, ResourceKey},
};

/// Label for stream chunk-key derivation (domain separation).
const STREAM_KEY_LABEL: &[u8] = b"coffre stream chunk key v1";

/// Size of the per-stream random salt in the header.
pub const STREAM_SALT_SIZE: usize = 16;

/// Overhead of one sealed chunk over its plaintext: length frame plus tag.
pub const CHUNK_BODY_OVERHEAD: usize = 4 + TAG_SIZE;

/// Encode the stream header.
pub fn stream_header(id: ResourceId, salt: &[u8; STREAM_SALT_SIZE]) -> [u8; STREAM_HEADER_SIZE] {
    let mut header = [0u8; STREAM_HEADER_SIZE];
    header[0] = STREAM_VERSION;
    header[1..1 + RESOURCE_ID_SIZE].copy_from_slice(id.as_bytes());
    header[1 + RESOURCE_ID_SIZE..].copy_from_slice(salt);
    header
}

/// Parse a stream header into (resource ID, salt).
///
/// # Errors
///
/// - [`SealError::Truncated`] on short input
/// - [`SealError::UnsupportedVersion`] if not a stream-format header
pub fn parse_stream_header(
    header: &[u8],
) -> Result<(ResourceId, [u8; STREAM_SALT_SIZE]), SealError> {
    if header.len() < STREAM_HEADER_SIZE {
        return Err(SealError::Truncated { expected: STREAM_HEADER_SIZE, actual: header.len() });
    }
    if header[0] != STREAM_VERSION {
        return Err(SealError::UnsupportedVersion(header[0]));
    }

    let mut id = [0u8; RESOURCE_ID_SIZE];
    id.copy_from_slice(&header[1..1 + RESOURCE_ID_SIZE]);
    let mut salt = [0u8; STREAM_SALT_SIZE];
    salt.copy_from_slice(&header[1 + RESOURCE_ID_SIZE..STREAM_HEADER_SIZE]);
    Ok((ResourceId::from_bytes(id), salt))
}

/// Derive the stream's chunk key from the resource key and header salt.
pub fn derive_chunk_key(key: &ResourceKey, salt: &[u8; STREAM_SALT_SIZE]) -> ResourceKey {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), key.as_bytes());

    let mut derived = [0u8; 32];
    let Ok(()) = hkdf.expand(STREAM_KEY_LABEL, &mut derived) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };
    ResourceKey::from_bytes(derived)
}

/// Seal one chunk, framed as `length(4, BE) || ciphertext`.
///
/// `index` is the zero-based position of the chunk in the stream and is
/// bound into the nonce.
pub fn seal_chunk(
    chunk_key: &ResourceKey,
    salt: &[u8; STREAM_SALT_SIZE],
    index: u64,
    plaintext: &[u8],
) -> Vec<u8> {
    let nonce = chunk_nonce(salt, index);
    let cipher = XChaCha20Poly1305::new(chunk_key.as_bytes().into());
    let Ok(body) = cipher.encrypt(XNonce::from_slice(&nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Open one chunk body (the ciphertext after its length frame).
///
/// # Errors
///
/// - [`SealError::Truncated`] if the body cannot hold a tag
/// - [`SealError::DecryptionFailed`] on wrong key, wrong index, or tamper
pub fn open_chunk(
    chunk_key: &ResourceKey,
    salt: &[u8; STREAM_SALT_SIZE],
    index: u64,
    body: &[u8],
) -> Result<Vec<u8>, SealError> {
    if body.len() < TAG_SIZE {
        return Err(SealError::Truncated { expected: TAG_SIZE, actual: body.len() });
    }

    let nonce = chunk_nonce(salt, index);
    let cipher = XChaCha20Poly1305::new(chunk_key.as_bytes().into());
    cipher
        .decrypt(XNonce::from_slice(&nonce), body)
        .map_err(|_| SealError::DecryptionFailed { reason: "chunk authentication failed" })
}

/// Build a 24-byte chunk nonce: salt(16) || index(8, BE).
fn chunk_nonce(salt: &[u8; STREAM_SALT_SIZE], index: u64) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..STREAM_SALT_SIZE].copy_from_slice(salt);
    nonce[STREAM_SALT_SIZE..].copy_from_slice(&index.to_be_bytes());
    nonce
}
